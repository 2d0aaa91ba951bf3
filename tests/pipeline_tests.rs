// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// tests/pipeline_tests.rs - End-to-end pipeline tests with stubbed backends

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use product_scout::llm::IntentClassifier;
use product_scout::market::{
    Listing, ListingProvider, MarketError, MarketplaceAggregator, ProviderStep, Trigger,
};
use product_scout::vision::annotator::{
    Annotation, AnnotatorError, BoundingPoly, EntityAnnotation, FullTextAnnotation,
    LocalizedObject, NormalizedVertex, VisionAnnotator, WebDetection, WebEntity,
};
use product_scout::vision::{AnalysisError, EnrichmentStatus, SignalFusionEngine};
use product_scout::ScoutService;

/// A small but real PNG so preprocessing has something to decode
fn test_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(120, 120, image::Rgb([180, 40, 40]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode test png");
    buf
}

fn entity(description: &str, score: f32) -> EntityAnnotation {
    EntityAnnotation {
        description: description.to_string(),
        score,
    }
}

fn full_box_object(name: &str, score: f32) -> LocalizedObject {
    LocalizedObject {
        name: name.to_string(),
        score,
        bounding_poly: BoundingPoly {
            normalized_vertices: vec![
                NormalizedVertex { x: 0.0, y: 0.0 },
                NormalizedVertex { x: 1.0, y: 0.0 },
                NormalizedVertex { x: 1.0, y: 1.0 },
                NormalizedVertex { x: 0.0, y: 1.0 },
            ],
        },
    }
}

/// Scripted annotator: first annotate call yields the full-image pass,
/// the second yields the crop pass. Call counts are observable.
struct StubAnnotator {
    passes: Vec<Annotation>,
    objects: Vec<LocalizedObject>,
    annotate_calls: AtomicUsize,
    localize_calls: AtomicUsize,
}

impl StubAnnotator {
    fn new(passes: Vec<Annotation>, objects: Vec<LocalizedObject>) -> Arc<Self> {
        Arc::new(Self {
            passes,
            objects,
            annotate_calls: AtomicUsize::new(0),
            localize_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl VisionAnnotator for StubAnnotator {
    async fn annotate(&self, _image: &[u8]) -> Result<Annotation, AnnotatorError> {
        let n = self.annotate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.passes.get(n).cloned().unwrap_or_default())
    }

    async fn localize(&self, _image: &[u8]) -> Result<Vec<LocalizedObject>, AnnotatorError> {
        self.localize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.clone())
    }
}

struct StubProvider {
    source: &'static str,
    titles: Vec<&'static str>,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new(source: &'static str, titles: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            source,
            titles,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ListingProvider for StubProvider {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Listing>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .titles
            .iter()
            .map(|t| Listing::normalized(t, self.source, Some(99.0), None, None).unwrap())
            .collect())
    }

    fn name(&self) -> &'static str {
        self.source
    }
}

#[tokio::test]
async fn test_faces_reject_before_any_further_call() {
    let mut with_face = Annotation::default();
    with_face.face_annotations = vec![serde_json::json!({})];
    let annotator = StubAnnotator::new(vec![with_face], vec![full_box_object("person", 0.9)]);

    let engine = SignalFusionEngine::new(annotator.clone(), None);
    let result = engine.analyze(&test_png()).await;

    assert!(matches!(
        result,
        Err(AnalysisError::FacesDetected { faces: 1 })
    ));
    // Exactly one backend round trip happened
    assert_eq!(annotator.annotate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(annotator.localize_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_degenerate_region_skips_crop_pass() {
    let mut base = Annotation::default();
    base.label_annotations = vec![entity("vacuum cleaner", 0.93)];

    // Only 3 vertices: not a usable region
    let degenerate = LocalizedObject {
        name: "vacuum".to_string(),
        score: 0.9,
        bounding_poly: BoundingPoly {
            normalized_vertices: vec![
                NormalizedVertex { x: 0.0, y: 0.0 },
                NormalizedVertex { x: 1.0, y: 0.0 },
                NormalizedVertex { x: 1.0, y: 1.0 },
            ],
        },
    };
    let annotator = StubAnnotator::new(vec![base], vec![degenerate]);

    let engine = SignalFusionEngine::new(annotator.clone(), None);
    let report = engine.analyze(&test_png()).await.unwrap();

    assert!(matches!(report.crop_pass, EnrichmentStatus::Skipped(_)));
    // The bundle is exactly the first pass
    assert_eq!(report.bundle.labels.len(), 1);
    assert_eq!(report.bundle.labels[0].description, "vacuum cleaner");
    assert_eq!(annotator.annotate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(annotator.localize_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_crop_pass_merges_into_bundle() {
    let mut base = Annotation::default();
    base.label_annotations = vec![entity("vacuum cleaner", 0.93)];
    base.full_text_annotation = Some(FullTextAnnotation {
        text: "Serial 123456".to_string(),
    });
    base.web_detection = Some(WebDetection {
        web_entities: vec![WebEntity {
            description: "Dyson V8".to_string(),
            score: 1.2,
        }],
        best_guess_labels: vec![],
    });

    let mut crop = Annotation::default();
    crop.label_annotations = vec![entity("motor", 0.8)];
    crop.logo_annotations = vec![entity("Dyson", 0.95)];

    let annotator = StubAnnotator::new(
        vec![base, crop],
        vec![full_box_object("vacuum", 0.9)],
    );

    let engine = SignalFusionEngine::new(annotator.clone(), None);
    let report = engine.analyze(&test_png()).await.unwrap();

    assert!(matches!(report.crop_pass, EnrichmentStatus::Applied));
    assert_eq!(annotator.annotate_calls.load(Ordering::SeqCst), 2);
    assert_eq!(annotator.localize_calls.load(Ordering::SeqCst), 1);

    let labels: Vec<&str> = report
        .bundle
        .labels
        .iter()
        .map(|l| l.description.as_str())
        .collect();
    assert!(labels.contains(&"vacuum cleaner"));
    assert!(labels.contains(&"motor"));
    assert_eq!(report.bundle.logos, vec!["Dyson"]);
    assert!(report.bundle.model_hints.contains(&"123456".to_string()));
}

#[tokio::test]
async fn test_fallback_provider_not_consulted_when_primary_suffices() {
    let primary = StubProvider::new("primary", vec!["a", "b", "c", "d", "e"]);
    let fallback = StubProvider::new("fallback", vec!["z"]);
    let aggregator = MarketplaceAggregator::new(vec![
        ProviderStep::new(primary, Trigger::Always),
        ProviderStep::new(fallback.clone(), Trigger::IfFewerThan(4)),
    ]);

    let listings = aggregator.search("dyson v8").await.unwrap();
    assert_eq!(listings.len(), 5);
    assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_photo_to_listings_round_trip() {
    let mut base = Annotation::default();
    base.label_annotations = vec![entity("vacuum cleaner", 0.93)];
    base.web_detection = Some(WebDetection {
        web_entities: vec![],
        best_guess_labels: vec![product_scout::vision::annotator::BestGuessLabel {
            label: "dyson v8 absolute".to_string(),
        }],
    });
    let annotator = StubAnnotator::new(vec![base], vec![]);

    // Two providers returning an overlapping listing
    let api = StubProvider::new("api", vec!["Dyson V8 Absolute", "Dyson V8 Motorhead"]);
    let scraped = StubProvider::new("scraped", vec!["Dyson V8 gebraucht"]);
    let dup = StubProvider::new("api", vec!["Dyson V8 Absolute"]);

    let service = ScoutService::new(
        SignalFusionEngine::new(annotator, None),
        IntentClassifier::new(None),
        MarketplaceAggregator::new(vec![
            ProviderStep::new(api, Trigger::Always),
            ProviderStep::new(scraped, Trigger::Always),
            ProviderStep::new(dup, Trigger::Always),
        ]),
    );

    let found = service.find(&test_png()).await.unwrap();

    // Without a model the query falls back to the web best guess
    assert_eq!(found.intent.query, "dyson v8 absolute");
    // The duplicate title+price+source listing was dropped
    assert_eq!(found.listings.len(), 3);
    assert_eq!(found.signals.labels[0].description, "vacuum cleaner");
}
