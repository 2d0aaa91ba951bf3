// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Signal bundle types and merge rules
//!
//! A [`SignalBundle`] is the merged set of product-identification clues
//! derived from one image: labels, logos, detected objects, OCR text,
//! web entities, model-number hints and an optional model-derived
//! second opinion. One bundle is built per request and discarded after
//! the response is produced.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single label detection with its confidence score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub description: String,
    /// Confidence in [0, 1]
    pub score: f32,
}

/// A localized object detection with a normalized bounding box
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub name: String,
    pub score: f32,
    /// Four corner points, each coordinate normalized to [0, 1]
    pub bounds: [[f32; 2]; 4],
}

/// Structured brand/model guess from the model-based extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecondOpinion {
    pub brand: String,
    pub model: String,
    pub product_type: String,
    pub synonyms: Vec<String>,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

/// Signals extracted from a single recognition pass over one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalPass {
    /// Detector-ranked, not deduplicated
    pub labels: Vec<Label>,
    /// Brand names, deduplicated by exact string equality
    pub logos: Vec<String>,
    pub objects: Vec<DetectedObject>,
    pub ocr_text: String,
    pub best_guess: String,
    /// Top entities sorted by score, deduplicated, capped at 12
    pub web_entities: Vec<String>,
    pub face_count: u32,
    /// Opaque classification map, passed through unmodified
    pub safe_search: HashMap<String, String>,
}

/// The merged result of up to three information sources for one request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalBundle {
    pub labels: Vec<Label>,
    pub logos: Vec<String>,
    pub objects: Vec<DetectedObject>,
    pub ocr_text: String,
    pub best_guess: String,
    pub web_entities: Vec<String>,
    pub face_count: u32,
    pub safe_search: HashMap<String, String>,
    /// Candidate model/part numbers derived from the OCR text, at most 10
    pub model_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_opinion: Option<SecondOpinion>,
}

impl SignalBundle {
    /// Seed a bundle from the first (full-image) pass
    pub fn from_pass(pass: SignalPass) -> Self {
        Self {
            labels: pass.labels,
            logos: pass.logos,
            objects: pass.objects,
            ocr_text: pass.ocr_text,
            best_guess: pass.best_guess,
            web_entities: pass.web_entities,
            face_count: pass.face_count,
            safe_search: pass.safe_search,
            model_hints: Vec::new(),
            second_opinion: None,
        }
    }

    /// Merge a later pass (the crop pass) into this bundle.
    ///
    /// Labels and objects are concatenated, not deduplicated; downstream
    /// consumers rank by frequency and position. Logos and web entities
    /// are unioned as sets. OCR halves are joined with a newline, skipping
    /// empty halves. `best_guess` keeps the earlier pass unless empty.
    pub fn merge_pass(&mut self, pass: SignalPass) {
        self.labels.extend(pass.labels);
        self.objects.extend(pass.objects);

        for logo in pass.logos {
            self.insert_logo(&logo);
        }
        for entity in pass.web_entities {
            self.insert_web_entity(&entity);
        }

        self.ocr_text = join_nonempty(&self.ocr_text, &pass.ocr_text);

        if self.best_guess.is_empty() {
            self.best_guess = pass.best_guess;
        }
    }

    /// Insert a logo, preserving set semantics and first-seen order
    pub fn insert_logo(&mut self, logo: &str) {
        insert_unique(&mut self.logos, logo);
    }

    /// Insert a web entity, preserving set semantics and first-seen order
    pub fn insert_web_entity(&mut self, entity: &str) {
        insert_unique(&mut self.web_entities, entity);
    }
}

/// Outcome of an optional enrichment step: the step either contributed a
/// value or was skipped for a stated reason. Skips are logged at the
/// boundary, never raised.
#[derive(Debug)]
pub enum Enrichment<T> {
    Applied(T),
    Skipped { reason: String },
}

impl<T> Enrichment<T> {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Status without the payload, for reporting
    pub fn status(&self) -> EnrichmentStatus {
        match self {
            Self::Applied(_) => EnrichmentStatus::Applied,
            Self::Skipped { reason } => EnrichmentStatus::Skipped(reason.clone()),
        }
    }
}

/// Reportable status of an optional enrichment step
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "status", content = "reason")]
pub enum EnrichmentStatus {
    Applied,
    Skipped(String),
}

fn insert_unique(values: &mut Vec<String>, value: &str) {
    if value.is_empty() {
        return;
    }
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (false, true) => a.to_string(),
        (true, false) => b.to_string(),
        (false, false) => format!("{}\n{}", a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(logos: &[&str], entities: &[&str], ocr: &str, guess: &str) -> SignalPass {
        SignalPass {
            logos: logos.iter().map(|s| s.to_string()).collect(),
            web_entities: entities.iter().map(|s| s.to_string()).collect(),
            ocr_text: ocr.to_string(),
            best_guess: guess.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_unions_logos_and_entities() {
        let mut bundle = SignalBundle::from_pass(pass(&["Dyson"], &["vacuum"], "", ""));
        bundle.merge_pass(pass(&["Dyson", "Bosch"], &["vacuum", "cordless"], "", ""));

        assert_eq!(bundle.logos, vec!["Dyson", "Bosch"]);
        assert_eq!(bundle.web_entities, vec!["vacuum", "cordless"]);
    }

    #[test]
    fn test_merge_never_shrinks_sets() {
        let base = pass(&["A", "B"], &["x"], "", "");
        let crop = pass(&["C"], &["y", "z"], "", "");

        let mut bundle = SignalBundle::from_pass(base.clone());
        bundle.merge_pass(crop.clone());

        for logo in base.logos.iter().chain(crop.logos.iter()) {
            assert!(bundle.logos.contains(logo));
        }
        for entity in base.web_entities.iter().chain(crop.web_entities.iter()) {
            assert!(bundle.web_entities.contains(entity));
        }
    }

    #[test]
    fn test_merge_sets_contain_no_duplicates() {
        let mut bundle = SignalBundle::from_pass(pass(&["A", "A"], &["x"], "", ""));
        bundle.merge_pass(pass(&["A"], &["x", "x"], "", ""));

        // Case-sensitive exact equality is the dedup rule
        assert_eq!(bundle.logos.iter().filter(|l| *l == "A").count(), 1);
        assert_eq!(bundle.web_entities.iter().filter(|e| *e == "x").count(), 1);
    }

    #[test]
    fn test_merge_case_sensitive_logos() {
        let mut bundle = SignalBundle::from_pass(pass(&["dyson"], &[], "", ""));
        bundle.merge_pass(pass(&["Dyson"], &[], "", ""));
        assert_eq!(bundle.logos, vec!["dyson", "Dyson"]);
    }

    #[test]
    fn test_merge_labels_concatenated_not_deduplicated() {
        let label = Label {
            description: "vacuum cleaner".to_string(),
            score: 0.9,
        };
        let mut base = SignalPass::default();
        base.labels.push(label.clone());
        let mut crop = SignalPass::default();
        crop.labels.push(label.clone());

        let mut bundle = SignalBundle::from_pass(base);
        bundle.merge_pass(crop);
        assert_eq!(bundle.labels.len(), 2);
    }

    #[test]
    fn test_merge_ocr_newline_join_skips_empty_halves() {
        let mut bundle = SignalBundle::from_pass(pass(&[], &[], "front text", ""));
        bundle.merge_pass(pass(&[], &[], "crop text", ""));
        assert_eq!(bundle.ocr_text, "front text\ncrop text");

        let mut bundle = SignalBundle::from_pass(pass(&[], &[], "", ""));
        bundle.merge_pass(pass(&[], &[], "crop text", ""));
        assert_eq!(bundle.ocr_text, "crop text");

        let mut bundle = SignalBundle::from_pass(pass(&[], &[], "front text", ""));
        bundle.merge_pass(pass(&[], &[], "", ""));
        assert_eq!(bundle.ocr_text, "front text");
    }

    #[test]
    fn test_merge_best_guess_earlier_pass_wins() {
        let mut bundle = SignalBundle::from_pass(pass(&[], &[], "", "dyson v8"));
        bundle.merge_pass(pass(&[], &[], "", "vacuum"));
        assert_eq!(bundle.best_guess, "dyson v8");

        let mut bundle = SignalBundle::from_pass(pass(&[], &[], "", ""));
        bundle.merge_pass(pass(&[], &[], "", "vacuum"));
        assert_eq!(bundle.best_guess, "vacuum");
    }

    #[test]
    fn test_insert_logo_ignores_empty() {
        let mut bundle = SignalBundle::default();
        bundle.insert_logo("");
        assert!(bundle.logos.is_empty());
    }

    #[test]
    fn test_enrichment_status() {
        let applied: Enrichment<u32> = Enrichment::Applied(1);
        assert_eq!(applied.status(), EnrichmentStatus::Applied);

        let skipped: Enrichment<u32> = Enrichment::skipped("no confident region");
        assert_eq!(
            skipped.status(),
            EnrichmentStatus::Skipped("no confident region".to_string())
        );
    }

    #[test]
    fn test_bundle_serializes_camel_case() {
        let bundle = SignalBundle::from_pass(pass(&[], &[], "text", "guess"));
        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("ocrText").is_some());
        assert!(json.get("bestGuess").is_some());
        assert!(json.get("modelHints").is_some());
        // A missing second opinion is omitted, not null
        assert!(json.get("secondOpinion").is_none());
    }
}
