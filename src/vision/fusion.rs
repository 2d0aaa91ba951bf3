// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Signal fusion engine
//!
//! Composes the preprocessor, the region cropper, two extraction passes
//! and the model-based second opinion into one [`SignalBundle`] per
//! request. Only the face-policy check and a failure of the first
//! extraction pass are fatal; every later enrichment step degrades
//! gracefully and reports why it was skipped.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::annotator::{AnnotatorError, VisionAnnotator};
use super::cropper::RegionCropper;
use super::extractor::signal_pass;
use super::hints::HintExtractor;
use super::image_ops::{self, ImageOpsError};
use super::signals::{Enrichment, EnrichmentStatus, SecondOpinion, SignalBundle, SignalPass};
use crate::llm::SecondOpinionExtractor;

/// Errors that terminate the image pipeline
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Product-images-only policy: a photo with people in it is rejected
    #[error("image rejected: {faces} face(s) detected, product photos only")]
    FacesDetected { faces: u32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Corrupt or oversized image data
    #[error(transparent)]
    Image(#[from] ImageOpsError),

    /// The first extraction pass failed; nothing useful can be returned
    #[error("image analysis failed: {0}")]
    Extraction(#[from] AnnotatorError),
}

/// Result of a full analysis: the merged bundle plus the visibility of
/// each optional enrichment step
#[derive(Debug)]
pub struct AnalysisReport {
    pub bundle: SignalBundle,
    pub crop_pass: EnrichmentStatus,
    pub second_opinion: EnrichmentStatus,
}

/// Turns raw image bytes into one merged signal bundle
pub struct SignalFusionEngine {
    annotator: Arc<dyn VisionAnnotator>,
    cropper: RegionCropper,
    second_opinion: Option<SecondOpinionExtractor>,
    hints: HintExtractor,
}

impl SignalFusionEngine {
    pub fn new(
        annotator: Arc<dyn VisionAnnotator>,
        second_opinion: Option<SecondOpinionExtractor>,
    ) -> Self {
        let cropper = RegionCropper::new(Arc::clone(&annotator));
        Self {
            annotator,
            cropper,
            second_opinion,
            hints: HintExtractor::new(),
        }
    }

    /// Run the full fusion pipeline over one image.
    ///
    /// Pass 1 runs on the preprocessed full image and is fatal on
    /// failure. The crop pass and the second opinion run concurrently
    /// afterwards; either may be skipped without failing the request.
    pub async fn analyze(&self, image: &[u8]) -> Result<AnalysisReport, AnalysisError> {
        if image.is_empty() {
            return Err(AnalysisError::InvalidInput("empty image payload".to_string()));
        }

        let processed = image_ops::preprocess(image)?;
        let base = signal_pass(self.annotator.annotate(&processed).await?);

        // Product-only policy: reject before any further external call
        if base.face_count > 0 {
            info!(faces = base.face_count, "rejecting image with faces");
            return Err(AnalysisError::FacesDetected {
                faces: base.face_count,
            });
        }

        // The second opinion only needs the original image, so the two
        // enrichment branches are independent of each other.
        let (crop_pass, opinion) =
            tokio::join!(self.crop_pass(&processed), self.opine(&processed));

        if let EnrichmentStatus::Skipped(reason) = crop_pass.status() {
            debug!(reason = %reason, "crop pass skipped");
        }
        if let EnrichmentStatus::Skipped(reason) = opinion.status() {
            warn!(reason = %reason, "second opinion skipped");
        }

        let crop_status = crop_pass.status();
        let opinion_status = opinion.status();

        let mut bundle = SignalBundle::from_pass(base);
        if let Enrichment::Applied(pass) = crop_pass {
            bundle.merge_pass(pass);
        }

        bundle.model_hints = self.hints.extract(&bundle.ocr_text);

        if let Enrichment::Applied(opinion) = opinion {
            bundle.insert_logo(&opinion.brand);
            bundle.insert_web_entity(&opinion.product_type);
            bundle.second_opinion = Some(opinion);
        }

        info!(
            labels = bundle.labels.len(),
            logos = bundle.logos.len(),
            web_entities = bundle.web_entities.len(),
            hints = bundle.model_hints.len(),
            "image analysis complete"
        );

        Ok(AnalysisReport {
            bundle,
            crop_pass: crop_status,
            second_opinion: opinion_status,
        })
    }

    /// Optional crop pass: locate a region, preprocess it, extract again
    async fn crop_pass(&self, processed: &[u8]) -> Enrichment<SignalPass> {
        let crop = match self.cropper.crop(processed).await {
            Ok(Some(crop)) => crop,
            Ok(None) => return Enrichment::skipped("no confident region"),
            Err(e) => return Enrichment::skipped(format!("crop failed: {}", e)),
        };

        let prepared = match image_ops::preprocess(&crop) {
            Ok(prepared) => prepared,
            Err(e) => return Enrichment::skipped(format!("crop preprocess failed: {}", e)),
        };

        match self.annotator.annotate(&prepared).await {
            Ok(annotation) => Enrichment::Applied(signal_pass(annotation)),
            Err(e) => Enrichment::skipped(format!("crop extraction failed: {}", e)),
        }
    }

    /// Optional model-based second opinion over the full image
    async fn opine(&self, processed: &[u8]) -> Enrichment<SecondOpinion> {
        match &self.second_opinion {
            Some(extractor) => extractor.extract(processed).await,
            None => Enrichment::skipped("second opinion not configured"),
        }
    }
}
