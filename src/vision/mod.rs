// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image analysis: preprocessing, recognition passes and signal fusion
//!
//! This module turns raw image bytes into a merged, deduplicated bag of
//! identification signals:
//! - Preprocessing (orientation, size cap, sharpen/contrast)
//! - A full-image recognition pass via the vision capability
//! - An auto-cropped second pass over the most likely product region
//! - Model-number heuristics over the merged OCR text
//! - A model-derived second opinion folded into the signal sets

pub mod annotator;
pub mod cropper;
pub mod extractor;
pub mod fusion;
pub mod hints;
pub mod image_ops;
pub mod signals;

pub use annotator::{Annotation, AnnotatorError, HttpVisionAnnotator, VisionAnnotator};
pub use cropper::{CropError, RegionCropper};
pub use fusion::{AnalysisError, AnalysisReport, SignalFusionEngine};
pub use hints::HintExtractor;
pub use image_ops::ImageOpsError;
pub use signals::{
    DetectedObject, Enrichment, EnrichmentStatus, Label, SecondOpinion, SignalBundle, SignalPass,
};
