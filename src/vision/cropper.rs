// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Region cropping for the focused second recognition pass
//!
//! Finds the single most likely product region in an image and extracts
//! it as a sub-image. "No confident region" is a normal outcome, not an
//! error: fewer than four polygon vertices, no regions at all, or a crop
//! too small to add recognition value all yield `None`.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::annotator::{AnnotatorError, LocalizedObject, VisionAnnotator};
use super::image_ops::{self, ImageOpsError, PixelRect};

/// Pad added to each side of the bounding rectangle, as a fraction of
/// the rectangle's own dimension
pub const PAD_RATIO: f32 = 0.06;

/// Crops smaller than this on either axis carry no extra recognition
/// value over the full image
pub const MIN_CROP_PX: u32 = 50;

/// Errors from the cropping step. Callers treat these as a skipped
/// enrichment, never as a request failure.
#[derive(Debug, Error)]
pub enum CropError {
    #[error(transparent)]
    Annotator(#[from] AnnotatorError),

    #[error(transparent)]
    Image(#[from] ImageOpsError),
}

/// Finds and extracts the most likely product region of an image
pub struct RegionCropper {
    annotator: Arc<dyn VisionAnnotator>,
}

impl RegionCropper {
    pub fn new(annotator: Arc<dyn VisionAnnotator>) -> Self {
        Self { annotator }
    }

    /// Crop the most confident product region out of `image`.
    ///
    /// Returns `Ok(None)` when no confident region exists.
    pub async fn crop(&self, image: &[u8]) -> Result<Option<Vec<u8>>, CropError> {
        let objects = self.annotator.localize(image).await?;
        let (width, height) = image_ops::dimensions(image)?;

        let rect = match select_region(&objects, width, height) {
            Some(rect) => rect,
            None => {
                debug!("no confident product region found");
                return Ok(None);
            }
        };

        debug!(
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "cropping product region"
        );
        Ok(Some(image_ops::extract_region(image, &rect)?))
    }
}

/// Turn localized objects into a pixel crop rectangle.
///
/// Picks the highest-confidence region (ties broken by first-seen
/// order), clamps vertices to [0, 1], pads the bounding rectangle by
/// [`PAD_RATIO`] per side clamped back into bounds, and converts to
/// pixels. Rejects regions with fewer than four vertices and crops
/// smaller than [`MIN_CROP_PX`] on either axis.
pub fn select_region(objects: &[LocalizedObject], width: u32, height: u32) -> Option<PixelRect> {
    // Strictly-greater comparison keeps the first-seen object on ties
    let best = objects
        .iter()
        .fold(None::<&LocalizedObject>, |best, obj| match best {
            Some(b) if obj.score <= b.score => Some(b),
            _ => Some(obj),
        })?;

    let vertices = &best.bounding_poly.normalized_vertices;
    if vertices.len() < 4 {
        return None;
    }

    let mut min_x: f32 = 1.0;
    let mut min_y: f32 = 1.0;
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for v in vertices {
        let x = v.x.clamp(0.0, 1.0);
        let y = v.y.clamp(0.0, 1.0);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let pad_x = (max_x - min_x) * PAD_RATIO;
    let pad_y = (max_y - min_y) * PAD_RATIO;
    min_x = (min_x - pad_x).max(0.0);
    min_y = (min_y - pad_y).max(0.0);
    max_x = (max_x + pad_x).min(1.0);
    max_y = (max_y + pad_y).min(1.0);

    let x0 = (min_x * width as f32).floor() as u32;
    let y0 = (min_y * height as f32).floor() as u32;
    let x1 = ((max_x * width as f32).ceil() as u32).min(width);
    let y1 = ((max_y * height as f32).ceil() as u32).min(height);

    let crop_w = x1.saturating_sub(x0);
    let crop_h = y1.saturating_sub(y0);
    if crop_w < MIN_CROP_PX || crop_h < MIN_CROP_PX {
        return None;
    }

    Some(PixelRect {
        x: x0,
        y: y0,
        width: crop_w,
        height: crop_h,
    })
}
