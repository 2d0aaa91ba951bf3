// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing ahead of recognition calls
//!
//! Normalizes orientation, size and contrast of an input photo so the
//! downstream text/label recognition works on the best possible input.
//! Pure functions, deterministic for identical bytes.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use thiserror::Error;

/// Maximum accepted payload (10MB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Images are never delivered wider than this; never upscaled either
pub const MAX_WIDTH: u32 = 1600;

const SHARPEN_SIGMA: f32 = 1.2;
const SHARPEN_THRESHOLD: i32 = 3;
const GAMMA: f32 = 1.1;
const CONTRAST_BOOST: f32 = 12.0;

/// Errors from image decoding and processing
#[derive(Debug, Error)]
pub enum ImageOpsError {
    #[error("image data is empty")]
    EmptyData,

    #[error("image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("failed to encode image: {0}")]
    EncodeFailed(String),
}

/// A pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Prepare an image for recognition.
///
/// Guarantees on the output bytes: oriented upright per the embedded
/// EXIF orientation tag, no wider than [`MAX_WIDTH`] (never upscaled),
/// sharpened, gamma-corrected and contrast-normalized. Corrupt input is
/// fatal for the request.
pub fn preprocess(bytes: &[u8]) -> Result<Vec<u8>, ImageOpsError> {
    let img = decode(bytes)?;
    let img = apply_orientation(img, read_exif_orientation(bytes));
    let img = cap_width(img, MAX_WIDTH);

    let img = img
        .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD)
        .adjust_contrast(CONTRAST_BOOST);
    let img = gamma_correct(img, GAMMA);

    encode_png(&img)
}

/// Decode image bytes after validating size limits
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageOpsError> {
    if bytes.is_empty() {
        return Err(ImageOpsError::EmptyData);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageOpsError::TooLarge(bytes.len(), MAX_IMAGE_BYTES));
    }
    image::load_from_memory(bytes).map_err(|e| ImageOpsError::DecodeFailed(e.to_string()))
}

/// Pixel dimensions of an encoded image
pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32), ImageOpsError> {
    Ok(decode(bytes)?.dimensions())
}

/// Extract a pixel rectangle from an encoded image, returned as PNG
pub fn extract_region(bytes: &[u8], rect: &PixelRect) -> Result<Vec<u8>, ImageOpsError> {
    let img = decode(bytes)?;
    let crop = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    encode_png(&crop)
}

/// Read the EXIF orientation tag (0x0112) from raw bytes.
/// Returns 1 (normal) when no EXIF data or tag is present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation transform.
///
/// 1 = normal, 2 = mirrored, 3 = 180deg, 4 = flipped V,
/// 5 = mirrored + 90deg CW, 6 = 90deg CW, 7 = mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn cap_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_width {
        return img;
    }
    let new_h = ((h as f64) * (max_width as f64) / (w as f64)).round().max(1.0) as u32;
    img.resize_exact(max_width, new_h, FilterType::CatmullRom)
}

fn gamma_correct(img: DynamicImage, gamma: f32) -> DynamicImage {
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let normalized = (i as f32) / 255.0;
        *entry = (normalized.powf(1.0 / gamma) * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    let mut rgba: RgbaImage = img.to_rgba8();
    for pixel in rgba.pixels_mut() {
        // Alpha channel is left alone
        for channel in &mut pixel.0[..3] {
            *channel = lut[*channel as usize];
        }
    }
    DynamicImage::ImageRgba8(rgba)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImageOpsError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImageOpsError::EncodeFailed(e.to_string()))?;
    Ok(out.into_inner())
}
