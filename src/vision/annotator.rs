// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image-understanding capability boundary
//!
//! The recognition pipeline only depends on the [`VisionAnnotator`]
//! trait; the wire format of the backing service stays behind
//! [`HttpVisionAnnotator`], which speaks a Google Vision style
//! `images:annotate` JSON protocol.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// Language hints sent with every text-detection request
pub const LANGUAGE_HINTS: [&str; 7] = ["en", "fr", "de", "es", "it", "nl", "pl"];

const MAX_LABELS: u32 = 20;
const MAX_LOGOS: u32 = 10;
const MAX_OBJECTS: u32 = 10;

/// Errors from the image-understanding capability
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("vision API not configured")]
    NotConfigured,

    #[error("vision request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("vision API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("vision response parse error: {0}")]
    Parse(String),
}

/// One raw annotation response for a single image
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default)]
    pub label_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub logo_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub localized_object_annotations: Vec<LocalizedObject>,
    #[serde(default)]
    pub text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    pub full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    pub web_detection: Option<WebDetection>,
    #[serde(default)]
    pub face_annotations: Vec<serde_json::Value>,
    #[serde(default)]
    pub safe_search_annotation: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedObject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub bounding_poly: BoundingPoly,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub normalized_vertices: Vec<NormalizedVertex>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedVertex {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebDetection {
    #[serde(default)]
    pub web_entities: Vec<WebEntity>,
    #[serde(default)]
    pub best_guess_labels: Vec<BestGuessLabel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebEntity {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestGuessLabel {
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateEnvelope {
    #[serde(default)]
    responses: Vec<Annotation>,
}

/// Capability interface for the external image-understanding service
#[async_trait]
pub trait VisionAnnotator: Send + Sync {
    /// Full multi-feature pass: labels, logos, objects, document text,
    /// web detection, safe-search and faces, in one round trip.
    async fn annotate(&self, image: &[u8]) -> Result<Annotation, AnnotatorError>;

    /// Object-localization-only pass, used to find the product region
    async fn localize(&self, image: &[u8]) -> Result<Vec<LocalizedObject>, AnnotatorError>;
}

/// HTTP implementation of [`VisionAnnotator`]
pub struct HttpVisionAnnotator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl HttpVisionAnnotator {
    /// Create a new annotator client
    ///
    /// # Arguments
    /// * `endpoint` - Base URL of the annotate endpoint
    /// * `api_key` - API key, `None` when unconfigured
    /// * `timeout_ms` - Per-request timeout
    pub fn new(endpoint: &str, api_key: Option<String>, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            timeout_ms,
        }
    }

    async fn request(
        &self,
        image: &[u8],
        features: serde_json::Value,
        with_language_hints: bool,
    ) -> Result<Annotation, AnnotatorError> {
        let key = self.api_key.as_deref().ok_or(AnnotatorError::NotConfigured)?;

        let mut request = serde_json::json!({
            "image": { "content": STANDARD.encode(image) },
            "features": features,
        });
        if with_language_hints {
            request["imageContext"] = serde_json::json!({ "languageHints": LANGUAGE_HINTS });
        }
        let body = serde_json::json!({ "requests": [request] });

        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnnotatorError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    AnnotatorError::ApiError {
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AnnotatorError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: AnnotateEnvelope = response
            .json()
            .await
            .map_err(|e| AnnotatorError::Parse(e.to_string()))?;

        envelope
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| AnnotatorError::Parse("empty responses array".to_string()))
    }
}

#[async_trait]
impl VisionAnnotator for HttpVisionAnnotator {
    async fn annotate(&self, image: &[u8]) -> Result<Annotation, AnnotatorError> {
        let features = serde_json::json!([
            { "type": "LABEL_DETECTION", "maxResults": MAX_LABELS },
            { "type": "LOGO_DETECTION", "maxResults": MAX_LOGOS },
            { "type": "OBJECT_LOCALIZATION", "maxResults": MAX_OBJECTS },
            { "type": "DOCUMENT_TEXT_DETECTION" },
            { "type": "WEB_DETECTION" },
            { "type": "SAFE_SEARCH_DETECTION" },
            { "type": "FACE_DETECTION" },
        ]);
        self.request(image, features, true).await
    }

    async fn localize(&self, image: &[u8]) -> Result<Vec<LocalizedObject>, AnnotatorError> {
        let features =
            serde_json::json!([{ "type": "OBJECT_LOCALIZATION", "maxResults": MAX_OBJECTS }]);
        Ok(self
            .request(image, features, false)
            .await?
            .localized_object_annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotator_trims_trailing_slash() {
        let annotator = HttpVisionAnnotator::new(
            "https://vision.example.com/v1/images:annotate/",
            Some("key".to_string()),
            9000,
        );
        assert_eq!(
            annotator.endpoint,
            "https://vision.example.com/v1/images:annotate"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_annotator_errors() {
        let annotator = HttpVisionAnnotator::new("https://vision.example.com", None, 9000);
        let result = annotator.annotate(&[1, 2, 3]).await;
        assert!(matches!(result, Err(AnnotatorError::NotConfigured)));
    }

    #[test]
    fn test_annotation_deserializes_sparse_response() {
        let json = serde_json::json!({
            "labelAnnotations": [
                { "description": "vacuum cleaner", "score": 0.93 }
            ],
            "webDetection": {
                "webEntities": [{ "description": "Dyson V8", "score": 1.4 }],
                "bestGuessLabels": [{ "label": "dyson v8 absolute" }]
            }
        });
        let annotation: Annotation = serde_json::from_value(json).unwrap();
        assert_eq!(annotation.label_annotations.len(), 1);
        assert_eq!(annotation.face_annotations.len(), 0);
        assert!(annotation.full_text_annotation.is_none());
        let web = annotation.web_detection.unwrap();
        assert_eq!(web.best_guess_labels[0].label, "dyson v8 absolute");
    }

    #[test]
    fn test_envelope_deserialization() {
        let json = serde_json::json!({ "responses": [{}] });
        let envelope: AnnotateEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(envelope.responses.len(), 1);
    }

    #[test]
    fn test_language_hints_cover_required_languages() {
        for lang in ["en", "fr", "de", "es", "it", "nl", "pl"] {
            assert!(LANGUAGE_HINTS.contains(&lang));
        }
    }
}
