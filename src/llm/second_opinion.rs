// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model-based second opinion on product identity
//!
//! One external request with a compact structured-output instruction,
//! run against the original image only. The reply is parsed defensively:
//! transport failures and unusable replies yield a skipped enrichment,
//! never a request failure.

use tracing::debug;

use super::client::ChatClient;
use super::json::{confidence_field, extract_json_object, str_array_field, str_field};
use crate::vision::signals::{Enrichment, SecondOpinion};

const SYSTEM_PROMPT: &str = "You identify consumer products from photos. Respond with strict JSON only, no prose, no markdown, exactly this shape: {\"brand\": string, \"model\": string, \"product_type\": string, \"synonyms\": [string], \"confidence\": number between 0 and 1}. Use empty strings and empty arrays for unknowns.";

const USER_PROMPT: &str = "Identify the product in this photo.";

/// Requests and parses a structured brand/model guess for an image
pub struct SecondOpinionExtractor {
    chat: ChatClient,
}

impl SecondOpinionExtractor {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }

    /// Ask the model for a second opinion on the product in `image_png`
    pub async fn extract(&self, image_png: &[u8]) -> Enrichment<SecondOpinion> {
        let reply = match self
            .chat
            .complete(SYSTEM_PROMPT, USER_PROMPT, Some(image_png))
            .await
        {
            Ok(reply) => reply,
            Err(e) => return Enrichment::skipped(format!("model request failed: {}", e)),
        };

        match parse_opinion(&reply) {
            Some(opinion) => {
                debug!(
                    brand = %opinion.brand,
                    model = %opinion.model,
                    confidence = opinion.confidence,
                    "second opinion parsed"
                );
                Enrichment::Applied(opinion)
            }
            None => Enrichment::skipped("model reply was not parseable JSON"),
        }
    }
}

/// Parse a model reply into a [`SecondOpinion`], defaulting every field
pub fn parse_opinion(reply: &str) -> Option<SecondOpinion> {
    let value = extract_json_object(reply)?;

    let mut synonyms = Vec::new();
    for synonym in str_array_field(&value, "synonyms") {
        if !synonyms.contains(&synonym) {
            synonyms.push(synonym);
        }
    }

    Some(SecondOpinion {
        brand: str_field(&value, "brand"),
        model: str_field(&value, "model"),
        product_type: str_field(&value, "product_type"),
        synonyms,
        confidence: confidence_field(&value, "confidence"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_reply() {
        let reply = r#"{"brand": "Dyson", "model": "V8 Absolute", "product_type": "cordless vacuum", "synonyms": ["stick vacuum"], "confidence": 0.92}"#;
        let opinion = parse_opinion(reply).unwrap();
        assert_eq!(opinion.brand, "Dyson");
        assert_eq!(opinion.model, "V8 Absolute");
        assert_eq!(opinion.product_type, "cordless vacuum");
        assert_eq!(opinion.synonyms, vec!["stick vacuum"]);
        assert!((opinion.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"brand\": \"Bosch\", \"confidence\": 0.5}\n```";
        let opinion = parse_opinion(reply).unwrap();
        assert_eq!(opinion.brand, "Bosch");
        assert_eq!(opinion.model, "");
        assert!(opinion.synonyms.is_empty());
    }

    #[test]
    fn test_parse_unusable_reply() {
        assert!(parse_opinion("I cannot tell what this is.").is_none());
        assert!(parse_opinion("").is_none());
    }

    #[test]
    fn test_parse_dedups_synonyms() {
        let reply = r#"{"brand": "x", "synonyms": ["vac", "vac", "hoover"]}"#;
        let opinion = parse_opinion(reply).unwrap();
        assert_eq!(opinion.synonyms, vec!["vac", "hoover"]);
    }

    #[test]
    fn test_system_prompt_demands_strict_json() {
        assert!(SYSTEM_PROMPT.contains("strict JSON"));
        assert!(SYSTEM_PROMPT.contains("product_type"));
    }
}
