// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Defensive JSON extraction from model replies
//!
//! Model output is unreliable: replies may wrap the JSON in markdown
//! fences or prose, or not contain valid JSON at all. Extraction never
//! fails the caller; it returns `None` and the caller defaults.

use serde_json::Value;

/// Pull the first JSON object out of a model reply.
///
/// Tries, in order: the whole trimmed reply, the reply with markdown
/// code fences stripped, and the substring between the first `{` and
/// the last `}`. Returns `None` unless the result is a JSON object.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }

    let unfenced = strip_fences(trimmed);
    if let Some(value) = parse_object(unfenced) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&trimmed[start..=end])
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

fn strip_fences(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// String field with empty-string default
pub fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// String-array field with empty default; non-string entries are dropped
pub fn str_array_field(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Numeric field clamped into [0, 1], defaulting to 0
pub fn confidence_field(value: &Value, key: &str) -> f32 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let value = extract_json_object(r#"{"brand": "Dyson"}"#).unwrap();
        assert_eq!(value["brand"], "Dyson");
    }

    #[test]
    fn test_fenced_object() {
        let raw = "```json\n{\"brand\": \"Dyson\"}\n```";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["brand"], "Dyson");
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let raw = "Sure! Here is the result: {\"brand\": \"Bosch\", \"model\": \"GSR 12V\"} Hope that helps.";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["model"], "GSR 12V");
    }

    #[test]
    fn test_garbage_returns_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("").is_none());
        assert!(extract_json_object("{broken").is_none());
    }

    #[test]
    fn test_non_object_json_rejected() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("\"just a string\"").is_none());
    }

    #[test]
    fn test_field_defaults() {
        let value = extract_json_object(r#"{"brand": "Dyson"}"#).unwrap();
        assert_eq!(str_field(&value, "brand"), "Dyson");
        assert_eq!(str_field(&value, "model"), "");
        assert!(str_array_field(&value, "synonyms").is_empty());
        assert_eq!(confidence_field(&value, "confidence"), 0.0);
    }

    #[test]
    fn test_confidence_clamped() {
        let value = extract_json_object(r#"{"confidence": 3.5}"#).unwrap();
        assert_eq!(confidence_field(&value, "confidence"), 1.0);

        let value = extract_json_object(r#"{"confidence": -0.2}"#).unwrap();
        assert_eq!(confidence_field(&value, "confidence"), 0.0);
    }

    #[test]
    fn test_str_array_skips_non_strings() {
        let value =
            extract_json_object(r#"{"synonyms": ["stick vacuum", 7, "", "cordless vac"]}"#)
                .unwrap();
        assert_eq!(
            str_array_field(&value, "synonyms"),
            vec!["stick vacuum", "cordless vac"]
        );
    }
}
