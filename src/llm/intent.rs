// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Intent classification: signal bundle to marketplace query
//!
//! A simple prompt/parse round trip with a JSON-repair fallback. When
//! the model is unconfigured or its reply is unusable, the query is
//! assembled heuristically from the strongest signals instead; this
//! step never fails the request.

use serde::Serialize;
use tracing::warn;

use super::client::ChatClient;
use super::json::{extract_json_object, str_field};
use crate::vision::signals::SignalBundle;

const SYSTEM_PROMPT: &str = "You turn product-identification signals into a short marketplace search query. Respond with strict JSON only: {\"query\": string, \"category\": string}. The query is 2-6 words a buyer would type; category may be empty.";

/// A marketplace query derived from one signal bundle
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Derives a search query from identification signals
pub struct IntentClassifier {
    chat: Option<ChatClient>,
}

impl IntentClassifier {
    pub fn new(chat: Option<ChatClient>) -> Self {
        Self { chat }
    }

    /// Classify a bundle into a marketplace query.
    ///
    /// Model path first; any failure degrades to the heuristic query.
    pub async fn classify(&self, bundle: &SignalBundle) -> QueryIntent {
        if let Some(ref chat) = self.chat {
            match chat.complete(SYSTEM_PROMPT, &describe_signals(bundle), None).await {
                Ok(reply) => {
                    if let Some(intent) = parse_intent(&reply) {
                        return intent;
                    }
                    warn!("intent reply unusable, falling back to heuristic query");
                }
                Err(e) => warn!("intent request failed: {}, falling back", e),
            }
        }

        QueryIntent {
            query: fallback_query(bundle),
            category: None,
        }
    }
}

/// Compact, line-oriented signal summary for the prompt
fn describe_signals(bundle: &SignalBundle) -> String {
    let mut lines = Vec::new();
    if let Some(ref opinion) = bundle.second_opinion {
        lines.push(format!(
            "guess: {} {} ({})",
            opinion.brand, opinion.model, opinion.product_type
        ));
    }
    if !bundle.best_guess.is_empty() {
        lines.push(format!("best guess: {}", bundle.best_guess));
    }
    if !bundle.logos.is_empty() {
        lines.push(format!("logos: {}", bundle.logos.join(", ")));
    }
    if !bundle.model_hints.is_empty() {
        lines.push(format!("model numbers: {}", bundle.model_hints.join(", ")));
    }
    let labels: Vec<&str> = bundle
        .labels
        .iter()
        .take(5)
        .map(|l| l.description.as_str())
        .collect();
    if !labels.is_empty() {
        lines.push(format!("labels: {}", labels.join(", ")));
    }
    let entities: Vec<&str> = bundle
        .web_entities
        .iter()
        .take(5)
        .map(String::as_str)
        .collect();
    if !entities.is_empty() {
        lines.push(format!("web entities: {}", entities.join(", ")));
    }
    lines.join("\n")
}

fn parse_intent(reply: &str) -> Option<QueryIntent> {
    let value = extract_json_object(reply)?;
    let query = str_field(&value, "query");
    if query.is_empty() {
        return None;
    }
    let category = match str_field(&value, "category") {
        c if c.is_empty() => None,
        c => Some(c),
    };
    Some(QueryIntent { query, category })
}

/// Strongest-signal-first query when the model path is unavailable:
/// second-opinion brand+model, then best guess, then first logo plus
/// first label, then first web entity, then first label alone.
pub fn fallback_query(bundle: &SignalBundle) -> String {
    if let Some(ref opinion) = bundle.second_opinion {
        let combined = format!("{} {}", opinion.brand, opinion.model);
        let combined = combined.trim();
        if !combined.is_empty() {
            return combined.to_string();
        }
    }
    if !bundle.best_guess.is_empty() {
        return bundle.best_guess.clone();
    }
    if let (Some(logo), Some(label)) = (bundle.logos.first(), bundle.labels.first()) {
        return format!("{} {}", logo, label.description);
    }
    if let Some(entity) = bundle.web_entities.first() {
        return entity.clone();
    }
    bundle
        .labels
        .first()
        .map(|l| l.description.clone())
        .unwrap_or_default()
}
