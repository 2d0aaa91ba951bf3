// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model-number heuristics over OCR text
//!
//! Three independent extractors contribute candidates into one
//! deduplicated, order-preserving set: bare catalog numbers, vendor
//! prefix tokens (e.g. `SM-G991B`), and general alphanumeric tokens.
//! Heuristic tuning stays isolated here; the fusion engine only sees
//! the combined capped set.

use regex::Regex;

/// The merged candidate set never exceeds this many entries
pub const MAX_HINTS: usize = 10;

/// Compiled heuristic extractors for model/part number candidates
pub struct HintExtractor {
    /// Bare 4-6 digit catalog/part numbers
    numeric: Regex,
    /// Vendor model-prefix tokens: 2-4 letters, hyphen, digit-bearing tail
    prefixed: Regex,
    /// General alphanumeric tokens of length >= 5 mixing digits and letters
    alphanumeric: Regex,
}

impl HintExtractor {
    pub fn new() -> Self {
        Self {
            numeric: Regex::new(r"\b\d{4,6}\b").unwrap(),
            prefixed: Regex::new(r"(?i)\b[A-Z]{2,4}-[A-Z0-9][A-Z0-9-]*\b").unwrap(),
            alphanumeric: Regex::new(r"\b[0-9A-Za-z]{5,}\b").unwrap(),
        }
    }

    /// Derive up to [`MAX_HINTS`] candidates from OCR text.
    ///
    /// Candidates are upper-cased before comparison and insertion order
    /// follows heuristic order, then text order within each heuristic.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut hints: Vec<String> = Vec::new();

        let mut push = |candidate: String| {
            if hints.len() < MAX_HINTS && !hints.contains(&candidate) {
                hints.push(candidate);
            }
        };

        for m in self.numeric.find_iter(text) {
            push(m.as_str().to_string());
        }

        for m in self.prefixed.find_iter(text) {
            let token = m.as_str();
            if token.chars().any(|c| c.is_ascii_digit()) {
                push(token.to_uppercase());
            }
        }

        for m in self.alphanumeric.find_iter(text) {
            let token = m.as_str();
            let has_digit = token.chars().any(|c| c.is_ascii_digit());
            let has_alpha = token.chars().any(|c| c.is_ascii_alphabetic());
            if has_digit && has_alpha {
                push(token.to_uppercase());
            }
        }

        hints
    }
}

impl Default for HintExtractor {
    fn default() -> Self {
        Self::new()
    }
}
