// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Canonical listing shape and field normalizers
//!
//! Every marketplace backend is normalized into [`Listing`] by its
//! producing adapter. Normalization rules live here so all adapters
//! share them: whitespace-collapsed non-empty titles, 3-letter
//! uppercase currency codes defaulting to EUR, absolute http(s) URLs
//! or none at all.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A marketplace search result normalized to a common shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Non-empty, whitespace-normalized
    pub title: String,
    /// Human-readable provider+region tag, e.g. "EBAY_DE" or a site name
    pub source: String,
    /// Non-negative; absent when the backend reports no price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// 3-letter uppercase code
    pub currency: String,
    /// Absolute http(s) URL or none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Listing {
    /// Build a listing with all normalization rules applied.
    ///
    /// Returns `None` when the title is empty after normalization;
    /// such listings are dropped by the producing adapter.
    pub fn normalized(
        title: &str,
        source: &str,
        price: Option<f64>,
        currency: Option<&str>,
        url: Option<&str>,
    ) -> Option<Self> {
        Some(Self {
            title: normalize_title(title)?,
            source: source.to_string(),
            price: price.filter(|p| p.is_finite() && *p >= 0.0),
            currency: normalize_currency(currency),
            url: normalize_url(url),
        })
    }

    /// Deduplication key: title + price + source, with a missing price
    /// contributing the empty string. Deliberately excludes `url`.
    pub fn dedup_key(&self) -> String {
        let price = self.price.map(|p| p.to_string()).unwrap_or_default();
        format!("{}{}{}", self.title, price, self.source)
    }
}

/// Errors from marketplace providers. The aggregator absorbs all of
/// these as "provider unavailable"; none of them fail a search.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("marketplace request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("marketplace API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("no credentials configured for {provider}")]
    NoCredentials { provider: String },

    #[error("marketplace response parse error: {0}")]
    Parse(String),

    #[error("all regions failed for {provider}")]
    AllRegionsFailed { provider: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },
}

/// Collapse runs of whitespace; `None` when nothing remains
pub fn normalize_title(raw: &str) -> Option<String> {
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Normalize a currency tag to a 3-letter uppercase code.
///
/// The "€" glyph maps to "EUR"; missing or unusable values default to
/// "EUR" as well.
pub fn normalize_currency(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return "EUR".to_string();
    }
    if raw.contains('€') {
        return "EUR".to_string();
    }
    match raw {
        "$" => return "USD".to_string(),
        "£" => return "GBP".to_string(),
        _ => {}
    }
    let code = raw.to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        code
    } else {
        "EUR".to_string()
    }
}

/// Keep only absolute http(s) URLs; anything else becomes `None`
pub fn normalize_url(raw: Option<&str>) -> Option<String> {
    let parsed = Url::parse(raw?.trim()).ok()?;
    if matches!(parsed.scheme(), "http" | "https") {
        Some(parsed.to_string())
    } else {
        None
    }
}

/// Parse scraped price text into a number.
///
/// Strips currency symbols, spaces and trailing qualifiers, removes
/// thousands separators and converts a decimal comma to a decimal
/// point. Returns `None` when no usable number remains.
pub fn parse_price_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // "1.299,00": dot thousands, comma decimal
        (Some(comma), Some(dot)) if comma > dot => {
            cleaned.replace('.', "").replace(',', ".")
        }
        // "1,299.00": comma thousands, dot decimal
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        // "24,99": decimal comma
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|p| *p >= 0.0)
}
