// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Legacy marketplace API provider (eBay Finding)
//!
//! Fallback behind the Browse provider: a keyword search tried across
//! three region identifiers in strict priority order. The first region
//! answering with a parseable 200 wins, even when it returns few
//! results; lower-priority regions are not consulted after a success.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::provider::ListingProvider;
use super::types::{Listing, MarketError};

/// Region identifiers in strict priority order, most-preferred first
pub const DEFAULT_REGIONS: [&str; 3] = ["EBAY-DE", "EBAY-GB", "EBAY-US"];

/// eBay Finding API provider with a regional fallback chain
pub struct FindingApiProvider {
    client: Client,
    endpoint: String,
    app_id: Option<String>,
    regions: Vec<String>,
}

impl FindingApiProvider {
    /// # Arguments
    /// * `endpoint` - Finding service URL
    /// * `app_id` - Application key, `None` when unconfigured
    /// * `regions` - Region chain, most-preferred first
    pub fn new(endpoint: &str, app_id: Option<String>, regions: Vec<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            app_id,
            regions,
        }
    }

    async fn search_region(
        &self,
        query: &str,
        region: &str,
        limit: usize,
        app_id: &str,
    ) -> Result<Vec<Listing>, MarketError> {
        let entries = limit.min(50).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("OPERATION-NAME", "findItemsByKeywords"),
                ("SERVICE-VERSION", "1.13.0"),
                ("SECURITY-APPNAME", app_id),
                ("RESPONSE-DATA-FORMAT", "JSON"),
                ("GLOBAL-ID", region),
                ("keywords", query),
                ("paginationInput.entriesPerPage", entries.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketError::Timeout { timeout_ms: 10_000 }
                } else {
                    MarketError::ApiError {
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: FindingEnvelope = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        Ok(map_envelope(envelope, region))
    }
}

#[async_trait]
impl ListingProvider for FindingApiProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, MarketError> {
        let app_id = match &self.app_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                return Err(MarketError::NoCredentials {
                    provider: "ebay-finding".to_string(),
                })
            }
        };

        first_successful_region("ebay-finding", &self.regions, |region| {
            let app_id = app_id.clone();
            async move { self.search_region(query, &region, limit, &app_id).await }
        })
        .await
    }

    fn name(&self) -> &'static str {
        "ebay-finding"
    }

    fn is_available(&self) -> bool {
        self.app_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Try regions in order, returning the first success.
///
/// A success is any parseable 200, regardless of how few items it
/// carries. Failed regions are logged and the next one is tried; only
/// when every region fails does the chain report failure.
pub async fn first_successful_region<F, Fut>(
    provider: &str,
    regions: &[String],
    fetch: F,
) -> Result<Vec<Listing>, MarketError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Vec<Listing>, MarketError>>,
{
    for region in regions {
        match fetch(region.clone()).await {
            Ok(listings) => return Ok(listings),
            Err(e) => warn!(provider, region = %region, "region failed: {}, trying next", e),
        }
    }
    Err(MarketError::AllRegionsFailed {
        provider: provider.to_string(),
    })
}

// The Finding API wraps everything in single-element arrays and
// stringly-typed values; the envelope structs mirror that shape.

#[derive(Debug, Deserialize)]
struct FindingEnvelope {
    #[serde(rename = "findItemsByKeywordsResponse", default)]
    responses: Vec<FindingResponse>,
}

#[derive(Debug, Deserialize)]
struct FindingResponse {
    #[serde(rename = "searchResult", default)]
    search_results: Vec<FindingSearchResult>,
}

#[derive(Debug, Deserialize)]
struct FindingSearchResult {
    #[serde(rename = "item", default)]
    items: Vec<FindingItem>,
}

#[derive(Debug, Deserialize)]
struct FindingItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "viewItemURL", default)]
    view_item_url: Vec<String>,
    #[serde(rename = "sellingStatus", default)]
    selling_status: Vec<FindingSellingStatus>,
}

#[derive(Debug, Deserialize)]
struct FindingSellingStatus {
    #[serde(rename = "currentPrice", default)]
    current_price: Vec<FindingPrice>,
}

#[derive(Debug, Deserialize)]
struct FindingPrice {
    #[serde(rename = "@currencyId", default)]
    currency_id: Option<String>,
    #[serde(rename = "__value__", default)]
    value: Option<String>,
}

fn map_envelope(envelope: FindingEnvelope, region: &str) -> Vec<Listing> {
    envelope
        .responses
        .into_iter()
        .flat_map(|r| r.search_results)
        .flat_map(|s| s.items)
        .filter_map(|item| {
            let price_entry = item
                .selling_status
                .first()
                .and_then(|s| s.current_price.first());
            let price = price_entry.and_then(|p| p.value.as_deref()?.parse().ok());
            let currency = price_entry.and_then(|p| p.currency_id.as_deref());
            Listing::normalized(
                item.title.first().map(String::as_str).unwrap_or(""),
                region,
                price,
                currency,
                item.view_item_url.first().map(String::as_str),
            )
        })
        .collect()
}
