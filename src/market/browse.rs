// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structured marketplace API provider (eBay Browse)
//!
//! The preferred provider: one fixed regional marketplace queried
//! through the Browse item-summary search, authenticated with a bearer
//! token from the injected [`TokenCache`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::provider::ListingProvider;
use super::token::TokenCache;
use super::types::{Listing, MarketError};

/// eBay Browse API provider for one regional marketplace
pub struct BrowseApiProvider {
    client: Client,
    endpoint: String,
    marketplace_id: String,
    tokens: Arc<TokenCache>,
}

impl BrowseApiProvider {
    /// # Arguments
    /// * `endpoint` - API base URL, e.g. `https://api.ebay.com`
    /// * `marketplace_id` - Regional marketplace, e.g. `EBAY_DE`
    /// * `tokens` - Shared token cache for the client-credentials flow
    pub fn new(endpoint: &str, marketplace_id: &str, tokens: Arc<TokenCache>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            marketplace_id: marketplace_id.to_string(),
            tokens,
        }
    }
}

#[async_trait]
impl ListingProvider for BrowseApiProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, MarketError> {
        let token = match self.tokens.get_token().await? {
            Some(token) => token,
            None => {
                return Err(MarketError::NoCredentials {
                    provider: "ebay-browse".to_string(),
                })
            }
        };

        let limit = limit.min(50).to_string();
        let response = self
            .client
            .get(format!(
                "{}/buy/browse/v1/item_summary/search",
                self.endpoint
            ))
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", &self.marketplace_id)
            .query(&[("q", query), ("limit", limit.as_str())])
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

        let data: BrowseResponse = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        Ok(data
            .item_summaries
            .into_iter()
            .filter_map(|item| {
                let price = item.price.as_ref().and_then(|p| p.value.as_deref()?.parse().ok());
                let currency = item.price.as_ref().and_then(|p| p.currency.as_deref());
                Listing::normalized(
                    &item.title,
                    &self.marketplace_id,
                    price,
                    currency,
                    item.item_web_url.as_deref(),
                )
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "ebay-browse"
    }

    fn is_available(&self) -> bool {
        self.tokens.is_configured()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseResponse {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    price: Option<BrowsePrice>,
    #[serde(default)]
    item_web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowsePrice {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}
