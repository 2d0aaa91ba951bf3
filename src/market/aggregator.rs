// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Marketplace aggregation across API and scraped providers
//!
//! Runs an ordered provider plan: each step's trigger is evaluated
//! against the listings collected so far, unavailable providers are
//! skipped, failures and per-provider timeouts are logged and absorbed.
//! A search only fails on an unusable query; an empty listing set is a
//! valid answer.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::provider::ProviderStep;
use super::types::{Listing, MarketError};

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 9_000;
pub const DEFAULT_RESULT_LIMIT: usize = 20;

/// Fans a query out across providers and merges their listings
pub struct MarketplaceAggregator {
    steps: Vec<ProviderStep>,
    provider_timeout: Duration,
    result_limit: usize,
}

impl MarketplaceAggregator {
    pub fn new(steps: Vec<ProviderStep>) -> Self {
        Self {
            steps,
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit;
        self
    }

    /// Run the provider plan for `query` and return deduplicated
    /// listings in collection order.
    pub async fn search(&self, query: &str) -> Result<Vec<Listing>, MarketError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MarketError::InvalidQuery {
                reason: "query is empty".to_string(),
            });
        }

        let mut collected: Vec<Listing> = Vec::new();
        for step in &self.steps {
            let name = step.provider.name();

            if !step.trigger.should_run(collected.len()) {
                debug!(provider = name, collected = collected.len(), "step skipped by trigger");
                continue;
            }
            if !step.provider.is_available() {
                debug!(provider = name, "provider unavailable, skipping");
                continue;
            }

            let outcome = tokio::time::timeout(
                self.provider_timeout,
                step.provider.search(query, self.result_limit),
            )
            .await;

            match outcome {
                Ok(Ok(listings)) => {
                    debug!(provider = name, count = listings.len(), "provider returned");
                    collected.extend(listings);
                }
                Ok(Err(e)) => warn!(provider = name, "provider failed: {}", e),
                Err(_) => warn!(
                    provider = name,
                    timeout_ms = self.provider_timeout.as_millis() as u64,
                    "provider timed out"
                ),
            }
        }

        let total = collected.len();
        let listings = dedup_listings(collected);
        info!(
            query,
            collected = total,
            unique = listings.len(),
            "marketplace search complete"
        );
        Ok(listings)
    }
}

/// Drop duplicates by [`Listing::dedup_key`], keeping the first
/// occurrence so provider-plan order decides which copy survives
pub fn dedup_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = std::collections::HashSet::new();
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.dedup_key()))
        .collect()
}
