// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Listing provider trait and provider-step descriptors
//!
//! The aggregator drives an ordered list of [`ProviderStep`]s: each step
//! carries a provider and a [`Trigger`] deciding whether the step runs
//! given what earlier steps already collected. Adding a provider or a
//! fallback rule means adding a step, not another branch.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Listing, MarketError};

/// Trait implemented by every marketplace backend adapter
#[async_trait]
pub trait ListingProvider: Send + Sync {
    /// Search the backend and normalize its results into listings.
    ///
    /// Adapters drop listings whose title is empty after normalization.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, MarketError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Whether the provider has what it needs to run (credentials etc.)
    fn is_available(&self) -> bool {
        true
    }
}

/// Decides whether a provider step runs given listings collected so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run unconditionally
    Always,
    /// Run only while earlier steps collected fewer than this many
    /// listings. Covers both "prior provider unavailable" (zero
    /// collected) and "prior provider returned too few"
    IfFewerThan(usize),
}

impl Trigger {
    pub fn should_run(&self, collected_so_far: usize) -> bool {
        match self {
            Trigger::Always => true,
            Trigger::IfFewerThan(n) => collected_so_far < *n,
        }
    }
}

/// One entry in the aggregator's ordered provider plan
pub struct ProviderStep {
    pub provider: Arc<dyn ListingProvider>,
    pub trigger: Trigger,
}

impl ProviderStep {
    pub fn new(provider: Arc<dyn ListingProvider>, trigger: Trigger) -> Self {
        Self { provider, trigger }
    }
}
