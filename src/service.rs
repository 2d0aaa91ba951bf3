// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end product identification service
//!
//! The facade owns one fusion engine, one intent classifier and one
//! marketplace aggregator, wired from [`ScoutConfig`]. `find` is the
//! photo-to-listings round trip; `identify` and `search` expose the two
//! halves separately.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScoutConfig;
use crate::error::ScoutError;
use crate::llm::{ChatClient, IntentClassifier, QueryIntent, SecondOpinionExtractor};
use crate::market::{
    BrowseApiProvider, FindingApiProvider, Listing, MarketplaceAggregator, OauthConfig,
    ProviderStep, ScrapedSiteProvider, TokenCache, Trigger, KLEINANZEIGEN, MARKTPLAATS,
};
use crate::vision::{AnalysisReport, HttpVisionAnnotator, SignalFusionEngine, VisionAnnotator};

const LLM_TIMEOUT_MS: u64 = 20_000;

/// Everything learned about one photographed product
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMatch {
    pub signals: crate::vision::SignalBundle,
    pub intent: QueryIntent,
    pub listings: Vec<Listing>,
}

/// Facade over the identification and aggregation pipelines
pub struct ScoutService {
    fusion: SignalFusionEngine,
    intent: IntentClassifier,
    aggregator: MarketplaceAggregator,
}

impl ScoutService {
    /// Wire the full pipeline from configuration
    pub fn from_config(config: &ScoutConfig) -> Self {
        let annotator: Arc<dyn VisionAnnotator> = Arc::new(HttpVisionAnnotator::new(
            &config.vision.endpoint,
            config.vision.api_key.clone(),
            config.vision.request_timeout_ms,
        ));

        let chat = |purpose: &str| -> Option<ChatClient> {
            let endpoint = config.llm.endpoint.as_deref().filter(|e| !e.is_empty())?;
            info!(purpose, model = %config.llm.model, "model pass enabled");
            Some(ChatClient::new(
                endpoint,
                config.llm.api_key.clone(),
                &config.llm.model,
                LLM_TIMEOUT_MS,
            ))
        };

        let second_opinion = chat("second-opinion").map(SecondOpinionExtractor::new);
        let fusion = SignalFusionEngine::new(annotator, second_opinion);
        let intent = IntentClassifier::new(chat("query-intent"));

        let tokens = Arc::new(TokenCache::new(OauthConfig {
            token_url: config.market.token_url.clone(),
            client_id: config.market.client_id.clone(),
            client_secret: config.market.client_secret.clone(),
            scope: config.market.oauth_scope.clone(),
        }));

        let steps = vec![
            ProviderStep::new(
                Arc::new(BrowseApiProvider::new(
                    &config.market.browse_endpoint,
                    &config.market.marketplace_id,
                    tokens,
                )),
                Trigger::Always,
            ),
            ProviderStep::new(
                Arc::new(FindingApiProvider::new(
                    &config.market.finding_endpoint,
                    config.market.finding_app_id.clone(),
                    config.market.regions.clone(),
                )),
                Trigger::IfFewerThan(config.market.fallback_min_results),
            ),
            ProviderStep::new(
                Arc::new(ScrapedSiteProvider::new(&KLEINANZEIGEN)),
                Trigger::Always,
            ),
            ProviderStep::new(
                Arc::new(ScrapedSiteProvider::new(&MARKTPLAATS)),
                Trigger::Always,
            ),
        ];

        let aggregator = MarketplaceAggregator::new(steps)
            .with_provider_timeout(std::time::Duration::from_millis(
                config.market.provider_timeout_ms,
            ))
            .with_result_limit(config.market.result_limit);

        Self::new(fusion, intent, aggregator)
    }

    /// Assemble from pre-built parts
    pub fn new(
        fusion: SignalFusionEngine,
        intent: IntentClassifier,
        aggregator: MarketplaceAggregator,
    ) -> Self {
        Self {
            fusion,
            intent,
            aggregator,
        }
    }

    /// Identify the product in a photo
    pub async fn identify(&self, image: &[u8]) -> Result<AnalysisReport, ScoutError> {
        Ok(self.fusion.analyze(image).await?)
    }

    /// Aggregate marketplace listings for a free-text query
    pub async fn search(&self, query: &str) -> Result<Vec<Listing>, ScoutError> {
        Ok(self.aggregator.search(query).await?)
    }

    /// Photo in, listings out: identify, derive a query, aggregate.
    ///
    /// A signal bundle too thin to yield a query is not an error; the
    /// caller gets the signals with an empty listing set.
    pub async fn find(&self, image: &[u8]) -> Result<ProductMatch, ScoutError> {
        let report = self.identify(image).await?;
        let intent = self.intent.classify(&report.bundle).await;

        let listings = if intent.query.is_empty() {
            warn!("no usable search query derived from image signals");
            Vec::new()
        } else {
            self.search(&intent.query).await?
        };

        info!(
            query = %intent.query,
            listings = listings.len(),
            "product match complete"
        );

        Ok(ProductMatch {
            signals: report.bundle,
            intent,
            listings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultClass;

    #[test]
    fn test_wires_from_default_config() {
        let config = ScoutConfig::default();
        let _service = ScoutService::from_config(&config);
    }

    #[tokio::test]
    async fn test_blank_query_is_caller_fault() {
        let service = ScoutService::from_config(&ScoutConfig::default());
        let err = service.search("  ").await.unwrap_err();
        assert_eq!(err.fault_class(), FaultClass::CallerFault);
    }

    #[tokio::test]
    async fn test_empty_image_is_caller_fault() {
        let service = ScoutService::from_config(&ScoutConfig::default());
        let err = service.identify(&[]).await.unwrap_err();
        assert_eq!(err.fault_class(), FaultClass::CallerFault);
    }
}
