// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the product identification pipeline

use std::env;

use crate::market::finding::DEFAULT_REGIONS;

/// Top-level configuration, one section per subsystem
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub vision: VisionConfig,
    pub llm: LlmConfig,
    pub market: MarketConfig,
}

/// Vision annotation backend configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Annotation endpoint
    pub endpoint: String,
    /// API key; identification is unavailable without one
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Vision-language model configuration for the second opinion and
/// query-intent passes. Both degrade gracefully when unconfigured.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions base URL
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Model identifier passed through to the backend
    pub model: String,
}

/// Marketplace aggregation configuration
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Structured API base URL
    pub browse_endpoint: String,
    /// Regional marketplace for the structured API
    pub marketplace_id: String,
    /// OAuth token endpoint for the structured API
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub oauth_scope: String,
    /// Legacy keyword-search API endpoint
    pub finding_endpoint: String,
    /// Legacy API application key
    pub finding_app_id: Option<String>,
    /// Legacy API region chain, most-preferred first
    pub regions: Vec<String>,
    /// Per-provider wall-clock budget in milliseconds
    pub provider_timeout_ms: u64,
    /// The legacy fallback runs while fewer than this many listings
    /// were collected
    pub fallback_min_results: usize,
    /// Listings requested from each provider
    pub result_limit: usize,
}

impl ScoutConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            vision: VisionConfig {
                endpoint: env::var("VISION_API_ENDPOINT").unwrap_or_else(|_| {
                    "https://vision.googleapis.com/v1/images:annotate".to_string()
                }),
                api_key: env::var("VISION_API_KEY").ok(),
                request_timeout_ms: env::var("VISION_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            },
            llm: LlmConfig {
                endpoint: env::var("LLM_API_ENDPOINT").ok(),
                api_key: env::var("LLM_API_KEY").ok(),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            },
            market: MarketConfig {
                browse_endpoint: env::var("EBAY_BROWSE_ENDPOINT")
                    .unwrap_or_else(|_| "https://api.ebay.com".to_string()),
                marketplace_id: env::var("EBAY_MARKETPLACE_ID")
                    .unwrap_or_else(|_| "EBAY_DE".to_string()),
                token_url: env::var("EBAY_TOKEN_URL").unwrap_or_else(|_| {
                    "https://api.ebay.com/identity/v1/oauth2/token".to_string()
                }),
                client_id: env::var("EBAY_CLIENT_ID").ok(),
                client_secret: env::var("EBAY_CLIENT_SECRET").ok(),
                oauth_scope: env::var("EBAY_OAUTH_SCOPE")
                    .unwrap_or_else(|_| "https://api.ebay.com/oauth/api_scope".to_string()),
                finding_endpoint: env::var("EBAY_FINDING_ENDPOINT").unwrap_or_else(|_| {
                    "https://svcs.ebay.com/services/search/FindingService/v1".to_string()
                }),
                finding_app_id: env::var("EBAY_APP_ID").ok(),
                regions: env::var("EBAY_FINDING_REGIONS")
                    .map(|v| {
                        v.split(',')
                            .map(|r| r.trim().to_string())
                            .filter(|r| !r.is_empty())
                            .collect()
                    })
                    .unwrap_or_else(|_| default_regions()),
                provider_timeout_ms: env::var("MARKET_PROVIDER_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(9_000),
                fallback_min_results: env::var("MARKET_FALLBACK_MIN_RESULTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(4),
                result_limit: env::var("MARKET_RESULT_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.vision.endpoint.is_empty() {
            return Err("Vision endpoint must not be empty".to_string());
        }
        if self.market.provider_timeout_ms == 0 {
            return Err("Provider timeout must be greater than 0".to_string());
        }
        if self.market.result_limit == 0 {
            return Err("Result limit must be greater than 0".to_string());
        }
        if self.market.regions.is_empty() {
            return Err("At least one legacy API region is required".to_string());
        }
        Ok(())
    }

    /// Whether image identification can run at all
    pub fn has_vision_credentials(&self) -> bool {
        self.vision.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Whether the second-opinion and intent passes can run
    pub fn has_llm(&self) -> bool {
        self.llm.endpoint.as_deref().is_some_and(|e| !e.is_empty())
    }
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            vision: VisionConfig {
                endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
                api_key: None,
                request_timeout_ms: 10_000,
            },
            llm: LlmConfig {
                endpoint: None,
                api_key: None,
                model: "gpt-4o-mini".to_string(),
            },
            market: MarketConfig {
                browse_endpoint: "https://api.ebay.com".to_string(),
                marketplace_id: "EBAY_DE".to_string(),
                token_url: "https://api.ebay.com/identity/v1/oauth2/token".to_string(),
                client_id: None,
                client_secret: None,
                oauth_scope: "https://api.ebay.com/oauth/api_scope".to_string(),
                finding_endpoint: "https://svcs.ebay.com/services/search/FindingService/v1"
                    .to_string(),
                finding_app_id: None,
                regions: default_regions(),
                provider_timeout_ms: 9_000,
                fallback_min_results: 4,
                result_limit: 20,
            },
        }
    }
}

fn default_regions() -> Vec<String> {
    DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScoutConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.has_vision_credentials());
        assert!(!config.has_llm());
        assert_eq!(config.market.marketplace_id, "EBAY_DE");
        assert_eq!(
            config.market.regions,
            vec!["EBAY-DE", "EBAY-GB", "EBAY-US"]
        );
        assert_eq!(config.market.provider_timeout_ms, 9_000);
        assert_eq!(config.market.fallback_min_results, 4);
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut config = ScoutConfig::default();
        config.market.provider_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_regions() {
        let mut config = ScoutConfig::default();
        config.market.regions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_flags() {
        let mut config = ScoutConfig::default();
        config.vision.api_key = Some("key".to_string());
        assert!(config.has_vision_credentials());
        config.vision.api_key = Some(String::new());
        assert!(!config.has_vision_credentials());

        config.llm.endpoint = Some("https://llm.example.com".to_string());
        assert!(config.has_llm());
    }
}
