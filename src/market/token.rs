// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide OAuth bearer token cache
//!
//! One slot, overwritten on each refresh. A concurrent double refresh is
//! acceptable, both tokens are valid and the last write wins, so no
//! locking beyond the slot's RwLock is needed. Unconfigured credentials
//! yield "no token available", which callers treat as "provider
//! unavailable", never as a request failure.

use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::types::MarketError;

/// Tokens are considered stale this many seconds before actual expiry
pub const EXPIRY_MARGIN_SECS: u64 = 60;

/// Assumed token lifetime when the backend omits one
pub const DEFAULT_LIFETIME_SECS: u64 = 7200;

/// OAuth client-credentials configuration for the structured API
#[derive(Debug, Clone)]
pub struct OauthConfig {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: String,
}

impl OauthConfig {
    pub fn is_configured(&self) -> bool {
        matches!(
            (&self.client_id, &self.client_secret),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Single-slot, time-bounded cache of one bearer token
pub struct TokenCache {
    config: OauthConfig,
    client: Client,
    slot: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(config: OauthConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            slot: RwLock::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Return a valid bearer token, refreshing when needed.
    ///
    /// `Ok(None)` means credentials are not configured; callers treat
    /// this as "provider unavailable".
    pub async fn get_token(&self) -> Result<Option<String>, MarketError> {
        if let Some(token) = self.token_if_fresh(now_epoch()) {
            return Ok(Some(token));
        }

        let (id, secret) = match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => {
                debug!("structured API credentials not configured, no token available");
                return Ok(None);
            }
        };

        let response = self
            .client
            .post(&self.config.token_url)
            .basic_auth(id, Some(secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.config.scope.as_str()),
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

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        let lifetime = token.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
        let expires_at = now_epoch() + lifetime;
        info!(lifetime_secs = lifetime, "marketplace access token refreshed");

        self.store(token.access_token.clone(), expires_at);
        Ok(Some(token.access_token))
    }

    /// The cached token, if still fresh at `now`
    fn token_if_fresh(&self, now: u64) -> Option<String> {
        let slot = self.slot.read().ok()?;
        let cached = slot.as_ref()?;
        if is_fresh(cached.expires_at, now) {
            Some(cached.token.clone())
        } else {
            None
        }
    }

    /// Overwrite the slot; last write wins under concurrent refresh
    fn store(&self, token: String, expires_at: u64) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(CachedToken { token, expires_at });
        }
    }
}

/// Valid iff `now < expires_at - EXPIRY_MARGIN_SECS`
fn is_fresh(expires_at: u64, now: u64) -> bool {
    now < expires_at.saturating_sub(EXPIRY_MARGIN_SECS)
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
