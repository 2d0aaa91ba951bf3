// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Marketplace listing aggregation
//!
//! Providers normalize their backends into a shared [`Listing`] shape;
//! the [`MarketplaceAggregator`] runs them as an ordered plan with
//! triggers, timeouts and deduplication.

pub mod aggregator;
pub mod browse;
pub mod classifieds;
pub mod finding;
pub mod provider;
pub mod token;
pub mod types;

pub use aggregator::{dedup_listings, MarketplaceAggregator};
pub use browse::BrowseApiProvider;
pub use classifieds::{ScrapedSiteProvider, SiteProfile, KLEINANZEIGEN, MARKTPLAATS};
pub use finding::FindingApiProvider;
pub use provider::{ListingProvider, ProviderStep, Trigger};
pub use token::{OauthConfig, TokenCache};
pub use types::{Listing, MarketError};
