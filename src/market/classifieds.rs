// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scraped classifieds-site providers
//!
//! Two European classifieds sites have no public search API, so their
//! result pages are fetched with a browser User-Agent and parsed with
//! CSS selectors. Selector lists are tried in priority order per field,
//! letting a site redesign degrade to the next known markup instead of
//! breaking outright. Scraping is strictly best-effort: any fetch or
//! parse failure yields an empty result set, never an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::provider::ListingProvider;
use super::types::{parse_price_text, Listing, MarketError};

/// Cards parsed per result page; scraped sources stay a minority signal
pub const MAX_CARDS: usize = 12;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Static description of one scraped site's markup
pub struct SiteProfile {
    /// Source tag stamped on produced listings
    pub name: &'static str,
    /// Scheme + host; relative card links are resolved against this
    pub origin: &'static str,
    /// Search path with `{query}` as the URL-encoded keyword slot
    pub search_path: &'static str,
    /// Result-card selectors, most specific first
    pub card_selectors: &'static [&'static str],
    pub title_selectors: &'static [&'static str],
    pub price_selectors: &'static [&'static str],
    pub link_selectors: &'static [&'static str],
}

impl SiteProfile {
    fn search_url(&self, query: &str) -> Option<Url> {
        let encoded: String = query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect();
        let path = self.search_path.replace("{query}", &encoded);
        Url::parse(self.origin).ok()?.join(&path).ok()
    }
}

/// German classifieds
pub const KLEINANZEIGEN: SiteProfile = SiteProfile {
    name: "kleinanzeigen.de",
    origin: "https://www.kleinanzeigen.de",
    search_path: "/s-{query}/k0",
    card_selectors: &["article.aditem", ".aditem"],
    title_selectors: &[".aditem-main h2 a", ".text-module-begin a", "h2 a"],
    price_selectors: &[
        ".aditem-main--middle--price-shipping--price",
        ".aditem-main--middle--price",
    ],
    link_selectors: &[".aditem-main h2 a", "a[href]"],
};

/// Dutch classifieds
pub const MARKTPLAATS: SiteProfile = SiteProfile {
    name: "marktplaats.nl",
    origin: "https://www.marktplaats.nl",
    search_path: "/q/{query}/",
    card_selectors: &["li.hz-Listing", ".hz-Listing--list-item"],
    title_selectors: &["h3.hz-Listing-title", ".hz-Listing-title"],
    price_selectors: &["span.hz-Listing-price", ".hz-Listing-price"],
    link_selectors: &["a.hz-Listing-coverLink", "a[href]"],
};

/// Best-effort provider scraping one classifieds site
pub struct ScrapedSiteProvider {
    client: Client,
    profile: &'static SiteProfile,
}

impl ScrapedSiteProvider {
    pub fn new(profile: &'static SiteProfile) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(8))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, profile }
    }
}

#[async_trait]
impl ListingProvider for ScrapedSiteProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Listing>, MarketError> {
        let url = match self.profile.search_url(query) {
            Some(url) => url,
            None => {
                warn!(site = self.profile.name, "could not build search URL");
                return Ok(Vec::new());
            }
        };

        // scraper::Html is not Send, so the body is fetched first and
        // parsed synchronously with no await in between
        let body = match self.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(site = self.profile.name, "scrape fetch failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let listings = parse_listings(&body, self.profile, limit.min(MAX_CARDS));
        debug!(
            site = self.profile.name,
            count = listings.len(),
            "scraped result cards"
        );
        Ok(listings)
    }

    fn name(&self) -> &'static str {
        self.profile.name
    }
}

impl ScrapedSiteProvider {
    async fn fetch(&self, url: Url) -> Result<String, MarketError> {
        let response = self
            .client
            .get(url)
            .header("Accept-Language", "de-DE,de;q=0.9,nl;q=0.8,en;q=0.7")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketError::Timeout { timeout_ms: 8_000 }
                } else {
                    MarketError::ApiError {
                        status: 0,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::ApiError {
                status: status.as_u16(),
                message: "non-success result page".to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))
    }
}

/// Parse up to `limit` result cards from a result page.
///
/// Synchronous on purpose; see the Send note in [`ScrapedSiteProvider`].
pub fn parse_listings(html: &str, profile: &SiteProfile, limit: usize) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let origin = match Url::parse(profile.origin) {
        Ok(origin) => origin,
        Err(_) => return Vec::new(),
    };

    let mut listings = Vec::new();
    for selector_str in profile.card_selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let cards: Vec<ElementRef> = document.select(&selector).take(limit).collect();
        if cards.is_empty() {
            continue;
        }

        for card in cards {
            let title = match first_text(&card, profile.title_selectors) {
                Some(title) => title,
                None => continue,
            };
            let price_text = first_text(&card, profile.price_selectors);
            let price = price_text.as_deref().and_then(parse_price_text);
            let url = first_href(&card, profile.link_selectors)
                .and_then(|href| origin.join(&href).ok())
                .map(|u| u.to_string());

            if let Some(listing) = Listing::normalized(
                &title,
                profile.name,
                price,
                price_text.as_deref(),
                url.as_deref(),
            ) {
                listings.push(listing);
            }
        }
        // First selector generation that matched wins
        break;
    }

    listings
}

/// Inner text of the first element matching any selector, in order
fn first_text(card: &ElementRef, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(element) = card.select(&selector).next() {
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn first_href(card: &ElementRef, selectors: &[&str]) -> Option<String> {
    for selector_str in selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if let Some(href) = card
            .select(&selector)
            .find_map(|e| e.value().attr("href"))
        {
            return Some(href.to_string());
        }
    }
    None
}
