//! Catalog retrieval from the two upstream market sources.
//!
//! The primary source is the paginated Gamma public-search endpoint; the
//! secondary is the unpaginated CLOB markets listing, used only as a
//! fallback. Fetch failures here are soft: a page that cannot be retrieved
//! becomes an empty page and the scan continues.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::types::{MarketSnapshot, RawClobMarket, RawGammaMarket};
use crate::config::Config;

/// Escalating per-attempt request timeouts, in seconds.
const FETCH_TIMEOUTS_SECS: [u64; 3] = [10, 20, 30];

/// One page of catalog results.
#[derive(Debug, Default)]
pub struct CatalogPage {
    /// Normalized market snapshots from this page.
    pub markets: Vec<MarketSnapshot>,
    /// Whether the source reports more pages.
    pub has_more: bool,
}

/// Gamma public-search response envelope.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<SearchEvent>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct SearchEvent {
    slug: Option<String>,
    #[serde(default)]
    markets: Vec<RawGammaMarket>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default, alias = "hasMore")]
    has_more: bool,
}

/// CLOB markets listing, either wrapped or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BasicListing {
    Wrapped {
        #[serde(default)]
        markets: Vec<RawClobMarket>,
    },
    Bare(Vec<RawClobMarket>),
}

impl BasicListing {
    fn into_markets(self) -> Vec<RawClobMarket> {
        match self {
            BasicListing::Wrapped { markets } => markets,
            BasicListing::Bare(markets) => markets,
        }
    }
}

/// Fetcher over both catalog endpoints.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    http: reqwest::Client,
    gamma_base: String,
    clob_base: String,
    page_size: u32,
    max_pages: u32,
    basic_limit: u32,
}

impl CatalogFetcher {
    /// Create a fetcher from config.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            gamma_base: config.gamma_base().to_string(),
            clob_base: config.clob_base().to_string(),
            page_size: config.catalog_page_size,
            max_pages: config.catalog_max_pages,
            basic_limit: config.catalog_basic_limit,
        }
    }

    /// Create a fetcher against explicit endpoints (used by tests).
    pub fn with_endpoints(gamma_base: impl Into<String>, clob_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            gamma_base: gamma_base.into(),
            clob_base: clob_base.into(),
            page_size: 100,
            max_pages: 50,
            basic_limit: 1000,
        }
    }

    /// Fetch one page of the Gamma public-search catalog.
    ///
    /// Each attempt gets a longer deadline than the last; when every attempt
    /// fails the page is treated as empty with no continuation.
    #[instrument(skip(self), fields(page = page))]
    pub async fn fetch_page(&self, query: &str, page: u32) -> CatalogPage {
        let url = format!("{}/public-search", self.gamma_base);
        let page_str = page.to_string();
        let limit_str = self.page_size.to_string();
        let params = [
            ("q", query),
            ("page", page_str.as_str()),
            ("limit_per_type", limit_str.as_str()),
            ("events_status", "active"),
            ("ascending", "false"),
            ("optimized", "true"),
        ];

        let mut last_error = String::new();
        for timeout_secs in FETCH_TIMEOUTS_SECS {
            let attempt = self
                .http
                .get(&url)
                .query(&params)
                .timeout(Duration::from_secs(timeout_secs))
                .send()
                .await;

            let response = match attempt {
                Ok(r) => r,
                Err(e) => {
                    warn!(timeout_secs, error = %e, "Catalog page attempt failed");
                    last_error = e.to_string();
                    continue;
                }
            };

            if !response.status().is_success() {
                warn!(status = %response.status(), timeout_secs, "Catalog page returned error status");
                last_error = format!("HTTP {}", response.status());
                continue;
            }

            match response.json::<SearchResponse>().await {
                Ok(body) => return Self::flatten_search(body),
                Err(e) => {
                    warn!(error = %e, "Failed to parse catalog page");
                    last_error = e.to_string();
                }
            }
        }

        error!(
            attempts = FETCH_TIMEOUTS_SECS.len(),
            error = %last_error,
            "Catalog page fetch exhausted all attempts"
        );
        CatalogPage::default()
    }

    /// Fetch every page of the primary catalog, bounded by the page ceiling.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, query: &str) -> Vec<MarketSnapshot> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let result = self.fetch_page(query, page).await;
            all.extend(result.markets);
            if !result.has_more || page >= self.max_pages {
                break;
            }
            page += 1;
        }

        info!(count = all.len(), pages = page, "Primary catalog fetched");
        all
    }

    /// Fetch the unpaginated secondary catalog listing.
    #[instrument(skip(self))]
    pub async fn fetch_markets_basic(&self) -> Vec<MarketSnapshot> {
        let url = format!("{}/markets", self.clob_base);

        let response = match self
            .http
            .get(&url)
            .query(&[("limit", self.basic_limit)])
            .timeout(Duration::from_secs(20))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "Secondary catalog fetch failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            error!(status = %response.status(), "Secondary catalog returned error status");
            return Vec::new();
        }

        match response.json::<BasicListing>().await {
            Ok(listing) => {
                let markets: Vec<MarketSnapshot> = listing
                    .into_markets()
                    .into_iter()
                    .map(MarketSnapshot::from_clob)
                    .collect();
                debug!(count = markets.len(), "Secondary catalog fetched");
                markets
            }
            Err(e) => {
                error!(error = %e, "Failed to parse secondary catalog");
                Vec::new()
            }
        }
    }

    fn flatten_search(body: SearchResponse) -> CatalogPage {
        let has_more = body.pagination.map(|p| p.has_more).unwrap_or(false);
        let markets = body
            .events
            .into_iter()
            .flat_map(|event| {
                let event_slug = event.slug;
                event
                    .markets
                    .into_iter()
                    .map(move |raw| MarketSnapshot::from_gamma(raw, event_slug.clone()))
            })
            .collect();

        CatalogPage { markets, has_more }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_flattens_events_and_tags_slug() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "events": [
                {
                    "slug": "event-a",
                    "markets": [
                        {"slug": "market-1", "outcomes": ["Yes", "No"]},
                        {"slug": "market-2", "outcomes": ["Yes", "No"]}
                    ]
                },
                {"slug": "event-b", "markets": [{"slug": "market-3"}]}
            ],
            "pagination": {"hasMore": true}
        }))
        .unwrap();

        let page = CatalogFetcher::flatten_search(body);
        assert!(page.has_more);
        assert_eq!(page.markets.len(), 3);
        assert_eq!(page.markets[0].event_slug.as_deref(), Some("event-a"));
        assert_eq!(page.markets[2].event_slug.as_deref(), Some("event-b"));
    }

    #[test]
    fn missing_pagination_means_no_more_pages() {
        let body: SearchResponse =
            serde_json::from_value(serde_json::json!({"events": []})).unwrap();
        let page = CatalogFetcher::flatten_search(body);
        assert!(!page.has_more);
        assert!(page.markets.is_empty());
    }

    #[test]
    fn basic_listing_accepts_both_shapes() {
        let wrapped: BasicListing = serde_json::from_value(serde_json::json!({
            "markets": [{"condition_id": "0xabc"}]
        }))
        .unwrap();
        assert_eq!(wrapped.into_markets().len(), 1);

        let bare: BasicListing =
            serde_json::from_value(serde_json::json!([{"condition_id": "0xdef"}])).unwrap();
        assert_eq!(bare.into_markets().len(), 1);
    }
}
