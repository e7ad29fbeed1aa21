//! Opportunity aggregation across both catalogs.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use super::opportunity::Opportunity;
use crate::config::Config;
use crate::market::{derive_no_price, is_tradable, CatalogFetcher, MarketSnapshot, TokenResolver};
use crate::metrics;

/// Default search query: everything.
const SEARCH_ALL: &str = "*";

/// Runs the discovery pipeline: fetch, filter, derive, resolve.
#[derive(Debug, Clone)]
pub struct OpportunityAggregator {
    fetcher: CatalogFetcher,
    resolver: TokenResolver,
}

impl OpportunityAggregator {
    /// Create an aggregator from config.
    pub fn new(config: &Config) -> Self {
        Self {
            fetcher: CatalogFetcher::new(config),
            resolver: TokenResolver::new(config),
        }
    }

    /// Create an aggregator from explicit parts (used by tests).
    pub fn with_parts(fetcher: CatalogFetcher, resolver: TokenResolver) -> Self {
        Self { fetcher, resolver }
    }

    /// Find markets whose NO price is positive and at most the threshold.
    ///
    /// The primary catalog is tried first; the secondary listing is consulted
    /// only when the primary pass produces zero opportunities, whether from
    /// an empty fetch or from filtering everything out. Token resolution is
    /// best-effort: an unresolved opportunity stays in the list for alerting.
    #[instrument(skip(self), fields(threshold = %threshold))]
    pub async fn find_eligible_markets(&self, threshold: Decimal) -> Vec<Opportunity> {
        let markets = self.fetcher.fetch_all(SEARCH_ALL).await;
        let eligible = self.collect_eligible(&markets, threshold, true).await;

        if !eligible.is_empty() {
            info!(count = eligible.len(), "Eligible markets from primary catalog");
            metrics::inc_opportunities_found(eligible.len() as u64);
            return eligible;
        }

        debug!("Primary catalog yielded no opportunities, trying fallback");
        let fallback = self.fetcher.fetch_markets_basic().await;
        let eligible = self.collect_eligible(&fallback, threshold, false).await;

        if eligible.is_empty() {
            info!("No eligible markets found");
        } else {
            info!(count = eligible.len(), "Eligible markets from fallback catalog");
            metrics::inc_opportunities_found(eligible.len() as u64);
        }
        eligible
    }

    async fn collect_eligible(
        &self,
        markets: &[MarketSnapshot],
        threshold: Decimal,
        resolve_over_network: bool,
    ) -> Vec<Opportunity> {
        let now = Utc::now();
        let mut eligible = Vec::new();

        for market in markets {
            if !is_tradable(market, now) {
                continue;
            }

            let Some(price) = derive_no_price(market) else {
                continue;
            };
            if price <= Decimal::ZERO || price > threshold {
                continue;
            }

            let mut opportunity = Opportunity::from_snapshot(market, price);
            opportunity.token_id = if resolve_over_network {
                self.resolver.resolve(market).await
            } else {
                // Fallback records either embed their token ids or get
                // resolved later on the order path.
                TokenResolver::embedded_no_token(market)
            };
            eligible.push(opportunity);
        }

        eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{RawClobMarket, RawGammaMarket};
    use rust_decimal_macros::dec;

    fn aggregator() -> OpportunityAggregator {
        // Dead endpoints: these tests only exercise the local pipeline.
        OpportunityAggregator::with_parts(
            CatalogFetcher::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9"),
            TokenResolver::with_endpoint("http://127.0.0.1:9"),
        )
    }

    fn gamma_snapshot(best_bid: &str, best_ask: &str) -> MarketSnapshot {
        let raw: RawGammaMarket = serde_json::from_value(serde_json::json!({
            "id": "1",
            "question": "X",
            "active": true,
            "bestBid": best_bid,
            "bestAsk": best_ask,
            "outcomes": ["Yes", "No"],
        }))
        .unwrap();
        MarketSnapshot::from_gamma(raw, None)
    }

    #[tokio::test]
    async fn threshold_bounds_are_strict() {
        let aggregator = aggregator();
        // NO price = 1 - 0.995 = 0.005
        let in_range = gamma_snapshot("0.97", "0.995");
        // NO price = 1 - 0.98 = 0.02, above threshold
        let above = gamma_snapshot("0.95", "0.98");
        // NO price = 1 - 1.0 = 0, not strictly positive
        let zero = gamma_snapshot("0.99", "1.0");

        let eligible = aggregator
            .collect_eligible(&[in_range, above, zero], dec!(0.01), false)
            .await;

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].no_price, dec!(0.005));
        assert!(eligible[0].no_price > dec!(0) && eligible[0].no_price <= dec!(0.01));
    }

    #[tokio::test]
    async fn untradable_markets_are_skipped() {
        let aggregator = aggregator();
        let mut closed = gamma_snapshot("0.97", "0.995");
        closed.closed = Some(true);

        let eligible = aggregator
            .collect_eligible(&[closed], dec!(0.01), false)
            .await;
        assert!(eligible.is_empty());
    }

    #[tokio::test]
    async fn embedded_tokens_survive_into_opportunities() {
        let aggregator = aggregator();
        let raw: RawClobMarket = serde_json::from_value(serde_json::json!({
            "condition_id": "0xabc",
            "question": "Y",
            "tokens": [
                {"token_id": "111", "outcome": "Yes", "price": 0.99},
                {"token_id": "222", "outcome": "No", "price": 0.006}
            ]
        }))
        .unwrap();
        let snapshot = MarketSnapshot::from_clob(raw);

        let eligible = aggregator
            .collect_eligible(&[snapshot], dec!(0.01), false)
            .await;

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].token_id.as_deref(), Some("222"));
        assert_eq!(eligible[0].no_price, dec!(0.006));
    }
}
