//! Cascading token-id resolution for the NO outcome of a market.
//!
//! The catalogs do not always embed venue token ids, so ordering a market
//! needs a separate lookup. Strategies run in a fixed order and each network
//! strategy swallows its own failures so the next one can try; exhausting
//! every strategy is an expected outcome, not an error.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};

use super::types::{MarketSnapshot, RawToken};
use crate::config::Config;

/// Market record returned by the resolution endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResolvedMarket {
    tokens: Vec<RawToken>,
}

/// Event body with nested markets.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventBody {
    markets: Vec<ResolvedMarket>,
}

/// Market endpoints answer with either one record or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarketBody {
    Many(Vec<ResolvedMarket>),
    One(ResolvedMarket),
}

impl MarketBody {
    fn into_markets(self) -> Vec<ResolvedMarket> {
        match self {
            MarketBody::Many(markets) => markets,
            MarketBody::One(market) => vec![market],
        }
    }
}

/// Resolver for the venue token id of a market's NO outcome.
#[derive(Debug, Clone)]
pub struct TokenResolver {
    http: reqwest::Client,
    gamma_base: String,
}

impl TokenResolver {
    /// Create a resolver from config.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            gamma_base: config.gamma_base().to_string(),
        }
    }

    /// Create a resolver against an explicit endpoint (used by tests).
    pub fn with_endpoint(gamma_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            gamma_base: gamma_base.into(),
        }
    }

    /// NO token id embedded directly in a snapshot, if any. Pure lookup,
    /// never touches the network.
    pub fn embedded_no_token(snapshot: &MarketSnapshot) -> Option<String> {
        snapshot
            .outcomes
            .iter()
            .find(|o| o.is_no())
            .and_then(|o| o.token_id.clone())
    }

    /// Resolve the NO token id for a snapshot, embedded lookup first.
    #[instrument(skip(self, snapshot), fields(market = snapshot.market_id().unwrap_or("?")))]
    pub async fn resolve(&self, snapshot: &MarketSnapshot) -> Option<String> {
        if let Some(token_id) = Self::embedded_no_token(snapshot) {
            debug!("Token id embedded in snapshot");
            return Some(token_id);
        }

        self.resolve_by_keys(
            snapshot.event_slug.as_deref(),
            snapshot.slug.as_deref(),
            snapshot.condition_id.as_deref(),
        )
        .await
    }

    /// Resolve from whatever identifiers survived into an opportunity:
    /// event slug, then market slug, then condition id.
    pub async fn resolve_by_keys(
        &self,
        event_slug: Option<&str>,
        slug: Option<&str>,
        condition_id: Option<&str>,
    ) -> Option<String> {
        if let Some(event_slug) = event_slug {
            if let Some(token_id) = self.lookup_by_event_slug(event_slug).await {
                return Some(token_id);
            }
        }

        if let Some(slug) = slug {
            if let Some(token_id) = self.lookup_by_market_slug(slug).await {
                return Some(token_id);
            }
        }

        if let Some(condition_id) = condition_id {
            if let Some(token_id) = self.lookup_by_condition_id(condition_id).await {
                return Some(token_id);
            }
        }

        None
    }

    async fn lookup_by_event_slug(&self, event_slug: &str) -> Option<String> {
        let url = format!("{}/events/slug/{}", self.gamma_base, event_slug);
        let body: EventBody = self.get_json(&url).await?;
        body.markets
            .iter()
            .find_map(|market| no_token_id(&market.tokens))
    }

    async fn lookup_by_market_slug(&self, slug: &str) -> Option<String> {
        let url = format!("{}/markets/slug/{}", self.gamma_base, slug);
        let body: MarketBody = self.get_json(&url).await?;
        body.into_markets()
            .iter()
            .find_map(|market| no_token_id(&market.tokens))
    }

    async fn lookup_by_condition_id(&self, condition_id: &str) -> Option<String> {
        let url = format!("{}/markets", self.gamma_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("condition_id", condition_id),
                ("closed", "false"),
                ("limit", "5"),
            ])
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Condition-id lookup failed");
            return None;
        }

        let body: MarketBody = response.json().await.ok()?;
        body.into_markets()
            .iter()
            .find_map(|market| no_token_id(&market.tokens))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!(url, status = %response.status(), "Resolution lookup failed");
            return None;
        }

        response.json().await.ok()
    }
}

/// Pick the NO token id from a token array.
fn no_token_id(tokens: &[RawToken]) -> Option<String> {
    tokens
        .iter()
        .find(|t| t.is_no())
        .and_then(|t| t.any_id().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::{CatalogSource, OutcomeQuote, RawClobMarket};
    use smallvec::smallvec;

    #[test]
    fn embedded_token_short_circuits_without_network() {
        let snapshot = MarketSnapshot {
            id: None,
            condition_id: Some("0xabc".to_string()),
            slug: None,
            event_slug: None,
            question: None,
            active: None,
            closed: None,
            archived: None,
            accepting_orders: None,
            end_date: None,
            outcomes: smallvec![
                OutcomeQuote {
                    name: "Yes".to_string(),
                    token_id: Some("111".to_string()),
                    ..OutcomeQuote::default()
                },
                OutcomeQuote {
                    name: "No".to_string(),
                    token_id: Some("222".to_string()),
                    ..OutcomeQuote::default()
                },
            ],
            outcome_prices: Vec::new(),
            volume_24h: rust_decimal::Decimal::ZERO,
            source: CatalogSource::Clob,
        };

        // Pure lookup: no resolver instance, no network involved.
        assert_eq!(
            TokenResolver::embedded_no_token(&snapshot),
            Some("222".to_string())
        );
    }

    #[test]
    fn embedded_lookup_ignores_yes_token() {
        let raw: RawClobMarket = serde_json::from_value(serde_json::json!({
            "tokens": [{"token_id": "111", "outcome": "Yes", "price": 0.99}]
        }))
        .unwrap();
        let snapshot = MarketSnapshot::from_clob(raw);
        assert_eq!(TokenResolver::embedded_no_token(&snapshot), None);
    }

    #[test]
    fn no_token_id_accepts_alias_spellings() {
        let tokens: Vec<RawToken> = serde_json::from_value(serde_json::json!([
            {"outcome": "Yes", "tokenId": "111"},
            {"outcome": "NO", "asset_id": "222"}
        ]))
        .unwrap();
        assert_eq!(no_token_id(&tokens), Some("222".to_string()));

        let bare_id: Vec<RawToken> =
            serde_json::from_value(serde_json::json!([{"outcome": "no", "id": 333}])).unwrap();
        assert_eq!(no_token_id(&bare_id), Some("333".to_string()));
    }

    #[test]
    fn market_body_accepts_single_record_and_list() {
        let one: MarketBody = serde_json::from_value(serde_json::json!({
            "tokens": [{"outcome": "No", "token_id": "1"}]
        }))
        .unwrap();
        assert_eq!(one.into_markets().len(), 1);

        let many: MarketBody = serde_json::from_value(serde_json::json!([
            {"tokens": []},
            {"tokens": [{"outcome": "No", "token_id": "2"}]}
        ]))
        .unwrap();
        assert_eq!(many.into_markets().len(), 2);
    }
}
