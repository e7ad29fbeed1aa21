//! Batch order placement with minimum-size correction.

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::ExchangeError;
use crate::exchange::ExchangeClient;
use crate::market::resolver::TokenResolver;
use crate::metrics;
use crate::scanner::opportunity::Opportunity;
use crate::trading::order::{OrderArgs, OrderOutcome, OrderResult, TimeInForce};

/// Rejection texts look like "Size (5) lower than the minimum: 25".
static MIN_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"minimum:\s*(\d+(?:\.\d+)?)").expect("valid regex"));

/// Conservative exchange minimum used when the market does not advertise one.
pub fn default_min_order_size() -> Decimal {
    Decimal::new(5, 0)
}

/// Extract an exchange-reported minimum size from a rejection message.
pub fn parse_minimum_size(message: &str) -> Option<Decimal> {
    MIN_SIZE_RE
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Places buy orders for discovered opportunities.
pub struct OrderExecutor {
    client: Arc<dyn ExchangeClient>,
    resolver: TokenResolver,
}

impl OrderExecutor {
    /// Create an executor over an exchange client and a token resolver.
    pub fn new(client: Arc<dyn ExchangeClient>, resolver: TokenResolver) -> Self {
        Self { client, resolver }
    }

    /// Place a GTC limit buy per opportunity.
    ///
    /// Best-effort batch: one opportunity's failure never aborts the rest.
    /// Submission price is clamped to the threshold; a rejection carrying an
    /// exchange minimum above the requested size is retried exactly once
    /// with that minimum.
    #[instrument(skip(self, opportunities), fields(count = opportunities.len()))]
    pub async fn place_buy_orders(
        &self,
        opportunities: &[Opportunity],
        size: Decimal,
        price_threshold: Decimal,
    ) -> Vec<OrderResult> {
        let mut results = Vec::with_capacity(opportunities.len());
        for opportunity in opportunities {
            results.push(self.place_one(opportunity, size, price_threshold).await);
        }

        let submitted = results.iter().filter(|r| r.is_submitted()).count();
        info!(
            total = results.len(),
            submitted,
            failed = results.len() - submitted,
            "Order batch complete"
        );
        results
    }

    async fn place_one(
        &self,
        opportunity: &Opportunity,
        size: Decimal,
        price_threshold: Decimal,
    ) -> OrderResult {
        let price = opportunity.no_price.min(price_threshold);

        let Some(token_id) = self.resolve_for_order(opportunity).await else {
            warn!(market = opportunity.display_id(), "No token id, skipping order");
            metrics::inc_orders_failed();
            return error_result(
                opportunity,
                price,
                size,
                "missing token id".to_string(),
                None,
            );
        };

        match self.submit(&token_id, price, size).await {
            Ok(raw) => submitted_result(opportunity, price, size, raw, None),
            Err(e) => {
                let reason = e.to_string();
                let minimum = e.rejection_reason().and_then(parse_minimum_size);

                if let Some(minimum) = minimum.filter(|m| *m > size) {
                    info!(
                        market = opportunity.display_id(),
                        %minimum,
                        "Rejected below exchange minimum, retrying once"
                    );
                    return match self.submit(&token_id, price, minimum).await {
                        Ok(raw) => {
                            submitted_result(opportunity, price, minimum, raw, Some(minimum))
                        }
                        Err(retry_err) => {
                            metrics::inc_orders_failed();
                            error_result(
                                opportunity,
                                price,
                                minimum,
                                format!("retry with minimum {} failed: {}", minimum, retry_err),
                                Some(minimum),
                            )
                        }
                    };
                }

                warn!(market = opportunity.display_id(), error = %reason, "Order rejected");
                metrics::inc_orders_failed();
                error_result(opportunity, price, size, reason, None)
            }
        }
    }

    async fn submit(
        &self,
        token_id: &str,
        price: Decimal,
        size: Decimal,
    ) -> Result<Value, ExchangeError> {
        let args = OrderArgs::buy(token_id, price, size);
        let start = Instant::now();
        let result = self.client.place_limit_order(&args, TimeInForce::GTC).await;
        metrics::record_order_submit_latency(start);
        if result.is_ok() {
            metrics::inc_orders_submitted();
        }
        result
    }

    /// Resolve a token id on the order path: the exchange's own market
    /// record first (condition-id shaped identifiers only), then the
    /// catalog resolution cascade.
    async fn resolve_for_order(&self, opportunity: &Opportunity) -> Option<String> {
        if let Some(token_id) = &opportunity.token_id {
            return Some(token_id.clone());
        }

        let condition = opportunity
            .condition_id
            .as_deref()
            .or(opportunity.market_id.as_deref());

        if let Some(condition) = condition.filter(|c| looks_like_condition_id(c)) {
            if let Ok(record) = self.client.get_market(condition).await {
                if let Some(token_id) = record.no_token_id() {
                    return Some(token_id);
                }
            }
        }

        self.resolver
            .resolve_by_keys(
                opportunity.event_slug.as_deref(),
                opportunity.slug.as_deref(),
                condition,
            )
            .await
    }

    /// Effective submission size: the configured size raised to the
    /// exchange-advertised minimum for this market, defaulting to a
    /// conservative constant when the market does not report one.
    pub async fn effective_order_size(
        &self,
        condition_id: Option<&str>,
        configured: Decimal,
    ) -> Decimal {
        let minimum = match condition_id {
            Some(condition) => self
                .client
                .get_market(condition)
                .await
                .ok()
                .and_then(|record| record.min_order_size)
                .filter(|m| *m > Decimal::ZERO)
                .unwrap_or_else(default_min_order_size),
            None => default_min_order_size(),
        };

        configured.max(minimum)
    }
}

fn looks_like_condition_id(value: &str) -> bool {
    value.starts_with("0x") && (value.len() == 64 || value.len() == 66)
}

fn submitted_result(
    opportunity: &Opportunity,
    price: Decimal,
    size: Decimal,
    raw: Value,
    retried_with_minimum: Option<Decimal>,
) -> OrderResult {
    OrderResult {
        opportunity: opportunity.clone(),
        status: OrderOutcome::Submitted,
        order_id: extract_order_id(&raw),
        price,
        size,
        error: None,
        retried_with_minimum,
        raw: Some(raw),
    }
}

fn error_result(
    opportunity: &Opportunity,
    price: Decimal,
    size: Decimal,
    error: String,
    retried_with_minimum: Option<Decimal>,
) -> OrderResult {
    OrderResult {
        opportunity: opportunity.clone(),
        status: OrderOutcome::Error,
        order_id: None,
        price,
        size,
        error: Some(error),
        retried_with_minimum,
        raw: None,
    }
}

/// Extract an order id from an exchange response, trying the known field
/// names and one level of nesting.
pub fn extract_order_id(result: &Value) -> Option<String> {
    for key in ["orderID", "orderId", "order_id", "id"] {
        if let Some(id) = result.get(key).and_then(|v| v.as_str()) {
            return Some(id.to_string());
        }
    }

    for key in ["order", "data", "result"] {
        if let Some(nested) = result.get(key) {
            if let Some(id) = extract_order_id(nested) {
                return Some(id);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{MarketRecord, MockExchangeClient};
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    fn opportunity(token_id: Option<&str>) -> Opportunity {
        Opportunity {
            market_id: Some("0xabc".to_string()),
            question: "Will X happen?".to_string(),
            no_price: dec!(0.004),
            token_id: token_id.map(str::to_string),
            condition_id: Some("0xabc".to_string()),
            slug: None,
            event_slug: None,
            volume_24h: dec!(0),
            url: None,
            discovered_at: OffsetDateTime::now_utc(),
        }
    }

    fn executor(mock: &MockExchangeClient) -> OrderExecutor {
        // The resolver points at a dead endpoint; tests must not reach it.
        OrderExecutor::new(
            Arc::new(mock.clone()),
            TokenResolver::with_endpoint("http://127.0.0.1:9"),
        )
    }

    #[test]
    fn parse_minimum_size_variants() {
        assert_eq!(
            parse_minimum_size("Size (5) lower than the minimum: 25"),
            Some(dec!(25))
        );
        assert_eq!(parse_minimum_size("minimum: 5.5"), Some(dec!(5.5)));
        assert_eq!(parse_minimum_size("order too small"), None);
    }

    #[tokio::test]
    async fn rejection_with_minimum_retries_exactly_once() {
        let mock = MockExchangeClient::new();
        mock.push_rejection("Size (5) lower than the minimum: 25");

        let results = executor(&mock)
            .place_buy_orders(&[opportunity(Some("tok-1"))], dec!(5), dec!(0.01))
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_submitted());
        assert_eq!(results[0].size, dec!(25));
        assert_eq!(results[0].retried_with_minimum, Some(dec!(25)));
        assert_eq!(mock.post_calls(), 2);

        let submitted = mock.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0.size, dec!(25));
        assert_eq!(submitted[0].1, TimeInForce::GTC);
    }

    #[tokio::test]
    async fn second_rejection_is_terminal_with_annotation() {
        let mock = MockExchangeClient::new();
        mock.push_rejection("Size (5) lower than the minimum: 25");
        mock.push_rejection("Size (25) still refused");

        let results = executor(&mock)
            .place_buy_orders(&[opportunity(Some("tok-1"))], dec!(5), dec!(0.01))
            .await;

        assert_eq!(results[0].status, OrderOutcome::Error);
        assert_eq!(results[0].retried_with_minimum, Some(dec!(25)));
        assert!(results[0].error.as_deref().unwrap().contains("retry with minimum 25"));
        // Exactly one retry, no further attempts.
        assert_eq!(mock.post_calls(), 2);
    }

    #[tokio::test]
    async fn rejection_without_minimum_is_not_retried() {
        let mock = MockExchangeClient::new();
        mock.push_rejection("insufficient balance");

        let results = executor(&mock)
            .place_buy_orders(&[opportunity(Some("tok-1"))], dec!(5), dec!(0.01))
            .await;

        assert_eq!(results[0].status, OrderOutcome::Error);
        assert_eq!(results[0].retried_with_minimum, None);
        assert_eq!(mock.post_calls(), 1);
    }

    #[tokio::test]
    async fn minimum_not_above_requested_size_is_not_retried() {
        let mock = MockExchangeClient::new();
        mock.push_rejection("Size (100) lower than the minimum: 25");

        let results = executor(&mock)
            .place_buy_orders(&[opportunity(Some("tok-1"))], dec!(100), dec!(0.01))
            .await;

        assert_eq!(results[0].status, OrderOutcome::Error);
        assert_eq!(mock.post_calls(), 1);
    }

    #[tokio::test]
    async fn missing_token_id_does_not_abort_the_batch() {
        let mock = MockExchangeClient::new();
        let mut unresolved = opportunity(None);
        // No embedded token and a condition id that is not 0x-hash shaped,
        // so every resolution path is skipped.
        unresolved.condition_id = Some("plain-id".to_string());
        unresolved.market_id = Some("plain-id".to_string());

        let results = executor(&mock)
            .place_buy_orders(
                &[unresolved, opportunity(Some("tok-2"))],
                dec!(10),
                dec!(0.01),
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, OrderOutcome::Error);
        assert_eq!(results[0].error.as_deref(), Some("missing token id"));
        assert!(results[1].is_submitted());
        assert_eq!(mock.post_calls(), 1);
    }

    #[tokio::test]
    async fn token_id_resolves_from_exchange_market_record() {
        let mock = MockExchangeClient::new();
        let condition = format!("0x{}", "ab".repeat(32));
        let record: MarketRecord = serde_json::from_value(serde_json::json!({
            "condition_id": condition,
            "tokens": [
                {"token_id": "111", "outcome": "Yes"},
                {"token_id": "222", "outcome": "No"}
            ]
        }))
        .unwrap();
        mock.set_market(condition.clone(), record);

        let mut op = opportunity(None);
        op.condition_id = Some(condition);

        let results = executor(&mock)
            .place_buy_orders(&[op], dec!(10), dec!(0.01))
            .await;

        assert!(results[0].is_submitted());
        assert_eq!(mock.submitted()[0].0.token_id, "222");
    }

    #[tokio::test]
    async fn submission_price_is_clamped_to_threshold() {
        let mock = MockExchangeClient::new();
        let mut op = opportunity(Some("tok-1"));
        op.no_price = dec!(0.02);

        let results = executor(&mock)
            .place_buy_orders(&[op], dec!(10), dec!(0.01))
            .await;

        assert_eq!(results[0].price, dec!(0.01));
        assert_eq!(mock.submitted()[0].0.price, dec!(0.01));
    }

    #[tokio::test]
    async fn effective_size_honors_exchange_minimum() {
        let mock = MockExchangeClient::new();
        let record: MarketRecord =
            serde_json::from_value(serde_json::json!({"minOrderSize": "25"})).unwrap();
        mock.set_market("0xmin", record);

        let executor = executor(&mock);
        assert_eq!(
            executor.effective_order_size(Some("0xmin"), dec!(5)).await,
            dec!(25)
        );
        assert_eq!(
            executor.effective_order_size(Some("0xmin"), dec!(100)).await,
            dec!(100)
        );
        // Unknown market falls back to the conservative default.
        assert_eq!(
            executor.effective_order_size(Some("0xother"), dec!(2)).await,
            dec!(5)
        );
        assert_eq!(executor.effective_order_size(None, dec!(2)).await, dec!(5));
    }

    #[test]
    fn extract_order_id_various_formats() {
        let json1 = serde_json::json!({"orderID": "abc123"});
        assert_eq!(extract_order_id(&json1), Some("abc123".to_string()));

        let json2 = serde_json::json!({"order": {"id": "ghi789"}});
        assert_eq!(extract_order_id(&json2), Some("ghi789".to_string()));

        let json3 = serde_json::json!({"error": "something"});
        assert_eq!(extract_order_id(&json3), None);
    }
}
