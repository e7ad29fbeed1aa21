//! Exchange (CLOB) client capability.
//!
//! The trading SDK surface the rest of the bot consumes: order signing and
//! submission, trade/order queries, and price quotes. `ClobClient` talks to
//! the real exchange; `MockExchangeClient` stands in for tests.

pub mod clob;
pub mod mock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ExchangeError;
use crate::market::types::{de_flexible_decimal, de_flexible_string, RawToken};
use crate::trading::order::{OrderArgs, Side, SignedOrder, TimeInForce};

pub use clob::ClobClient;
pub use mock::MockExchangeClient;

/// Market record from the exchange's market endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarketRecord {
    /// Condition id.
    #[serde(alias = "conditionId", deserialize_with = "de_flexible_string")]
    pub condition_id: Option<String>,
    /// Question text.
    pub question: Option<String>,
    /// Embedded outcome tokens.
    pub tokens: Vec<RawToken>,
    /// Exchange-advertised minimum order size, under any of its spellings.
    #[serde(
        alias = "minOrderSize",
        alias = "min_size",
        alias = "minSize",
        alias = "lotSize",
        alias = "lot_size",
        alias = "minSizePerOrder",
        deserialize_with = "de_flexible_decimal"
    )]
    pub min_order_size: Option<Decimal>,
    /// Negative-risk market flag.
    #[serde(alias = "negRisk")]
    pub neg_risk: Option<bool>,
}

impl MarketRecord {
    /// Token id of the NO outcome, if embedded.
    pub fn no_token_id(&self) -> Option<String> {
        self.tokens
            .iter()
            .find(|t| t.is_no())
            .and_then(|t| t.any_id().map(str::to_string))
    }
}

/// One trade as reported by the exchange.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TradeRecord {
    /// Trade id.
    #[serde(deserialize_with = "de_flexible_string")]
    pub id: Option<String>,
    /// Originating order id.
    #[serde(alias = "orderId", alias = "orderID", deserialize_with = "de_flexible_string")]
    pub order_id: Option<String>,
    /// Trade side.
    pub side: Option<String>,
    /// Trade size.
    #[serde(deserialize_with = "de_flexible_decimal")]
    pub size: Option<Decimal>,
    /// Trade price.
    #[serde(deserialize_with = "de_flexible_decimal")]
    pub price: Option<Decimal>,
    /// Trade timestamp, as reported.
    #[serde(alias = "ts", alias = "created_at", alias = "createdAt", deserialize_with = "de_flexible_string")]
    pub timestamp: Option<String>,
    /// Token id.
    #[serde(
        alias = "tokenId",
        alias = "asset_id",
        alias = "assetId",
        deserialize_with = "de_flexible_string"
    )]
    pub token_id: Option<String>,
    /// Maker address.
    #[serde(alias = "makerAddress", deserialize_with = "de_flexible_string")]
    pub maker_address: Option<String>,
    /// Maker under its short spelling.
    #[serde(deserialize_with = "de_flexible_string")]
    pub maker: Option<String>,
    /// Taker address.
    #[serde(alias = "takerAddress", deserialize_with = "de_flexible_string")]
    pub taker_address: Option<String>,
    /// Taker under its short spelling.
    #[serde(deserialize_with = "de_flexible_string")]
    pub taker: Option<String>,
}

impl TradeRecord {
    /// Maker address under either spelling.
    pub fn maker(&self) -> Option<&str> {
        self.maker_address.as_deref().or(self.maker.as_deref())
    }

    /// Taker address under either spelling.
    pub fn taker(&self) -> Option<&str> {
        self.taker_address.as_deref().or(self.taker.as_deref())
    }

    /// Whether the given address appears on either side of the trade.
    pub fn involves(&self, address: &str) -> bool {
        let matches = |candidate: Option<&str>| {
            candidate
                .map(|c| c.eq_ignore_ascii_case(address))
                .unwrap_or(false)
        };
        matches(self.maker()) || matches(self.taker())
    }
}

/// One open order as reported by the exchange.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenOrderRecord {
    /// Order id.
    #[serde(alias = "orderId", alias = "orderID", deserialize_with = "de_flexible_string")]
    pub id: Option<String>,
    /// Order side.
    pub side: Option<String>,
    /// Order size.
    #[serde(
        alias = "original_size",
        alias = "originalSize",
        deserialize_with = "de_flexible_decimal"
    )]
    pub size: Option<Decimal>,
    /// Limit price.
    #[serde(deserialize_with = "de_flexible_decimal")]
    pub price: Option<Decimal>,
    /// Token id.
    #[serde(
        alias = "tokenId",
        alias = "asset_id",
        alias = "assetId",
        deserialize_with = "de_flexible_string"
    )]
    pub token_id: Option<String>,
    /// Maker address.
    #[serde(alias = "makerAddress", deserialize_with = "de_flexible_string")]
    pub maker_address: Option<String>,
    /// Owner address, used by some API versions instead of maker.
    #[serde(deserialize_with = "de_flexible_string")]
    pub owner: Option<String>,
}

impl OpenOrderRecord {
    /// Whether the given address owns this order.
    pub fn owned_by(&self, address: &str) -> bool {
        [self.maker_address.as_deref(), self.owner.as_deref()]
            .into_iter()
            .flatten()
            .any(|c| c.eq_ignore_ascii_case(address))
    }
}

/// Server-side trade query filter.
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    /// Restrict to one market (condition id).
    pub market: Option<String>,
    /// Restrict to one maker address.
    pub maker_address: Option<String>,
}

/// Server-side open-order query filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to one market (condition id).
    pub market: Option<String>,
    /// Restrict to one owner address.
    pub address: Option<String>,
}

/// Trading SDK capability consumed by the executor and monitor.
///
/// All calls may fail with a generic [`ExchangeError`]. Filtered queries are
/// best-effort: when a filtered call fails, callers fall back to an
/// unfiltered call plus local filtering by address equality.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Wallet address derived from the configured credentials.
    fn address(&self) -> Result<String, ExchangeError>;

    /// Fetch one market record by condition id.
    async fn get_market(&self, condition_id: &str) -> Result<MarketRecord, ExchangeError>;

    /// Build and sign an order.
    async fn create_order(&self, args: &OrderArgs) -> Result<SignedOrder, ExchangeError>;

    /// Submit a signed order with an explicit time-in-force.
    async fn post_order(
        &self,
        order: &SignedOrder,
        tif: TimeInForce,
    ) -> Result<serde_json::Value, ExchangeError>;

    /// Fetch trades, optionally server-filtered.
    async fn get_trades(
        &self,
        filter: Option<&TradeFilter>,
    ) -> Result<Vec<TradeRecord>, ExchangeError>;

    /// Fetch open orders, optionally server-filtered.
    async fn get_open_orders(
        &self,
        filter: Option<&OrderFilter>,
    ) -> Result<Vec<OpenOrderRecord>, ExchangeError>;

    /// Last trade price for a token.
    async fn get_last_trade_price(&self, token_id: &str) -> Result<Decimal, ExchangeError>;

    /// Midpoint price for a token.
    async fn get_midpoint(&self, token_id: &str) -> Result<Decimal, ExchangeError>;

    /// Best price on one side of a token's book.
    async fn get_best_price(&self, token_id: &str, side: Side)
        -> Result<Decimal, ExchangeError>;

    /// Create and submit a limit order in one step.
    async fn place_limit_order(
        &self,
        args: &OrderArgs,
        tif: TimeInForce,
    ) -> Result<serde_json::Value, ExchangeError> {
        let signed = self.create_order(args).await?;
        self.post_order(&signed, tif).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_record_minimum_size_aliases() {
        for key in ["minOrderSize", "min_order_size", "min_size", "lotSize"] {
            let record: MarketRecord =
                serde_json::from_value(serde_json::json!({ key: "25" })).unwrap();
            assert_eq!(record.min_order_size, Some(dec!(25)), "alias {key}");
        }
    }

    #[test]
    fn market_record_no_token_lookup() {
        let record: MarketRecord = serde_json::from_value(serde_json::json!({
            "condition_id": "0xabc",
            "tokens": [
                {"token_id": "111", "outcome": "Yes"},
                {"token_id": "222", "outcome": "No"}
            ]
        }))
        .unwrap();
        assert_eq!(record.no_token_id(), Some("222".to_string()));
    }

    #[test]
    fn trade_involvement_is_case_insensitive() {
        let trade: TradeRecord = serde_json::from_value(serde_json::json!({
            "side": "BUY",
            "size": "10",
            "price": 0.01,
            "maker_address": "0xAbCd"
        }))
        .unwrap();
        assert!(trade.involves("0xabcd"));
        assert!(!trade.involves("0xother"));
    }

    #[test]
    fn open_order_owner_fallback() {
        let order: OpenOrderRecord = serde_json::from_value(serde_json::json!({
            "id": "o-1",
            "owner": "0xFeed",
            "price": "0.01",
            "original_size": 50
        }))
        .unwrap();
        assert!(order.owned_by("0xfeed"));
        assert_eq!(order.size, Some(dec!(50)));
    }

    #[test]
    fn trade_numeric_timestamp_is_accepted() {
        let trade: TradeRecord =
            serde_json::from_value(serde_json::json!({"timestamp": 1710000000})).unwrap();
        assert_eq!(trade.timestamp.as_deref(), Some("1710000000"));
    }
}
