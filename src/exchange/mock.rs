//! Mock exchange client for unit testing.
//!
//! Stands in for the CLOB API without network access: scripted rejections,
//! call counters, and trade snapshots let tests drive the executor and
//! monitor deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::{
    ExchangeClient, MarketRecord, OpenOrderRecord, OrderFilter, TradeFilter, TradeRecord,
};
use crate::error::ExchangeError;
use crate::trading::order::{OrderArgs, Side, SignedOrder, TimeInForce};

/// Mock exchange client.
#[derive(Debug, Clone, Default)]
pub struct MockExchangeClient {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    address: Mutex<String>,
    markets: Mutex<HashMap<String, MarketRecord>>,
    rejections: Mutex<VecDeque<String>>,
    submitted: Mutex<Vec<(OrderArgs, TimeInForce)>>,
    trades: Mutex<Vec<TradeRecord>>,
    trade_snapshots: Mutex<VecDeque<Vec<TradeRecord>>>,
    open_orders: Mutex<Vec<OpenOrderRecord>>,
    quotes: Mutex<HashMap<String, Decimal>>,
    fail_quotes: AtomicBool,
    fail_filtered_queries: AtomicBool,
    create_calls: AtomicU64,
    post_calls: AtomicU64,
    next_order_id: AtomicU64,
}

impl MockExchangeClient {
    /// Create a mock with a fixed test address.
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.inner.address.lock().unwrap() =
            "0xMOCK000000000000000000000000000000000001".to_string();
        mock
    }

    /// Register a market record for `get_market`.
    pub fn set_market(&self, condition_id: impl Into<String>, record: MarketRecord) {
        self.inner
            .markets
            .lock()
            .unwrap()
            .insert(condition_id.into(), record);
    }

    /// Queue a rejection for the next order submission.
    pub fn push_rejection(&self, reason: impl Into<String>) {
        self.inner.rejections.lock().unwrap().push_back(reason.into());
    }

    /// Set the current trade list.
    pub fn set_trades(&self, trades: Vec<TradeRecord>) {
        *self.inner.trades.lock().unwrap() = trades;
    }

    /// Queue a trade snapshot; each `get_trades` call consumes one before
    /// falling back to the current list.
    pub fn push_trade_snapshot(&self, trades: Vec<TradeRecord>) {
        self.inner.trade_snapshots.lock().unwrap().push_back(trades);
    }

    /// Set the open-order list.
    pub fn set_open_orders(&self, orders: Vec<OpenOrderRecord>) {
        *self.inner.open_orders.lock().unwrap() = orders;
    }

    /// Set a quote for `(kind, token_id)` where kind is "last", "mid" or "best".
    pub fn set_quote(&self, kind: &str, token_id: &str, price: Decimal) {
        self.inner
            .quotes
            .lock()
            .unwrap()
            .insert(format!("{kind}:{token_id}"), price);
    }

    /// Make every quote call fail.
    pub fn fail_quotes(&self, fail: bool) {
        self.inner.fail_quotes.store(fail, Ordering::SeqCst);
    }

    /// Make filtered trade/order queries fail, exercising the unfiltered
    /// fallback path.
    pub fn fail_filtered_queries(&self, fail: bool) {
        self.inner.fail_filtered_queries.store(fail, Ordering::SeqCst);
    }

    /// Orders submitted so far.
    pub fn submitted(&self) -> Vec<(OrderArgs, TimeInForce)> {
        self.inner.submitted.lock().unwrap().clone()
    }

    /// Number of `create_order` calls.
    pub fn create_calls(&self) -> u64 {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `post_order` calls.
    pub fn post_calls(&self) -> u64 {
        self.inner.post_calls.load(Ordering::SeqCst)
    }

    fn quote(&self, kind: &str, token_id: &str) -> Result<Decimal, ExchangeError> {
        if self.inner.fail_quotes.load(Ordering::SeqCst) {
            return Err(ExchangeError::ParseError("mock quote failure".to_string()));
        }
        self.inner
            .quotes
            .lock()
            .unwrap()
            .get(&format!("{kind}:{token_id}"))
            .copied()
            .ok_or_else(|| ExchangeError::ParseError(format!("no {kind} quote for {token_id}")))
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    fn address(&self) -> Result<String, ExchangeError> {
        Ok(self.inner.address.lock().unwrap().clone())
    }

    async fn get_market(&self, condition_id: &str) -> Result<MarketRecord, ExchangeError> {
        self.inner
            .markets
            .lock()
            .unwrap()
            .get(condition_id)
            .cloned()
            .ok_or_else(|| ExchangeError::ParseError(format!("unknown market {condition_id}")))
    }

    async fn create_order(&self, args: &OrderArgs) -> Result<SignedOrder, ExchangeError> {
        self.inner.create_calls.fetch_add(1, Ordering::SeqCst);
        args.validate().map_err(ExchangeError::Auth)?;
        Ok(SignedOrder {
            args: args.clone(),
            payload: json!({"mock": true, "token_id": args.token_id}),
        })
    }

    async fn post_order(
        &self,
        order: &SignedOrder,
        tif: TimeInForce,
    ) -> Result<Value, ExchangeError> {
        self.inner.post_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.inner.rejections.lock().unwrap().pop_front() {
            return Err(ExchangeError::Rejected { reason });
        }

        self.inner
            .submitted
            .lock()
            .unwrap()
            .push((order.args.clone(), tif));

        let id = self.inner.next_order_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(json!({
            "orderID": format!("mock-order-{id}"),
            "success": true
        }))
    }

    async fn get_trades(
        &self,
        filter: Option<&TradeFilter>,
    ) -> Result<Vec<TradeRecord>, ExchangeError> {
        if filter.is_some() && self.inner.fail_filtered_queries.load(Ordering::SeqCst) {
            return Err(ExchangeError::ParseError(
                "mock: filtered trade query unsupported".to_string(),
            ));
        }

        if let Some(snapshot) = self.inner.trade_snapshots.lock().unwrap().pop_front() {
            *self.inner.trades.lock().unwrap() = snapshot;
        }

        Ok(self.inner.trades.lock().unwrap().clone())
    }

    async fn get_open_orders(
        &self,
        filter: Option<&OrderFilter>,
    ) -> Result<Vec<OpenOrderRecord>, ExchangeError> {
        if filter.is_some() && self.inner.fail_filtered_queries.load(Ordering::SeqCst) {
            return Err(ExchangeError::ParseError(
                "mock: filtered order query unsupported".to_string(),
            ));
        }

        Ok(self.inner.open_orders.lock().unwrap().clone())
    }

    async fn get_last_trade_price(&self, token_id: &str) -> Result<Decimal, ExchangeError> {
        self.quote("last", token_id)
    }

    async fn get_midpoint(&self, token_id: &str) -> Result<Decimal, ExchangeError> {
        self.quote("mid", token_id)
    }

    async fn get_best_price(
        &self,
        token_id: &str,
        _side: Side,
    ) -> Result<Decimal, ExchangeError> {
        self.quote("best", token_id)
    }
}
