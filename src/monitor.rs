//! Bounded-duration trade and order monitoring for one market.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::ExchangeError;
use crate::exchange::{ExchangeClient, OrderFilter, TradeFilter, TradeRecord};
use crate::metrics;
use crate::notify::Notifier;
use crate::trading::order::Side;

/// Floor on the poll interval.
pub const MIN_POLL_INTERVAL_SECS: u64 = 2;

/// Monitors trades, open orders and quotes for one market and token,
/// reporting deltas to a chat for a bounded duration.
pub struct TradeMonitor {
    chat_id: i64,
    condition_id: String,
    token_id: Option<String>,
    poll_interval: Duration,
    duration: Duration,
    client: Arc<dyn ExchangeClient>,
    notifier: Arc<dyn Notifier>,
}

impl TradeMonitor {
    /// Create a monitor for one market.
    pub fn new(
        chat_id: i64,
        condition_id: impl Into<String>,
        token_id: Option<String>,
        poll_interval: Duration,
        duration: Duration,
        client: Arc<dyn ExchangeClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            chat_id,
            condition_id: condition_id.into(),
            token_id,
            poll_interval,
            duration,
            client,
            notifier,
        }
    }

    /// Run until the duration elapses or the token is cancelled.
    ///
    /// Ticks come after each sleep, so a 30s monitor polling every 10s
    /// reports at the 10/20/30s boundaries. Per-tick errors are reported and
    /// do not end the loop.
    #[instrument(skip(self, token), fields(chat_id = self.chat_id, market = %self.condition_id))]
    pub async fn run(self, token: CancellationToken) {
        let address = self.client.address().ok();

        let baseline = match self.fetch_trades(address.as_deref()).await {
            Ok(trades) => trades.len(),
            Err(e) => {
                debug!(error = %e, "Baseline trade fetch failed, starting from zero");
                0
            }
        };

        self.notifier
            .send(
                self.chat_id,
                &format!(
                    "[{}] Monitoring started. Initial trades: {}",
                    now_stamp(),
                    baseline
                ),
                false,
            )
            .await;

        let started = tokio::time::Instant::now();
        let interval = Duration::from_secs(
            self.poll_interval.as_secs().max(MIN_POLL_INTERVAL_SECS),
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Monitor cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            if let Err(e) = self.tick(address.as_deref(), baseline).await {
                warn!(error = %e, "Monitor tick failed");
                self.notifier
                    .send(self.chat_id, &format!("❌ Monitor error: {}", e), false)
                    .await;
            }

            if started.elapsed() >= self.duration {
                break;
            }
        }

        self.notifier
            .send(
                self.chat_id,
                &format!("Monitoring ended after {}s.", self.duration.as_secs()),
                false,
            )
            .await;
    }

    async fn tick(&self, address: Option<&str>, baseline: usize) -> Result<(), ExchangeError> {
        metrics::inc_monitor_ticks();

        let trades = self.fetch_trades(address).await?;
        let total = trades.len();
        let new_trades = total.saturating_sub(baseline);

        let open_count = match self.fetch_open_orders(address).await {
            Ok(orders) => orders.len(),
            Err(e) => {
                debug!(error = %e, "Open-order fetch failed");
                0
            }
        };

        let (last, mid, best_buy) = self.fetch_quotes().await;

        self.notifier
            .send(
                self.chat_id,
                &format!(
                    "[{}] Trades: {} total (+{} new) | Open Orders: {} | Last: {} | Mid: {} | Best Buy: {}",
                    now_stamp(),
                    total,
                    new_trades,
                    open_count,
                    quote_str(last),
                    quote_str(mid),
                    quote_str(best_buy),
                ),
                false,
            )
            .await;

        if new_trades > 0 {
            let mut lines = vec!["New trades:".to_string()];
            for trade in trades.iter().rev().take(new_trades).rev() {
                lines.push(format_trade_line(trade));
            }
            self.notifier
                .send(self.chat_id, &lines.join("\n"), false)
                .await;
        }

        Ok(())
    }

    /// Fetch trades for this market; when the filtered call fails, fall back
    /// to an unfiltered call filtered locally by address equality.
    async fn fetch_trades(
        &self,
        address: Option<&str>,
    ) -> Result<Vec<TradeRecord>, ExchangeError> {
        let filter = TradeFilter {
            market: Some(self.condition_id.clone()),
            maker_address: address.map(str::to_string),
        };

        match self.client.get_trades(Some(&filter)).await {
            Ok(trades) => Ok(trades),
            Err(e) => {
                debug!(error = %e, "Filtered trade query failed, falling back to unfiltered");
                let all = self.client.get_trades(None).await?;
                Ok(match address {
                    Some(address) => all
                        .into_iter()
                        .filter(|t| t.involves(address))
                        .collect(),
                    None => all,
                })
            }
        }
    }

    async fn fetch_open_orders(
        &self,
        address: Option<&str>,
    ) -> Result<Vec<crate::exchange::OpenOrderRecord>, ExchangeError> {
        let filter = OrderFilter {
            market: Some(self.condition_id.clone()),
            address: address.map(str::to_string),
        };

        match self.client.get_open_orders(Some(&filter)).await {
            Ok(orders) => Ok(orders),
            Err(e) => {
                debug!(error = %e, "Filtered order query failed, falling back to unfiltered");
                let all = self.client.get_open_orders(None).await?;
                Ok(match address {
                    Some(address) => all
                        .into_iter()
                        .filter(|o| o.owned_by(address))
                        .collect(),
                    None => all,
                })
            }
        }
    }

    /// Best-effort quotes; each failure is independent.
    async fn fetch_quotes(&self) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
        let Some(token_id) = self.token_id.as_deref() else {
            return (None, None, None);
        };

        let last = self.client.get_last_trade_price(token_id).await.ok();
        let mid = self.client.get_midpoint(token_id).await.ok();
        let best_buy = self.client.get_best_price(token_id, Side::Buy).await.ok();
        (last, mid, best_buy)
    }
}

fn quote_str(quote: Option<Decimal>) -> String {
    match quote {
        Some(price) => format!("${}", price),
        None => "N/A".to_string(),
    }
}

fn format_trade_line(trade: &TradeRecord) -> String {
    format!(
        " • {} {} @ ${} at {}",
        trade.side.as_deref().unwrap_or("?"),
        trade
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".to_string()),
        trade
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string()),
        trade.timestamp.as_deref().unwrap_or("?"),
    )
}

fn now_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
