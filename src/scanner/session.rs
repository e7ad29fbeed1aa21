//! Per-chat scan session loop.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::aggregator::OpportunityAggregator;
use super::opportunity::{format_opportunities, Opportunity};
use super::registry::SessionRegistry;
use crate::error::Result;
use crate::metrics;
use crate::notify::Notifier;
use crate::settings::{ChatSettings, SettingsStore};
use crate::trading::executor::OrderExecutor;
use crate::trading::order::OrderResult;

/// Floor on the scan interval, to avoid hammering the catalogs.
pub const MIN_SCAN_INTERVAL_SECS: u64 = 5;

/// Cap on raw exchange responses echoed into chat.
const RAW_TRUNCATE: usize = 900;

/// Cap on order details listed in a submission summary.
const SUMMARY_ORDER_CAP: usize = 5;

/// Periodic scan loop for one chat.
///
/// Each iteration loads effective settings, aggregates opportunities,
/// publishes them to the chat, and optionally places orders. Iteration
/// errors are reported to the chat and the loop continues; only cancellation
/// ends it.
pub struct ScanSession {
    chat_id: i64,
    scan_interval: Duration,
    aggregator: Arc<OpportunityAggregator>,
    executor: Option<Arc<OrderExecutor>>,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    registry: Arc<SessionRegistry>,
}

impl ScanSession {
    /// Create a session. `executor` is `None` in alert-only deployments.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chat_id: i64,
        scan_interval: Duration,
        aggregator: Arc<OpportunityAggregator>,
        executor: Option<Arc<OrderExecutor>>,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            chat_id,
            scan_interval,
            aggregator,
            executor,
            settings,
            notifier,
            registry,
        }
    }

    /// Run until cancelled.
    #[instrument(skip(self, token), fields(chat_id = self.chat_id))]
    pub async fn run(self, token: CancellationToken) {
        info!("Scanner loop starting");

        loop {
            if token.is_cancelled() {
                break;
            }

            if let Err(e) = self.scan_once().await {
                warn!(error = %e, "Scan iteration failed");
                self.notifier
                    .send(self.chat_id, &format!("❌ Scan error: {}", e), false)
                    .await;
            }

            let interval =
                Duration::from_secs(self.scan_interval.as_secs().max(MIN_SCAN_INTERVAL_SECS));
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.notifier
            .send(self.chat_id, "Scanning stopped.", false)
            .await;
        info!("Scanner loop cancelled");
    }

    async fn scan_once(&self) -> Result<()> {
        let settings = self.settings.get(self.chat_id)?;
        let threshold = settings.max_price_no_tokens;
        metrics::inc_scans();

        debug!(%threshold, auto = settings.auto_place_orders, "Scanning");
        let opportunities = self.aggregator.find_eligible_markets(threshold).await;
        self.registry
            .set_last_found(self.chat_id, opportunities.clone());

        if opportunities.is_empty() {
            debug!("No eligible markets this iteration");
            return Ok(());
        }

        self.notifier
            .send(
                self.chat_id,
                &format_opportunities(&opportunities, threshold),
                true,
            )
            .await;

        if settings.auto_place_orders {
            match &self.executor {
                Some(executor) => {
                    self.place_orders(executor, &opportunities, &settings, threshold)
                        .await;
                }
                None => {
                    warn!("Auto-ordering enabled but no trading credentials configured");
                }
            }
        }

        Ok(())
    }

    async fn place_orders(
        &self,
        executor: &OrderExecutor,
        opportunities: &[Opportunity],
        settings: &ChatSettings,
        threshold: Decimal,
    ) {
        let mut placed = Vec::new();
        let mut failed = 0usize;

        for opportunity in opportunities {
            let condition = opportunity
                .condition_id
                .as_deref()
                .or(opportunity.market_id.as_deref());
            let size = executor
                .effective_order_size(condition, settings.max_order_size)
                .await;

            let results = executor
                .place_buy_orders(std::slice::from_ref(opportunity), size, threshold)
                .await;
            for result in results {
                if result.is_submitted() {
                    placed.push(result);
                } else {
                    failed += 1;
                }
            }
        }

        if !placed.is_empty() || failed > 0 {
            self.notifier
                .send(self.chat_id, &format_order_summary(&placed, failed), true)
                .await;
        }
    }
}

/// Format the submission summary for one auto-order pass.
pub fn format_order_summary(placed: &[OrderResult], failed: usize) -> String {
    let mut text = "📊 *Order Summary*\n\n".to_string();

    if !placed.is_empty() {
        text.push_str(&format!("✅ *{} orders placed*\n", placed.len()));
        for result in placed.iter().take(SUMMARY_ORDER_CAP) {
            text.push_str(&format!(
                "  • Order {} at ${:.4}\n",
                result.order_id.as_deref().unwrap_or("n/a"),
                result.price
            ));
        }

        if let Some(raw) = placed.first().and_then(|r| r.raw.as_ref()) {
            let mut raw_str =
                serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
            if raw_str.len() > RAW_TRUNCATE {
                let mut cut = RAW_TRUNCATE;
                while !raw_str.is_char_boundary(cut) {
                    cut -= 1;
                }
                raw_str.truncate(cut);
                raw_str.push_str("...");
            }
            text.push_str("\nRaw response (truncated):\n");
            text.push_str(&raw_str);
        }
    }

    if failed > 0 {
        text.push_str(&format!("❌ *{} orders failed*\n", failed));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{CatalogFetcher, TokenResolver};
    use crate::notify::RecordingNotifier;
    use crate::scanner::opportunity::Opportunity;
    use crate::settings::JsonSettingsStore;
    use crate::trading::order::{OrderOutcome, OrderResult};
    use rust_decimal_macros::dec;
    use time::OffsetDateTime;

    fn placed_result(order_id: &str) -> OrderResult {
        OrderResult {
            opportunity: Opportunity {
                market_id: Some("0xabc".to_string()),
                question: "Q".to_string(),
                no_price: dec!(0.004),
                token_id: Some("222".to_string()),
                condition_id: None,
                slug: None,
                event_slug: None,
                volume_24h: dec!(0),
                url: None,
                discovered_at: OffsetDateTime::now_utc(),
            },
            status: OrderOutcome::Submitted,
            order_id: Some(order_id.to_string()),
            price: dec!(0.004),
            size: dec!(25),
            error: None,
            retried_with_minimum: None,
            raw: Some(serde_json::json!({"orderID": order_id, "detail": "x".repeat(2000)})),
        }
    }

    #[test]
    fn order_summary_counts_and_truncates_raw() {
        let placed = vec![placed_result("o-1"), placed_result("o-2")];
        let text = format_order_summary(&placed, 3);

        assert!(text.contains("2 orders placed"));
        assert!(text.contains("Order o-1"));
        assert!(text.contains("3 orders failed"));
        assert!(text.contains("Raw response (truncated)"));
        assert!(text.contains("..."));
        // The 2000-char detail must not survive whole.
        assert!(text.len() < 1500);
    }

    #[test]
    fn order_summary_without_successes_lists_only_failures() {
        let text = format_order_summary(&[], 2);
        assert!(!text.contains("orders placed"));
        assert!(text.contains("2 orders failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn session_ends_with_final_notification_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(JsonSettingsStore::new(
            dir.path(),
            crate::settings::ChatSettings {
                max_price_no_tokens: dec!(0.01),
                max_order_size: dec!(100),
                sell_target_price: dec!(0.05),
                auto_place_orders: false,
            },
        ));
        let notifier = Arc::new(RecordingNotifier::new());
        let registry = Arc::new(SessionRegistry::new());
        // Dead endpoints: every fetch fails fast and yields no opportunities.
        let aggregator = Arc::new(OpportunityAggregator::with_parts(
            CatalogFetcher::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9"),
            TokenResolver::with_endpoint("http://127.0.0.1:9"),
        ));

        let session = ScanSession::new(
            7,
            Duration::from_secs(60),
            aggregator,
            None,
            settings,
            notifier.clone(),
            registry.clone(),
        );

        let token = CancellationToken::new();
        let handle = tokio::spawn(session.run(token.clone()));

        // Let the first iteration run, then cancel.
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
        handle.await.unwrap();

        let texts = notifier.texts();
        assert_eq!(texts.last().map(String::as_str), Some("Scanning stopped."));
        // Nothing found, so the only message is the final notice.
        assert_eq!(texts.len(), 1);
        assert!(registry.scan_state(7).last_found.is_empty());
    }
}
