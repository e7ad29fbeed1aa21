//! HTTP API handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::scanner::SessionRegistry;
use crate::settings::SettingsStore;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session registry holding live tasks and scan state.
    pub registry: Arc<SessionRegistry>,
    /// Per-chat settings store.
    pub settings: Arc<dyn SettingsStore>,
    /// Configured scan interval, reported in status.
    pub scan_interval_seconds: u64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Per-chat status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether a scan session is live for the chat.
    pub scanning: bool,
    /// Opportunity count from the most recent scan.
    pub last_found_count: usize,
    /// Effective price threshold.
    pub price_threshold: Decimal,
    /// Scan interval in seconds.
    pub scan_interval_seconds: u64,
    /// Effective order size.
    pub order_size: Decimal,
    /// Whether auto-ordering is enabled.
    pub auto_place_orders: bool,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short human-readable error.
    pub error: String,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Per-chat status handler, sourced from scan state and chat settings.
pub async fn status(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> impl IntoResponse {
    let settings = match state.settings.get(chat_id) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to load settings for status");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "settings unavailable".to_string(),
                }),
            )
                .into_response();
        }
    };

    let scan_state = state.registry.scan_state(chat_id);

    Json(StatusResponse {
        scanning: state.registry.is_scanning(chat_id),
        last_found_count: scan_state.last_found.len(),
        price_threshold: settings.max_price_no_tokens,
        scan_interval_seconds: state.scan_interval_seconds,
        order_size: settings.max_order_size,
        auto_place_orders: settings.auto_place_orders,
    })
    .into_response()
}
