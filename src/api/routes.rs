//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/status/:chat_id", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SessionRegistry;
    use crate::settings::{ChatSettings, JsonSettingsStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState {
            registry: Arc::new(SessionRegistry::new()),
            settings: Arc::new(JsonSettingsStore::new(
                dir.path(),
                ChatSettings {
                    max_price_no_tokens: dec!(0.01),
                    max_order_size: dec!(100),
                    sell_target_price: dec!(0.05),
                    auto_place_orders: false,
                },
            )),
            scan_interval_seconds: 60,
        }
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_endpoint_reports_settings_and_scan_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["scanning"], false);
        assert_eq!(body["last_found_count"], 0);
        assert_eq!(body["scan_interval_seconds"], 60);
        assert_eq!(body["auto_place_orders"], false);
    }
}
