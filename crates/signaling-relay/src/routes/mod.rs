//! HTTP routes for the signaling relay.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::observability::{health_router, HealthState};
use crate::relay::SignalingRelay;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Relay core: registry, verifier and session lifecycle.
    pub relay: Arc<SignalingRelay>,

    /// Service configuration.
    pub config: Config,

    /// Liveness/readiness flags.
    pub health: Arc<HealthState>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Service name and active room count
/// - `/ws/:code` - WebSocket signaling endpoint (token in `?token=`)
/// - `/health`, `/healthz` - Liveness probes
/// - `/ready` - Readiness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let relay_routes = Router::new()
        .route("/", get(handlers::service_info))
        .route("/ws/:code", get(handlers::signaling_ws))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    relay_routes
        .merge(health_router(Arc::clone(&state.health)))
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::util::ServiceExt;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    fn app() -> (Router, Arc<AppState>) {
        let vars = HashMap::from([
            ("JWT_SECRET".to_string(), "routes-test-secret".to_string()),
            ("RELAY_APP_NAME".to_string(), "Test Relay".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        let state = Arc::new(AppState {
            relay: Arc::new(SignalingRelay::from_config(&config)),
            config,
            health: Arc::new(HealthState::new()),
        });
        let handle = PrometheusBuilder::new().build_recorder().handle();
        (build_routes(Arc::clone(&state), handle), state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_reports_name_and_rooms() {
        let (app, _state) = app();
        let (status, body) = get_json(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({"ok": true, "name": "Test Relay", "rooms": 0})
        );
    }

    #[tokio::test]
    async fn test_health_routes_are_mounted() {
        let (app, state) = app();
        state.health.set_ready();

        for uri in ["/health", "/ready", "/metrics"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }

        let (status, body) = get_json(app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let (app, state) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ws/abc123?token=x")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        // Plain GET without upgrade headers is refused before any auth or
        // registration happens.
        assert!(response.status().is_client_error());
        assert_eq!(state.relay.registry().room_count(), 0);
    }
}
