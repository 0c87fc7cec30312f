//! Test server harness for E2E testing
//!
//! Provides `TestRelayServer` for spawning real relay instances in tests.

use crate::token_builders::TestTokenBuilder;
use metrics_exporter_prometheus::PrometheusBuilder;
use signaling_relay::config::Config;
use signaling_relay::observability::HealthState;
use signaling_relay::relay::SignalingRelay;
use signaling_relay::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// HS256 secret used by every test server.
pub const TEST_JWT_SECRET: &str = "relay-test-secret";

/// Test harness for spawning the signaling relay in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_join_flow_e2e() -> Result<()> {
///     let server = TestRelayServer::spawn().await?;
///     let token = server.token().for_user("admin").build();
///     let _client = TestWsClient::connect(&server.ws_url("abc123", Some(&token))).await?;
///     Ok(())
/// }
/// ```
pub struct TestRelayServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestRelayServer {
    /// Spawn a server with default test configuration.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    /// - Report ready
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(HashMap::new()).await
    }

    /// Spawn a server with extra environment-style overrides
    /// (e.g. `RELAY_PEER_QUEUE_CAPACITY`).
    pub async fn spawn_with(overrides: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
            ("RELAY_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let relay = Arc::new(SignalingRelay::from_config(&config));
        let health = Arc::new(HealthState::new());
        let state = Arc::new(AppState {
            relay,
            config,
            health: Arc::clone(&health),
        });

        // Handle over a recorder that is never installed globally, so any
        // number of test servers can coexist in one process.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        health.set_ready();

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for a room, with an optional `token` query parameter.
    pub fn ws_url(&self, code: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws/{}?token={}", self.addr, code, token),
            None => format!("ws://{}/ws/{}", self.addr, code),
        }
    }

    /// Token builder signing with this server's secret.
    pub fn token(&self) -> TestTokenBuilder {
        TestTokenBuilder::new(TEST_JWT_SECRET)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The live relay, for inspecting room membership.
    pub fn relay(&self) -> &Arc<SignalingRelay> {
        &self.state.relay
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for TestRelayServer {
    fn drop(&mut self) {
        // Close sessions so their tasks do not outlive the test.
        self.state.relay.shutdown();
        self._handle.abort();
    }
}
