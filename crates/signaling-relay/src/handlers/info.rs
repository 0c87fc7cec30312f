//! Service info handler.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Body of `GET /`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ServiceInfo {
    pub ok: bool,
    pub name: String,
    /// Rooms with at least one connected peer.
    pub rooms: usize,
}

/// Handler for GET /
#[tracing::instrument(skip_all, name = "relay.info")]
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        ok: true,
        name: state.config.app_name.clone(),
        rooms: state.relay.registry().room_count(),
    })
}
