//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::StoreBackend;
use crate::state::AppState;

/// Liveness report.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the process answers.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Backend in use: "memory" or "rocksdb".
    pub store: &'static str,
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = match state.config.store_backend {
        StoreBackend::Memory => "memory",
        StoreBackend::RocksDb => "rocksdb",
    };

    Json(HealthResponse {
        status: "ok",
        service: "flg",
        version: env!("CARGO_PKG_VERSION"),
        store,
    })
}
