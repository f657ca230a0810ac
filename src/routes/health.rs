//! GET /health
//!
//! Reports whether the storage directory is usable; the store never creates
//! it, so a missing directory means every upload would fail.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage_ready: bool,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let storage_path = &state.config().upload.storage_path;
    let storage_ready = tokio::fs::metadata(storage_path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    if !storage_ready {
        tracing::warn!(path = %storage_path.display(), "Storage directory unavailable");
    }

    let (code, status) = if storage_ready {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            storage_ready,
        }),
    )
}
