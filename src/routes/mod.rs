//! Route modules for the ingest server

pub mod health;
pub mod upload;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::middleware::{log_access, recovery, MethodFilter};
use crate::state::AppState;

/// Build the application router.
///
/// Layers from the outside in: access log, panic recovery, body limit.
pub fn app(state: AppState) -> Router {
    let settings = &state.config().upload;
    let methods = MethodFilter::new(settings.allowed_methods.iter().cloned());
    let body_limit = DefaultBodyLimit::max(settings.max_body_bytes);

    Router::new()
        .route("/upload", upload::route(methods))
        .route("/health", get(health::health_check))
        .layer(body_limit)
        .layer(recovery::layer())
        .layer(axum::middleware::from_fn(log_access))
        .with_state(state)
}
