//! Route table.

use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// | Method | Path | Handler |
/// |--------|------|---------|
/// | `POST` | `/api/v1/files/generate` | [`handlers::generate_file`] |
/// | `GET` | `/health` | [`handlers::health_check`] |
/// | `GET` | `/metrics` | [`handlers::metrics`] |
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/files/generate", post(handlers::generate_file))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
