//! Prometheus scrape endpoint.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, http::header, response::IntoResponse};

/// Render metrics in Prometheus text format.
///
/// Returns 404 when no recorder was installed by this process.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.as_ref().and_then(|server| server.render()) {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
