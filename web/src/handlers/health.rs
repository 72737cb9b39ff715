//! Health check endpoint.
//!
//! Used by load balancers and monitoring systems to verify the service is up.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Liveness report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `"ok"`, or `"shutting_down"` once shutdown has begun
    pub status: &'static str,
    /// Generation requests currently waiting for the worker
    pub pending_requests: usize,
    /// When the report was produced
    pub timestamp: DateTime<Utc>,
}

/// Health check with tracker diagnostics.
///
/// # Status Codes
///
/// - 200 OK: Serving
/// - 503 Service Unavailable: Shutting down
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "pending_requests": 2,
///   "timestamp": "2025-01-01T00:00:00Z"
/// }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let shutting_down = state.shutdown.is_cancelled();
    let report = HealthReport {
        status: if shutting_down { "shutting_down" } else { "ok" },
        pending_requests: state.client.tracker().len(),
        timestamp: Utc::now(),
    };

    let status = if shutting_down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}
