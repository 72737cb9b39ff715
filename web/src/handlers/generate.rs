//! File generation endpoint.

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::RequesterId;
use crate::state::AppState;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use genbridge_core::GeneratedFile;
use serde::Deserialize;

/// Body of `POST /api/v1/files/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// Files to generate from
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// Generate a file from existing files and wait for the worker's result.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/files/generate
/// X-User-Id: U1
///
/// {"file_ids": ["F1", "F2"]}
/// ```
///
/// # Response
///
/// ```json
/// {
///   "file_id": "F9",
///   "key": "generated/F9.pdf"
/// }
/// ```
///
/// If the client disconnects, the handler future is dropped and the pending
/// request is released with it.
///
/// # Errors
///
/// - 400 if the body is not JSON, `file_ids` is empty, or `X-User-Id` is missing
/// - 502 if the worker reported a failure
/// - 503 if the request could not be published or the server is shutting down
/// - 504 if the worker did not answer in time
pub async fn generate_file(
    State(state): State<AppState>,
    requester: RequesterId,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> WebResult<Json<GeneratedFile>> {
    if state.shutdown.is_cancelled() {
        return Err(AppError::unavailable("Server is shutting down"));
    }

    let Json(request) = body.map_err(|_| AppError::bad_request("invalid request body"))?;
    if request.file_ids.is_empty() {
        return Err(AppError::bad_request("file_ids is required"));
    }

    let file = state
        .client
        .generate(request.file_ids, &requester.0, &state.shutdown)
        .await?;

    Ok(Json(file))
}
