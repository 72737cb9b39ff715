//! Axum HTTP surface for the generation bridge.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at `POST /api/v1/files/generate`
//! 2. **Extract** the requester (`X-User-Id`) and the `file_ids` body
//! 3. **Wait** on [`GenerationClient::generate`](genbridge_runtime::GenerationClient::generate)
//! 4. **Map result** to `{file_id, key}` or a structured error
//!
//! # Example
//!
//! ```ignore
//! use genbridge_web::{AppState, router};
//!
//! let app = router(AppState::new(client, shutdown.clone()));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{REQUESTER_ID_HEADER, RequesterId};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
