//! Queue message envelopes and the values delivered to waiters.
//!
//! Field names on the wire are stable and shared with the external worker:
//!
//! ```text
//! request:  {"fileIds": [..], "userId": "..", "requestId": "..", "responseQueueUrl": ".."}
//! response: {"request_id": "..", "file_id": "..", "key": "..", "success": true, "error": ".."}
//! ```

use crate::correlation::CorrelationId;
use crate::error::GenerationError;
use serde::{Deserialize, Serialize};

/// Message sent when no failure text was supplied by the worker.
pub const DEFAULT_FAILURE_MESSAGE: &str = "generation failed";

/// Generation request published to the request queue.
///
/// Immutable once published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Files to derive the artifact from
    #[serde(rename = "fileIds")]
    pub file_ids: Vec<String>,
    /// The user asking for generation
    #[serde(rename = "userId")]
    pub requester_id: String,
    /// Correlation id the response must echo back
    #[serde(rename = "requestId")]
    pub correlation_id: CorrelationId,
    /// Where the worker should send its response
    #[serde(rename = "responseQueueUrl")]
    pub response_destination: String,
}

impl GenerationRequest {
    /// Serialize the request to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::PublishFailed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, GenerationError> {
        serde_json::to_string(self).map_err(|e| {
            GenerationError::PublishFailed(format!("Failed to serialize request: {e}"))
        })
    }
}

/// Generation response produced by the external worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Correlation id of the originating request
    #[serde(rename = "request_id")]
    pub correlation_id: CorrelationId,
    /// Id of the generated file (empty on failure)
    #[serde(default)]
    pub file_id: String,
    /// Object-store key of the generated file (empty on failure)
    #[serde(default)]
    pub key: String,
    /// Whether generation succeeded
    #[serde(default)]
    pub success: bool,
    /// Failure description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResponse {
    /// Decode a response from a queue message body.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MalformedResponse`] if the body is not a
    /// JSON response object or carries an empty `request_id`.
    pub fn from_json(body: &str) -> Result<Self, GenerationError> {
        let response: Self = serde_json::from_str(body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        if response.correlation_id.as_str().is_empty() {
            return Err(GenerationError::MalformedResponse(
                "request_id is empty".to_string(),
            ));
        }

        Ok(response)
    }

    /// Map the response onto the value delivered to the waiter.
    ///
    /// A failed response without a message gets [`DEFAULT_FAILURE_MESSAGE`].
    #[must_use]
    pub fn into_result(self) -> GenerationResult {
        let error = if self.success {
            None
        } else {
            Some(
                self.error
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            )
        };

        GenerationResult {
            file_id: self.file_id,
            key: self.key,
            error,
        }
    }
}

/// The value delivered into a pending slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    /// Id of the generated file
    pub file_id: String,
    /// Object-store key of the generated file
    pub key: String,
    /// Worker-reported failure, if any
    pub error: Option<String>,
}

impl GenerationResult {
    /// A successful result.
    #[must_use]
    pub fn success(file_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            key: key.into(),
            error: None,
        }
    }

    /// A failed result carrying the worker's message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            file_id: String::new(),
            key: String::new(),
            error: Some(message.into()),
        }
    }

    /// Convert into what the caller of the wait API receives.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::WorkerFailure`] if the result carries an error.
    pub fn into_outcome(self) -> Result<GeneratedFile, GenerationError> {
        match self.error {
            Some(message) => Err(GenerationError::WorkerFailure(message)),
            None => Ok(GeneratedFile {
                file_id: self.file_id,
                key: self.key,
            }),
        }
    }
}

/// A successfully generated file, as returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Id of the generated file
    pub file_id: String,
    /// Object-store key of the generated file
    pub key: String,
}
