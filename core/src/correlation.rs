//! Correlation identifiers.
//!
//! A [`CorrelationId`] links one outbound generation request to its eventual
//! response. Ids are generated fresh per request and never reused.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token identifying exactly one outstanding generation request.
///
/// Serialized as a bare string (`"requestId"` / `"request_id"` on the wire).
///
/// # Example
///
/// ```
/// use genbridge_core::CorrelationId;
///
/// let a = CorrelationId::new();
/// let b = CorrelationId::new();
/// assert_ne!(a, b);
///
/// let fixed = CorrelationId::from("R1");
/// assert_eq!(fixed.as_str(), "R1");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh random (UUID v4) correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
