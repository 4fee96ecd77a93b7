//! Error types for the transit data core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Transit Error Enum ==
/// Unified error type for every public data access operation.
///
/// Each variant carries enough context (endpoint or parameters) for the
/// caller to render a message and offer a retry.
#[derive(Error, Debug)]
pub enum TransitError {
    /// Device reports no network path; no request was issued
    #[error("No network connectivity while requesting {endpoint}")]
    NoConnectivity { endpoint: String },

    /// Response was not JSON, or the body failed to parse
    #[error("Invalid response format from {endpoint}: {reason}")]
    InvalidResponseFormat { endpoint: String, reason: String },

    /// Upstream answered with a non-2xx status
    #[error("HTTP {status} from {endpoint}")]
    Http { endpoint: String, status: u16 },

    /// The request could not be completed (connect failure, timeout)
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// Caller supplied an argument that fails validation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// JSON parsed but lacks the expected fields
    #[error("Unexpected data shape for {context}: {reason}")]
    DataShape { context: String, reason: String },

    /// Persisted storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TransitError {
    /// Builds a `DataShape` error for the given context.
    pub fn data_shape(context: impl Into<String>, reason: impl Into<String>) -> Self {
        TransitError::DataShape {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Returns true when the failure happened before or during transport,
    /// as opposed to a caller mistake.
    pub fn is_remote(&self) -> bool {
        !matches!(
            self,
            TransitError::InvalidParameter(_) | TransitError::Storage(_)
        )
    }
}

impl From<std::io::Error> for TransitError {
    fn from(err: std::io::Error) -> Self {
        TransitError::Storage(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the transit core.
pub type Result<T> = std::result::Result<T, TransitError>;
