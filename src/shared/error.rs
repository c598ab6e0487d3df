//! Payload Errors
//!
//! Failures that happen on either side of the network hop without involving it:
//! a body that will not encode or decode, a form field rejected before sending,
//! or a 2xx response that lacks what the caller needs.
//!
//! ```rust
//! use storefront::shared::error::SharedError;
//!
//! let error = SharedError::validation("mobile", "Mobile number is required");
//! assert_eq!(error.to_string(), "mobile: Mobile number is required");
//! ```

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// Body could not be encoded or decoded as JSON
    #[error("invalid payload: {message}")]
    SerializationError { message: String },

    /// Input rejected locally, nothing was sent
    #[error("{field}: {message}")]
    ValidationError { field: String, message: String },

    /// A success response without a field the caller depends on
    #[error("unexpected response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}

impl SharedError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn malformed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Field name for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
