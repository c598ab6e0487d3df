/**
 * Client Error Types
 *
 * Errors produced by the session client.
 *
 * # Error Types
 *
 * - `ApiError` - the error half of every API result: a non-2xx response (status
 *   and decoded body, untouched) or a transport failure. Returned by the gateway
 *   and passed through the authenticator unmodified.
 * - `StorageError` - failures of the durable session storage.
 * - `ClientError` - what the higher-level auth calls return; wraps the above
 *   plus payload and configuration errors.
 */

use crate::shared::{ConfigError, SharedError};
use reqwest::StatusCode;
use thiserror::Error;

/// A failed API call
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("request failed with status {status}")]
    Status {
        status: StatusCode,
        /// Response body as JSON (a JSON string when the body was not JSON, `null` when empty)
        body: serde_json::Value,
    },

    /// The request never produced a response
    #[error("network error: {message}")]
    Network { message: String },
}

impl ApiError {
    pub fn status(status: StatusCode, body: serde_json::Value) -> Self {
        Self::Status { status, body }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// HTTP status, when there was a response
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network { .. } => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_some_and(|status| status.is_server_error())
    }

    /// Message suitable for a transient notification
    ///
    /// Prefers a `message` field of the response body over the generic display text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { body, .. } => body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
            Self::Network { .. } => self.to_string(),
        }
    }
}

/// Durable session storage failure
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the auth API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Shared(#[from] SharedError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// The underlying API error, if this came from the network layer
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Shared(err.into())
    }
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;
