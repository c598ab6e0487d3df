//! Shared Module
//!
//! This module contains types that do not depend on the HTTP client: the wire
//! format of the storefront API, payload-level errors and the application
//! configuration.
//!
//! # Overview
//!
//! Everything here is plain data plus validation. The `client` module turns these
//! into live requests and session state.

/// Request/response bodies of the REST API
pub mod types;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use config::{ApiMode, AppConfig, AppConfigBuilder, ConfigError};
pub use types::RoleName;
