//! Storefront Session Client
//!
//! This module keeps a storefront session alive against the REST API: it holds
//! the tokens, attaches them to requests, and transparently refreshes an expired
//! access token once before giving up and signing the user out.
//!
//! # Architecture
//!
//! - **`config`** - API origin, namespace prefix, timeout, data directory
//! - **`session`** - Session and user model
//! - **`storage`** - Durable key/value storage (SQLite or in-memory)
//! - **`token_store`** - Shared session state mirrored into storage
//! - **`routes`** - Which paths skip refresh and which skip the namespace
//! - **`gateway`** - Plain HTTP requests with bearer token and cookies
//! - **`authenticator`** - 401 → refresh → retry, single-flight
//! - **`auth`** - Login, registration, OTP and profile calls
//! - **`main`** - `storefront-session` binary (feature `cli`)
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs           - Module exports and documentation
//! ├── main.rs          - Binary entry point
//! ├── config.rs        - Resolved configuration
//! ├── error.rs         - ApiError, StorageError, ClientError
//! ├── session.rs       - Session, UserSnapshot, SessionUpdate
//! ├── storage.rs       - SessionStorage, SqliteStorage, MemoryStorage
//! ├── token_store.rs   - TokenStore
//! ├── routes.rs        - RouteClassifier
//! ├── gateway.rs       - HttpGateway, ApiRequest, ApiResponse
//! ├── authenticator.rs - SessionAuthenticator
//! └── auth.rs          - AuthApi
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront::client::{AuthApi, Config, LoginOutcome, SessionAuthenticator, SqliteStorage, TokenStore};
//!
//! # async fn example() -> Result<(), storefront::client::ClientError> {
//! let config = Config::from_env()?;
//! let storage = SqliteStorage::open(config.session_db_path()).await?;
//! let store = TokenStore::restore(Arc::new(storage)).await;
//! let api = AuthApi::new(SessionAuthenticator::builder(config, store).build()?);
//!
//! if let LoginOutcome::NeedsOtp { .. } = api.login("9999999999", "secret").await? {
//!     api.confirm_otp("9999999999", "123456").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod token_store;
pub mod routes;
pub mod gateway;
pub mod authenticator;
pub mod auth;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, ApiResult, ClientError, StorageError};
pub use session::{Session, SessionUpdate, UserProjection, UserSnapshot};
pub use storage::{MemoryStorage, SessionStorage, SqliteStorage};
pub use token_store::TokenStore;
pub use routes::RouteClassifier;
pub use gateway::{ApiRequest, ApiResponse, HttpGateway};
pub use authenticator::{AuthPhase, RefreshOutcome, SessionAuthenticator, SessionAuthenticatorBuilder};
pub use auth::{AuthApi, LoginOutcome, OtpResent, RegisterOutcome};
