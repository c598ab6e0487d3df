//! Storefront - Session Client Library
//!
//! Client-side session handling for the storefront REST API: token storage,
//! authenticated requests and automatic access-token refresh.
//!
//! # Overview
//!
//! - Bearer token attached to every request, cookies always sent
//! - One refresh attempt per rejected request, one replay, then sign-out
//! - Concurrent 401s share a single refresh call
//! - Session persisted to a local SQLite database (refresh token excluded)
//!
//! # Module Structure
//!
//! - **`shared`** - Transport-independent pieces
//!   - Wire types of the REST API
//!   - Payload errors
//!   - Application configuration
//!
//! - **`client`** - The session client
//!   - Token store and storage backends
//!   - HTTP gateway and route classifier
//!   - Session authenticator and auth API
//!
//! # Feature Flags
//!
//! - **`cli`** - Builds the `storefront-session` binary (tracing-subscriber, dotenv)
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront::client::{ApiRequest, Config, MemoryStorage, SessionAuthenticator, TokenStore};
//!
//! # async fn example() -> Result<(), storefront::client::ClientError> {
//! let store = TokenStore::new(Arc::new(MemoryStorage::new()));
//! let auth = SessionAuthenticator::builder(Config::for_origin("https://api.shop.test")?, store).build()?;
//! let domain: serde_json::Value = auth.get_json("/seller/business/domain").await?;
//! # Ok(())
//! # }
//! ```

pub mod shared;
pub mod client;
