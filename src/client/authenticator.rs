//! # Session Authenticator
//!
//! Wraps the [`HttpGateway`] with the 401 → refresh → retry cycle:
//!
//! 1. send the request;
//! 2. on 401 for a path that is not refresh-exempt and a request that was not
//!    already replayed, call the refresh endpoint once;
//! 3. if the refresh yields an access token, store it and replay the request
//!    once, marked as retried; whatever the replay returns is final (a second
//!    401 clears the session);
//! 4. if the refresh yields no usable token, clear the session and return the
//!    original error unchanged.
//!
//! Any other failure is returned as-is. Errors are always returned through the
//! `Result`, never raised past this boundary.
//!
//! ## Single-flight refresh
//!
//! Refresh calls are serialized behind an async mutex, and every finished
//! attempt bumps a generation counter. A request remembers the generation it was
//! sent under. If the counter moved while it waited for the mutex, it reuses the
//! finished attempt: it replays when the store holds a token, and fails without
//! hitting the refresh endpoint again when it does not. Concurrent 401s
//! therefore cost one refresh call in total, with or without a token in the
//! session when they were sent.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storefront::client::{ApiRequest, Config, MemoryStorage, SessionAuthenticator, TokenStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = TokenStore::new(Arc::new(MemoryStorage::new()));
//! let auth = SessionAuthenticator::builder(Config::new(), store)
//!     .on_session_cleared(|| println!("signed out"))
//!     .build()?;
//!
//! let response = auth.execute(ApiRequest::get("/seller/business/domain")).await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

use crate::client::config::Config;
use crate::client::error::{ApiError, ApiResult};
use crate::client::gateway::{ApiRequest, ApiResponse, HttpGateway};
use crate::client::routes::{RouteClassifier, REFRESH_PATH};
use crate::client::session::{SessionUpdate, UserSnapshot};
use crate::client::token_store::TokenStore;
use crate::shared::types::RefreshResponse;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

/// Callback fired whenever the authenticator (or an explicit logout) clears the session
pub type SessionClearedHook = Arc<dyn Fn() + Send + Sync>;

/// Where a single call is in the refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    AwaitingResponse,
    Refreshing,
    Retrying,
    Failed,
}

impl AuthPhase {
    pub fn can_transition_to(self, next: AuthPhase) -> bool {
        use AuthPhase::*;
        matches!(
            (self, next),
            (Idle, AwaitingResponse)
                | (AwaitingResponse, Idle)
                | (AwaitingResponse, Refreshing)
                | (AwaitingResponse, Failed)
                | (Refreshing, Retrying)
                | (Refreshing, Failed)
                | (Retrying, Idle)
                | (Retrying, Failed)
                | (Failed, Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AuthPhase::Idle | AuthPhase::Failed)
    }
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPhase::Idle => write!(f, "IDLE"),
            AuthPhase::AwaitingResponse => write!(f, "AWAITING_RESPONSE"),
            AuthPhase::Refreshing => write!(f, "REFRESHING"),
            AuthPhase::Retrying => write!(f, "RETRYING"),
            AuthPhase::Failed => write!(f, "FAILED"),
        }
    }
}

/// Phase of one `execute` call
struct PhaseTracker {
    phase: AuthPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self { phase: AuthPhase::Idle }
    }

    fn enter(&mut self, next: AuthPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        tracing::trace!(from = %self.phase, to = %next, "Auth phase transition");
        self.phase = next;
    }
}

/// Result of asking for a fresh access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This call hit the refresh endpoint and got a token
    Refreshed,
    /// Another call refreshed while this one waited
    Coalesced,
    /// No usable token; the session has been cleared
    Rejected,
}

impl RefreshOutcome {
    pub fn has_token(self) -> bool {
        matches!(self, RefreshOutcome::Refreshed | RefreshOutcome::Coalesced)
    }
}

struct Inner {
    gateway: HttpGateway,
    store: TokenStore,
    routes: RouteClassifier,
    refresh_path: String,
    refresh_lock: Mutex<()>,
    /// Finished refresh attempts, successful or not
    refresh_generation: AtomicU64,
    on_session_cleared: Option<SessionClearedHook>,
}

/// Gateway wrapper that refreshes the session on 401
#[derive(Clone)]
pub struct SessionAuthenticator {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("gateway", &self.inner.gateway)
            .field("refresh_path", &self.inner.refresh_path)
            .finish_non_exhaustive()
    }
}

impl SessionAuthenticator {
    pub fn builder(config: Config, store: TokenStore) -> SessionAuthenticatorBuilder {
        SessionAuthenticatorBuilder {
            config,
            store,
            routes: RouteClassifier::default(),
            refresh_path: REFRESH_PATH.to_string(),
            cookies: None,
            on_session_cleared: None,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    pub fn gateway(&self) -> &HttpGateway {
        &self.inner.gateway
    }

    pub fn routes(&self) -> &RouteClassifier {
        &self.inner.routes
    }

    /// Send `request`, refreshing the session at most once if it comes back 401
    pub async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let span = tracing::debug_span!(
            "api_call",
            call_id = %Uuid::new_v4(),
            method = %request.method(),
            path = %request.path(),
        );
        self.run(request).instrument(span).await
    }

    /// GET `path` and decode the body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, crate::client::ClientError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        Ok(response.json()?)
    }

    /// Send `request` and decode the body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, crate::client::ClientError> {
        let response = self.execute(request).await?;
        Ok(response.json()?)
    }

    /// Ask for a new access token outside of a failed request
    pub async fn refresh_session(&self) -> RefreshOutcome {
        let seen = self.generation();
        self.refresh_after(seen).await
    }

    fn generation(&self) -> u64 {
        self.inner.refresh_generation.load(Ordering::Acquire)
    }

    /// Clear the session and notify the hook
    pub async fn clear_session(&self) {
        self.inner.store.clear().await;
        if let Some(hook) = &self.inner.on_session_cleared {
            hook();
        }
    }

    async fn run(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let mut tracker = PhaseTracker::new();
        tracker.enter(AuthPhase::AwaitingResponse);

        let seen = self.generation();
        let sent_with = self.inner.store.access_token().await;
        let error = match self.inner.gateway.send_as(&request, sent_with.as_deref()).await {
            Ok(response) => {
                tracker.enter(AuthPhase::Idle);
                return Ok(response);
            }
            Err(error) => error,
        };

        if !error.is_unauthorized() {
            report_failure(&error);
            tracker.enter(AuthPhase::Idle);
            return Err(error);
        }

        if request.is_retry() {
            tracing::info!("Replayed request was rejected again, clearing session");
            tracker.enter(AuthPhase::Failed);
            self.clear_session().await;
            return Err(error);
        }

        if self.inner.routes.is_refresh_exempt(request.path()) {
            tracing::debug!("401 on refresh-exempt path, not refreshing");
            tracker.enter(AuthPhase::Idle);
            return Err(error);
        }

        tracker.enter(AuthPhase::Refreshing);
        let outcome = self.refresh_after(seen).await;
        if !outcome.has_token() {
            tracker.enter(AuthPhase::Failed);
            return Err(error);
        }

        tracker.enter(AuthPhase::Retrying);
        let retry = request.mark_retried();
        let token = self.inner.store.access_token().await;
        match self.inner.gateway.send_as(&retry, token.as_deref()).await {
            Ok(response) => {
                tracker.enter(AuthPhase::Idle);
                Ok(response)
            }
            Err(retry_error) if retry_error.is_unauthorized() => {
                tracing::info!("Request still unauthorized after refresh, clearing session");
                tracker.enter(AuthPhase::Failed);
                self.clear_session().await;
                Err(retry_error)
            }
            Err(retry_error) => {
                report_failure(&retry_error);
                tracker.enter(AuthPhase::Idle);
                Err(retry_error)
            }
        }
    }

    /// Refresh unless an attempt finished after generation `seen` was read
    async fn refresh_after(&self, seen: u64) -> RefreshOutcome {
        let _guard = self.inner.refresh_lock.lock().await;

        let current = self.inner.store.access_token().await;
        if self.generation() != seen {
            return match current {
                Some(_) => {
                    tracing::debug!("Session was refreshed by a concurrent call");
                    RefreshOutcome::Coalesced
                }
                None => {
                    tracing::debug!("Session was cleared by a concurrent call");
                    RefreshOutcome::Rejected
                }
            };
        }

        let outcome = self.attempt_refresh(current.as_deref()).await;
        self.inner.refresh_generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Call the refresh endpoint and apply its answer to the store
    async fn attempt_refresh(&self, current: Option<&str>) -> RefreshOutcome {
        let request = ApiRequest::post(self.inner.refresh_path.clone());
        let response = self.inner.gateway.send_as(&request, current).await;

        let refreshed = match response {
            Ok(response) => match response.json::<RefreshResponse>() {
                Ok(refreshed) => Some(refreshed),
                Err(e) => {
                    tracing::warn!("Unreadable refresh response: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::info!("Session refresh failed: {}", e);
                None
            }
        };

        match refreshed.as_ref().and_then(|r| r.usable_token().map(|token| (r, token))) {
            Some((refreshed, token)) => {
                let previous = self.inner.store.user().await;
                let user = UserSnapshot::from_refresh(refreshed, previous.as_ref());
                self.inner
                    .store
                    .set(
                        SessionUpdate::new()
                            .access_token(token)
                            .refresh_token(refreshed.refresh_token.clone())
                            .user(user),
                    )
                    .await;
                tracing::info!("Session refreshed");
                RefreshOutcome::Refreshed
            }
            None => {
                tracing::info!("Refresh returned no usable token, clearing session");
                self.clear_session().await;
                RefreshOutcome::Rejected
            }
        }
    }
}

fn report_failure(error: &ApiError) {
    if error.is_server_error() {
        tracing::error!("Server error: {}", error);
    } else {
        tracing::debug!("Request failed: {}", error);
    }
}

/// Builder for [`SessionAuthenticator`]
pub struct SessionAuthenticatorBuilder {
    config: Config,
    store: TokenStore,
    routes: RouteClassifier,
    refresh_path: String,
    cookies: Option<Arc<Jar>>,
    on_session_cleared: Option<SessionClearedHook>,
}

impl SessionAuthenticatorBuilder {
    pub fn routes(mut self, routes: RouteClassifier) -> Self {
        self.routes = routes;
        self
    }

    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Share a cookie jar with other clients
    pub fn cookie_jar(mut self, cookies: Arc<Jar>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn on_session_cleared<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_session_cleared = Some(Arc::new(hook));
        self
    }

    /// Fails only when the underlying HTTP client cannot be built
    pub fn build(self) -> ApiResult<SessionAuthenticator> {
        let routes = self.routes.with_refresh_exempt([self.refresh_path.clone()]);
        let gateway = match self.cookies {
            Some(cookies) => HttpGateway::with_cookie_jar(self.config, self.store.clone(), routes.clone(), cookies)?,
            None => HttpGateway::new(self.config, self.store.clone(), routes.clone())?,
        };

        Ok(SessionAuthenticator {
            inner: Arc::new(Inner {
                gateway,
                store: self.store,
                routes,
                refresh_path: self.refresh_path,
                refresh_lock: Mutex::new(()),
                refresh_generation: AtomicU64::new(0),
                on_session_cleared: self.on_session_cleared,
            }),
        })
    }
}
