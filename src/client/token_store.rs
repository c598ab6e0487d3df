//! Token Store
//!
//! Holds the current session (access token, refresh token, user) and mirrors the
//! persistable part of it into [`SessionStorage`]. The store is an explicitly
//! injected handle: clones share one session, and nothing about it is global.
//!
//! Storage writes are fire-and-forget. A failing write is logged and the
//! in-memory session stays authoritative.

use crate::client::session::{Session, SessionUpdate, UserProjection, UserSnapshot};
use crate::client::storage::{SessionStorage, ACCESS_TOKEN_KEY, USER_KEY};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the session
#[derive(Clone)]
pub struct TokenStore {
    session: Arc<RwLock<Session>>,
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Create a store with an empty session
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::default())),
            storage,
        }
    }

    /// Create a store initialized from whatever `storage` holds
    pub async fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let mut session = Session::default();

        match storage.read(ACCESS_TOKEN_KEY).await {
            Ok(token) => session.access_token = token,
            Err(e) => tracing::warn!("Failed to read persisted access token: {}", e),
        }

        match storage.read(USER_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<UserProjection>(&raw) {
                Ok(projection) => session.user = Some(UserSnapshot::from(projection)),
                Err(e) => tracing::warn!("Ignoring unreadable persisted user: {}", e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read persisted user: {}", e),
        }

        tracing::debug!(
            authenticated = session.is_authenticated(),
            "Session restored from storage"
        );

        Self {
            session: Arc::new(RwLock::new(session)),
            storage,
        }
    }

    /// Snapshot of the current session
    pub async fn get(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.access_token.clone()
    }

    pub async fn user(&self) -> Option<UserSnapshot> {
        self.session.read().await.user.clone()
    }

    /// Merge `update` into the session and persist the access token and user projection
    ///
    /// The write lock is held until storage has been updated, so `set` and
    /// [`clear`](Self::clear) never leave memory and storage disagreeing.
    pub async fn set(&self, update: SessionUpdate) {
        let mut session = self.session.write().await;
        session.apply(update);
        self.persist_session(&session).await;
    }

    /// Replace the stored user, leaving tokens alone
    pub async fn update_user<F>(&self, apply: F)
    where
        F: FnOnce(&mut UserSnapshot),
    {
        let mut session = self.session.write().await;
        match session.user.as_mut() {
            Some(user) => apply(user),
            None => return,
        }
        self.persist_session(&session).await;
    }

    /// Drop the whole session and every persisted key
    pub async fn clear(&self) {
        let mut session = self.session.write().await;
        *session = Session::default();

        for key in [ACCESS_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::warn!(key, "Failed to remove persisted session key: {}", e);
            }
        }
    }

    pub async fn set_loading(&self, loading: bool) {
        self.session.write().await.is_loading = loading;
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.session.write().await.last_error = error;
    }

    async fn persist_session(&self, session: &Session) {
        if let Some(token) = &session.access_token {
            self.persist(ACCESS_TOKEN_KEY, token).await;
        }
        if let Some(user) = &session.user {
            match serde_json::to_string(&UserProjection::from(user)) {
                Ok(json) => self.persist(USER_KEY, &json).await,
                Err(e) => tracing::warn!("Failed to encode user projection: {}", e),
            }
        }
    }

    async fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.write(key, value).await {
            tracing::warn!(key, "Failed to persist session key: {}", e);
        }
    }
}
