/**
 * Session Model
 *
 * The client-side view of an authenticated session and the user it belongs to.
 * A `UserSnapshot` is only ever derived from a decoded server response or from
 * the persisted projection written by the token store.
 */

use crate::shared::types::{ConfirmOtpResponse, ProfileDto, QuickLoginInfo, RefreshResponse};
use crate::shared::RoleName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub id: String,
    pub display_name: Option<String>,
    pub mobile_number: Option<String>,
    pub roles: BTreeSet<RoleName>,
    pub permissions: Vec<String>,
    pub mobile_confirmed: bool,
}

impl UserSnapshot {
    pub fn has_role(&self, role: &RoleName) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Build the user carried by a refresh response
    ///
    /// Returns `None` when the response has no `id`. Fields the response omits
    /// are taken from `previous` when it is the same user.
    pub fn from_refresh(response: &RefreshResponse, previous: Option<&UserSnapshot>) -> Option<Self> {
        let id = response.id.clone()?;
        let previous = previous.filter(|user| user.id == id);
        Some(Self {
            display_name: response
                .name
                .clone()
                .or_else(|| previous.and_then(|user| user.display_name.clone())),
            mobile_number: response
                .mobile
                .clone()
                .or_else(|| previous.and_then(|user| user.mobile_number.clone())),
            roles: response.role.iter().cloned().collect(),
            permissions: response.permissions.clone(),
            mobile_confirmed: response
                .mobile_confirmed
                .or_else(|| previous.map(|user| user.mobile_confirmed))
                .unwrap_or(false),
            id,
        })
    }

    /// Apply the result of an OTP confirmation
    pub fn confirm_mobile(&mut self, response: &ConfirmOtpResponse) {
        self.mobile_number = Some(response.mobile.clone());
        self.mobile_confirmed = response.mobile_confirmed;
    }
}

impl From<&QuickLoginInfo> for UserSnapshot {
    fn from(info: &QuickLoginInfo) -> Self {
        Self {
            id: info.id.clone(),
            display_name: info.name.clone(),
            mobile_number: Some(info.mobile.clone()),
            roles: info.role.iter().cloned().collect(),
            permissions: info.permissions.clone(),
            mobile_confirmed: info.mobile_confirmed,
        }
    }
}

impl From<ProfileDto> for UserSnapshot {
    fn from(profile: ProfileDto) -> Self {
        Self {
            id: profile.id,
            display_name: profile.name,
            mobile_number: profile.mobile,
            roles: profile.role.into_iter().collect(),
            permissions: profile.permissions,
            mobile_confirmed: profile.mobile_confirmed,
        }
    }
}

/// The subset of a user that is written to durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProjection {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Vec<RoleName>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub mobile_confirmed: bool,
}

impl From<&UserSnapshot> for UserProjection {
    fn from(user: &UserSnapshot) -> Self {
        Self {
            id: user.id.clone(),
            name: user.display_name.clone(),
            role: user.roles.iter().cloned().collect(),
            permissions: user.permissions.clone(),
            mobile_confirmed: user.mobile_confirmed,
        }
    }
}

impl From<UserProjection> for UserSnapshot {
    fn from(projection: UserProjection) -> Self {
        Self {
            id: projection.id,
            display_name: projection.name,
            mobile_number: None,
            roles: projection.role.into_iter().collect(),
            permissions: projection.permissions,
            mobile_confirmed: projection.mobile_confirmed,
        }
    }
}

/// Session state held by the token store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserSnapshot>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Merge an update: `Some` fields replace, `None` fields are kept
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(token) = update.access_token {
            self.access_token = Some(token);
        }
        if let Some(token) = update.refresh_token {
            self.refresh_token = Some(token);
        }
        if let Some(user) = update.user {
            self.user = Some(user);
        }
    }
}

/// Partial session written by login, refresh and profile calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserSnapshot>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_token(mut self, token: Option<String>) -> Self {
        self.refresh_token = token;
        self
    }

    pub fn user(mut self, user: Option<UserSnapshot>) -> Self {
        self.user = user;
        self
    }

    /// Tokens and user from a login or quick-registration bundle
    pub fn from_quick_login(info: &QuickLoginInfo) -> Self {
        Self {
            access_token: info.access_token.clone(),
            refresh_token: info.refresh_token.clone(),
            user: Some(UserSnapshot::from(info)),
        }
    }
}
