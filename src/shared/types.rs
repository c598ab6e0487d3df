/**
 * Wire Types
 *
 * Request and response bodies of the storefront REST API. Field names follow the
 * backend contract exactly (including its mixed camelCase/snake_case), so these
 * types are only ever used at the HTTP boundary and converted into client-side
 * models straight away.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role granted to an account
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleName {
    Owner,
    Admin,
    Manager,
    Staff,
    Customer,
    /// Any role this client does not know about, kept verbatim
    Other(String),
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "OWNER" => Self::Owner,
            "ADMIN" => Self::Admin,
            "MANAGER" => Self::Manager,
            "STAFF" => Self::Staff,
            "CUSTOMER" => Self::Customer,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleName::Owner => write!(f, "OWNER"),
            RoleName::Admin => write!(f, "ADMIN"),
            RoleName::Manager => write!(f, "MANAGER"),
            RoleName::Staff => write!(f, "STAFF"),
            RoleName::Customer => write!(f, "CUSTOMER"),
            RoleName::Other(name) => write!(f, "{}", name),
        }
    }
}

/// POST /login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub mobile: String,
    pub password: String,
}

/// Body of a successful POST /login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginEnvelope {
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(rename = "quickLoginInfo")]
    pub quick_login_info: Option<QuickLoginInfo>,
    #[serde(default)]
    pub needs_confirm_otp_code: bool,
    #[serde(rename = "otpExpiresAt", default)]
    pub otp_expires_at: Option<String>,
}

/// Account and token bundle returned by login and quick registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickLoginInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub mobile: String,
    #[serde(default)]
    pub role: Vec<RoleName>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub mobile_confirmed: bool,
}

/// POST /register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub mobile: String,
    pub pass_hash: String,
    pub role: RoleName,
    #[serde(rename = "isTermAndPrivarcyEnable")]
    pub terms_accepted: bool,
}

/// Body of a successful POST /register
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub needs_confirm_otp_code: bool,
    #[serde(rename = "quickLoginEnable", default)]
    pub quick_login_enable: bool,
    #[serde(rename = "quickRegisterInfo", default)]
    pub quick_register_info: Option<QuickLoginInfo>,
    #[serde(rename = "otpExpiresAt", default)]
    pub otp_expires_at: Option<String>,
}

/// Body of POST /refresh-auth-token
///
/// Every field is optional: a response without a usable `access_token` is a
/// rejected refresh, not a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub role: Vec<RoleName>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub mobile_confirmed: Option<bool>,
}

impl RefreshResponse {
    /// The new access token, if the server minted one
    pub fn usable_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.trim().is_empty())
    }
}

/// POST /confirm-mobile-otp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOtpRequest {
    pub mobile: String,
    pub confirm_mobile_otp_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmOtpResponse {
    pub id: String,
    pub mobile: String,
    #[serde(default)]
    pub mobile_confirmed: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /resend-mobile-otp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendOtpRequest {
    pub mobile: String,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResendOtpResponse {
    pub message: String,
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<String>,
}

/// GET /my-profile
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDto {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub role: Vec<RoleName>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub mobile_confirmed: bool,
}

/// The profile endpoint answers either bare or wrapped in `data`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProfileEnvelope {
    Wrapped { data: ProfileDto },
    Bare(ProfileDto),
}

impl ProfileEnvelope {
    pub fn into_profile(self) -> ProfileDto {
        match self {
            ProfileEnvelope::Wrapped { data } => data,
            ProfileEnvelope::Bare(profile) => profile,
        }
    }
}
