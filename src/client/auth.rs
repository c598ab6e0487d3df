/**
 * Auth API
 *
 * Login, registration, OTP confirmation and profile calls on top of the
 * session authenticator. Responses are decoded into outcome enums here, so
 * callers never inspect raw payload flags.
 */

use crate::client::authenticator::SessionAuthenticator;
use crate::client::error::ClientError;
use crate::client::gateway::ApiRequest;
use crate::client::routes::{CONFIRM_OTP_PATH, LOGIN_PATH, PROFILE_PATH, REGISTER_PATH, RESEND_OTP_PATH};
use crate::client::session::{SessionUpdate, UserSnapshot};
use crate::client::token_store::TokenStore;
use crate::shared::types::{
    ConfirmOtpRequest, ConfirmOtpResponse, LoginEnvelope, LoginRequest, ProfileEnvelope, QuickLoginInfo,
    RegisterRequest, RegisterResponse, ResendOtpRequest, ResendOtpResponse,
};
use crate::shared::SharedError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::future::Future;

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Tokens stored, mobile number confirmed
    Authenticated(UserSnapshot),
    /// Tokens stored, but the account must confirm an OTP first
    NeedsOtp {
        user: UserSnapshot,
        expires_at: Option<DateTime<Utc>>,
    },
}

impl LoginOutcome {
    pub fn user(&self) -> &UserSnapshot {
        match self {
            LoginOutcome::Authenticated(user) => user,
            LoginOutcome::NeedsOtp { user, .. } => user,
        }
    }
}

/// Result of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Account created; an OTP was sent to the mobile number
    NeedsOtp { expires_at: Option<DateTime<Utc>> },
    /// Account created and signed in straight away
    QuickLogin(UserSnapshot),
    /// Account created; sign in separately
    Registered,
}

/// Result of asking for a new OTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpResent {
    pub message: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Auth endpoints bound to one session
#[derive(Debug, Clone)]
pub struct AuthApi {
    auth: SessionAuthenticator,
}

impl AuthApi {
    pub fn new(auth: SessionAuthenticator) -> Self {
        Self { auth }
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.auth
    }

    pub fn store(&self) -> &TokenStore {
        self.auth.store()
    }

    /// Sign in with mobile number and password
    pub async fn login(&self, mobile: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        self.tracked(async {
            require("mobile", mobile, "Mobile number is required")?;
            require("password", password, "Password is required")?;

            let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
                mobile: mobile.trim().to_string(),
                password: password.to_string(),
            })?;
            let envelope: LoginEnvelope = self.auth.send_json(request).await?;

            let data = envelope
                .data
                .ok_or_else(|| SharedError::malformed(LOGIN_PATH, "missing data"))?;
            let info = data
                .quick_login_info
                .ok_or_else(|| SharedError::malformed(LOGIN_PATH, "missing quickLoginInfo"))?;
            let user = self.store_quick_login(LOGIN_PATH, &info).await?;

            tracing::info!(user_id = %user.id, needs_otp = data.needs_confirm_otp_code, "Logged in");

            if data.needs_confirm_otp_code {
                Ok(LoginOutcome::NeedsOtp {
                    user,
                    expires_at: parse_expiry(data.otp_expires_at.as_deref()),
                })
            } else {
                Ok(LoginOutcome::Authenticated(user))
            }
        })
        .await
    }

    /// Create an account
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisterOutcome, ClientError> {
        self.tracked(async {
            require("name", &request.name, "Name is required")?;
            require("mobile", &request.mobile, "Mobile number is required")?;
            require("pass_hash", &request.pass_hash, "Password is required")?;
            if !request.terms_accepted {
                return Err(SharedError::validation(
                    "isTermAndPrivarcyEnable",
                    "Terms and privacy policy must be accepted",
                )
                .into());
            }

            let response: RegisterResponse = self
                .auth
                .send_json(ApiRequest::post(REGISTER_PATH).json(&request)?)
                .await?;

            if response.quick_login_enable {
                let info = response
                    .quick_register_info
                    .ok_or_else(|| SharedError::malformed(REGISTER_PATH, "missing quickRegisterInfo"))?;
                let user = self.store_quick_login(REGISTER_PATH, &info).await?;
                tracing::info!(user_id = %user.id, "Registered with quick login");
                return Ok(RegisterOutcome::QuickLogin(user));
            }

            if response.needs_confirm_otp_code {
                tracing::info!("Registered, OTP confirmation pending");
                return Ok(RegisterOutcome::NeedsOtp {
                    expires_at: parse_expiry(response.otp_expires_at.as_deref()),
                });
            }

            Ok(RegisterOutcome::Registered)
        })
        .await
    }

    /// Confirm the mobile number with the OTP sent to it
    pub async fn confirm_otp(&self, mobile: &str, code: &str) -> Result<UserSnapshot, ClientError> {
        self.tracked(async {
            require("mobile", mobile, "Mobile number is required")?;
            require("confirm_mobile_otp_code", code, "OTP code is required")?;

            let request = ApiRequest::post(CONFIRM_OTP_PATH).json(&ConfirmOtpRequest {
                mobile: mobile.trim().to_string(),
                confirm_mobile_otp_code: code.trim().to_string(),
            })?;
            let response: ConfirmOtpResponse = self.auth.send_json(request).await?;

            self.store()
                .update_user(|user| {
                    if user.id == response.id {
                        user.confirm_mobile(&response);
                    }
                })
                .await;

            let user = match self.store().user().await {
                Some(user) if user.id == response.id => user,
                _ => UserSnapshot {
                    id: response.id.clone(),
                    display_name: None,
                    mobile_number: Some(response.mobile.clone()),
                    roles: BTreeSet::new(),
                    permissions: Vec::new(),
                    mobile_confirmed: response.mobile_confirmed,
                },
            };
            tracing::info!(user_id = %user.id, confirmed = user.mobile_confirmed, "OTP confirmed");
            Ok(user)
        })
        .await
    }

    /// Ask the server to send a new OTP
    pub async fn resend_otp(&self, mobile: &str, user_id: Option<&str>) -> Result<OtpResent, ClientError> {
        self.tracked(async {
            require("mobile", mobile, "Mobile number is required")?;

            let request = ApiRequest::post(RESEND_OTP_PATH).json(&ResendOtpRequest {
                mobile: mobile.trim().to_string(),
                user_id: user_id.map(str::to_string),
            })?;
            let response: ResendOtpResponse = self.auth.send_json(request).await?;

            Ok(OtpResent {
                expires_at: parse_expiry(response.expires_at.as_deref()),
                message: response.message,
            })
        })
        .await
    }

    /// Load the signed-in user's profile and store it
    pub async fn fetch_profile(&self) -> Result<UserSnapshot, ClientError> {
        self.tracked(async {
            let envelope: ProfileEnvelope = self.auth.get_json(PROFILE_PATH).await?;
            let user = UserSnapshot::from(envelope.into_profile());
            self.store().set(SessionUpdate::new().user(Some(user.clone()))).await;
            Ok(user)
        })
        .await
    }

    /// Try to get a fresh access token; false means the session is gone
    pub async fn refresh_session(&self) -> bool {
        self.auth.refresh_session().await.has_token()
    }

    pub async fn logout(&self) {
        self.auth.clear_session().await;
        tracing::info!("Logged out");
    }

    async fn store_quick_login(&self, endpoint: &str, info: &QuickLoginInfo) -> Result<UserSnapshot, ClientError> {
        let has_token = info
            .access_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());
        if !has_token {
            return Err(SharedError::malformed(endpoint, "missing access_token").into());
        }

        self.store().set(SessionUpdate::from_quick_login(info)).await;
        Ok(UserSnapshot::from(info))
    }

    /// Run `call` with the loading flag raised, recording its error message
    async fn tracked<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let store = self.store();
        store.set_loading(true).await;
        let result = call.await;
        store.set_loading(false).await;

        match &result {
            Ok(_) => store.set_error(None).await,
            Err(e) => store.set_error(Some(e.user_message())).await,
        }
        result
    }
}

fn require(field: &str, value: &str, message: &str) -> Result<(), SharedError> {
    if value.trim().is_empty() {
        return Err(SharedError::validation(field, message));
    }
    Ok(())
}

/// Parse an RFC 3339 expiry, dropping anything unreadable
fn parse_expiry(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(expires_at) => Some(expires_at.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(raw, "Ignoring unreadable OTP expiry: {}", e);
            None
        }
    }
}
