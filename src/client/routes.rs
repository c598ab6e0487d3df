//! Route Classifier
//!
//! Static path sets deciding, per request path, whether a 401 may trigger a
//! session refresh and whether the path skips the configured namespace prefix.
//! Matching is exact on the path portion: query string and fragment are
//! stripped, and an absolute URL is reduced to its path first.

use std::collections::HashSet;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const REFRESH_PATH: &str = "/refresh-auth-token";
pub const CONFIRM_OTP_PATH: &str = "/confirm-mobile-otp";
pub const RESEND_OTP_PATH: &str = "/resend-mobile-otp";
pub const PROFILE_PATH: &str = "/my-profile";

/// Customer OTP-first bootstrap endpoints
pub const CUSTOMER_REQUEST_OTP_PATH: &str = "/customer/request-otp";
pub const CUSTOMER_VERIFY_OTP_PATH: &str = "/customer/verify-otp";

#[derive(Debug, Clone)]
pub struct RouteClassifier {
    refresh_exempt: HashSet<String>,
    namespace_exempt: HashSet<String>,
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self {
            refresh_exempt: [
                LOGIN_PATH,
                REGISTER_PATH,
                REFRESH_PATH,
                CUSTOMER_REQUEST_OTP_PATH,
                CUSTOMER_VERIFY_OTP_PATH,
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            namespace_exempt: [
                LOGIN_PATH,
                REGISTER_PATH,
                REFRESH_PATH,
                CONFIRM_OTP_PATH,
                RESEND_OTP_PATH,
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl RouteClassifier {
    /// Classifier with no exempt paths at all
    pub fn empty() -> Self {
        Self {
            refresh_exempt: HashSet::new(),
            namespace_exempt: HashSet::new(),
        }
    }

    pub fn with_refresh_exempt<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refresh_exempt
            .extend(paths.into_iter().map(|p| strip_to_path(&p.into()).to_string()));
        self
    }

    pub fn with_namespace_exempt<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespace_exempt
            .extend(paths.into_iter().map(|p| strip_to_path(&p.into()).to_string()));
        self
    }

    /// A 401 on this path must never start a refresh
    pub fn is_refresh_exempt(&self, path: &str) -> bool {
        self.refresh_exempt.contains(strip_to_path(path))
    }

    /// This path is sent to the bare origin, skipping the namespace prefix
    pub fn is_namespace_exempt(&self, path: &str) -> bool {
        self.namespace_exempt.contains(strip_to_path(path))
    }
}

/// Reduce a request target to its path portion
pub fn strip_to_path(target: &str) -> &str {
    let without_origin = match target.find("://") {
        Some(scheme_end) => {
            let rest = &target[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => &rest[path_start..],
                None => "/",
            }
        }
        None => target,
    };
    let end = without_origin
        .find(|c| c == '?' || c == '#')
        .unwrap_or(without_origin.len());
    &without_origin[..end]
}
