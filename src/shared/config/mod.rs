//! Application configuration module
//!
//! Provides the build/runtime configuration consumed when requests are constructed:
//! which API origin to talk to (local or live), an optional path namespace, an
//! optional request timeout and where the session database lives.
//!
//! Sources are layered: defaults, then an optional TOML file, then `STOREFRONT_*`
//! environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default origin for local development
pub const DEFAULT_LOCAL_API_URL: &str = "http://127.0.0.1:4000";

/// Which backend the client targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    #[default]
    Local,
    Live,
}

impl FromStr for ApiMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "development" | "dev" => Ok(Self::Local),
            "live" | "production" | "prod" => Ok(Self::Live),
            other => Err(ConfigError::InvalidValue {
                key: "mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Selected backend
    pub mode: ApiMode,
    /// Origin used in local mode
    pub local_api_url: Option<String>,
    /// Origin used in live mode
    pub live_api_url: Option<String>,
    /// Path prefix inserted between the origin and request paths (e.g. `/auth`)
    pub namespace: Option<String>,
    /// Per-request timeout; reqwest defaults apply when unset
    pub request_timeout_secs: Option<u64>,
    /// Directory holding the session database
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Overlay `STOREFRONT_*` environment variables on top of this configuration
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(mode) = std::env::var("STOREFRONT_API_MODE") {
            self.mode = mode.parse()?;
        }
        if let Ok(url) = std::env::var("STOREFRONT_LOCAL_API_URL") {
            self.local_api_url = Some(url);
        }
        if let Ok(url) = std::env::var("STOREFRONT_LIVE_API_URL") {
            self.live_api_url = Some(url);
        }
        if let Ok(namespace) = std::env::var("STOREFRONT_API_NAMESPACE") {
            self.namespace = Some(namespace).filter(|ns| !ns.is_empty());
        }
        if let Ok(timeout) = std::env::var("STOREFRONT_REQUEST_TIMEOUT_SECS") {
            let secs = timeout.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "request_timeout_secs",
                value: timeout.clone(),
            })?;
            self.request_timeout_secs = Some(secs);
        }
        if let Ok(dir) = std::env::var("STOREFRONT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        Ok(self)
    }

    /// The origin selected by `mode`
    pub fn api_origin(&self) -> Result<&str, ConfigError> {
        match self.mode {
            ApiMode::Local => Ok(self.local_api_url.as_deref().unwrap_or(DEFAULT_LOCAL_API_URL)),
            ApiMode::Live => self
                .live_api_url
                .as_deref()
                .ok_or(ConfigError::MissingValue("live_api_url")),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.local_api_url, &self.live_api_url].into_iter().flatten() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        self.api_origin()?;
        if let Some(namespace) = &self.namespace {
            if !namespace.starts_with('/') || namespace.ends_with('/') {
                return Err(ConfigError::InvalidValue {
                    key: "namespace",
                    value: namespace.clone(),
                });
            }
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Select local or live mode
    pub fn mode(mut self, mode: ApiMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the local origin
    pub fn local_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.local_api_url = Some(url.into());
        self
    }

    /// Set the live origin
    pub fn live_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.live_api_url = Some(url.into());
        self
    }

    /// Set the path namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            local_api_url: self.config.local_api_url.map(trim_trailing_slash),
            live_api_url: self.config.live_api_url.map(trim_trailing_slash),
            ..self.config
        };
        config.validate()?;
        Ok(config)
    }
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
