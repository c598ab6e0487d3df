use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::PathBuf;
use std::time::Duration;

/// File name of the session database inside the data directory
const SESSION_DB_FILE: &str = "session.db";

/// Client configuration wrapper.
///
/// The API origin is resolved once, when the configuration is built; requests
/// never switch origin at runtime.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    origin: String,
}

impl Default for Config {
    fn default() -> Self {
        let app = AppConfig::default();
        let origin = crate::shared::config::DEFAULT_LOCAL_API_URL.to_string();
        Self { app, origin }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Self::from_app(builder.build()?)
    }

    pub fn from_app(app: AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;
        let origin = app.api_origin()?.trim_end_matches('/').to_string();
        Ok(Self { app, origin })
    }

    /// Load from `STOREFRONT_CONFIG` (when set) and overlay the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let app = match std::env::var("STOREFRONT_CONFIG") {
            Ok(path) => AppConfig::load_file(path)?,
            Err(_) => AppConfig::default(),
        };
        Self::from_app(app.apply_env()?)
    }

    /// Local-mode configuration pointed at an explicit origin
    pub fn for_origin(origin: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_builder(AppConfig::builder().local_api_url(origin))
    }

    /// Get the full URL for an API endpoint
    ///
    /// Paths go under the configured namespace unless `bypass_namespace` is set.
    pub fn api_url(&self, path: &str, bypass_namespace: bool) -> String {
        match self.namespace() {
            Some(namespace) if !bypass_namespace => format!("{}{}{}", self.origin, namespace, path),
            _ => format!("{}{}", self.origin, path),
        }
    }

    pub fn api_origin(&self) -> &str {
        &self.origin
    }

    pub fn namespace(&self) -> Option<&str> {
        self.app.namespace.as_deref()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.app.request_timeout_secs.map(Duration::from_secs)
    }

    /// Location of the session database
    pub fn session_db_path(&self) -> PathBuf {
        let mut path = self
            .app
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("storefront")))
            .unwrap_or_else(|| std::env::temp_dir().join("storefront"));
        path.push(SESSION_DB_FILE);
        path
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }
}
