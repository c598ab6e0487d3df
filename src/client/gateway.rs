/**
 * HTTP Request Gateway
 *
 * Sends requests to the configured API origin. The gateway attaches the bearer
 * token held by the token store, always sends cookies (the refresh token lives in
 * an HTTP-only cookie) and hands back the response as-is: 2xx as `ApiResponse`,
 * anything else as `ApiError::Status`. It never retries and never reacts to a
 * status code; that is the authenticator's job.
 */

use crate::client::config::Config;
use crate::client::error::{ApiError, ApiResult};
use crate::client::routes::RouteClassifier;
use crate::client::token_store::TokenStore;
use crate::shared::SharedError;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// An outbound API request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, SharedError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Mark the request as already replayed after a refresh
    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path as given, query string included
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn is_retry(&self) -> bool {
        self.retried
    }
}

/// A successful (2xx) API response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SharedError> {
        Ok(T::deserialize(&self.body)?)
    }
}

/// Issues requests against the API origin
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: Config,
    store: TokenStore,
    routes: RouteClassifier,
    cookies: Arc<Jar>,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("origin", &self.config.api_origin())
            .field("namespace", &self.config.namespace())
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    pub fn new(config: Config, store: TokenStore, routes: RouteClassifier) -> ApiResult<Self> {
        Self::with_cookie_jar(config, store, routes, Arc::new(Jar::default()))
    }

    /// Build a gateway sharing an existing cookie jar
    ///
    /// Fails when the HTTP client cannot be initialised (TLS backend, resolver).
    pub fn with_cookie_jar(
        config: Config,
        store: TokenStore,
        routes: RouteClassifier,
        cookies: Arc<Jar>,
    ) -> ApiResult<Self> {
        let mut builder = Client::builder().cookie_provider(cookies.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            store,
            routes,
            cookies,
        })
    }

    /// Send with the store's current access token, if any
    pub async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let token = self.store.access_token().await;
        self.send_as(request, token.as_deref()).await
    }

    /// Send with an explicit bearer token
    pub(crate) async fn send_as(&self, request: &ApiRequest, token: Option<&str>) -> ApiResult<ApiResponse> {
        let url = self
            .config
            .api_url(request.path(), self.routes.is_namespace_exempt(request.path()));

        let mut builder = self.client.request(request.method().clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        tracing::trace!(method = %request.method(), %url, authorized = token.is_some(), "Sending request");

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response body: {}", e)))?;
        let body = decode_body(text);

        if status.is_success() {
            Ok(ApiResponse { status, body })
        } else {
            Err(ApiError::status(status, body))
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes(&self) -> &RouteClassifier {
        &self.routes
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The jar holding cookies set by the API (the refresh token among them)
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.cookies.clone()
    }
}

fn decode_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
