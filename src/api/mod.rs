//! Authenticated client for the clinic backend.
//!
//! Every call goes through [`ApiClient::request`], which attaches the bearer
//! token of the persisted session and recovers from an expired token by
//! refreshing it once and retrying. Concurrent requests that hit a 401 while a
//! refresh is running wait for that refresh instead of starting their own.

use crate::config::ApiConfig;
use crate::domain::session::Session;
use crate::error::{ApiError, Result};
use crate::storage::{MemorySessionStore, SessionStore};
use opentelemetry::{KeyValue, global, metrics::Counter};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub mod auth;
mod refresh;
pub mod schemas;

use refresh::RefreshCoordinator;

/// Endpoints under this prefix may be called without a session.
pub const AUTH_PREFIX: &str = "/auth/";
pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh-token";

pub(crate) const API_KEY_HEADER: &str = "api_key";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fired whenever the session ends: explicit logout, a request without a
/// session, or a refresh that could not be completed.
pub trait LoginRedirect: Send + Sync + std::fmt::Debug {
    fn redirect_to_login(&self);
}

/// Default redirect for headless use: records that the user must log in again.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        tracing::warn!("Session ended, login required");
    }
}

#[derive(Clone, Debug)]
struct Metrics {
    requests_total: Counter<u64>,
    login_total: Counter<u64>,
    refresh_total: Counter<u64>,
    refresh_failures_total: Counter<u64>,
    logout_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("clinic-agenda");
        Self {
            requests_total: meter
                .u64_counter("api_requests_total")
                .with_description("Total HTTP requests sent to the clinic backend")
                .build(),
            login_total: meter.u64_counter("auth_login_total").with_description("Total successful logins").build(),
            refresh_total: meter
                .u64_counter("auth_refresh_total")
                .with_description("Total successful token refreshes")
                .build(),
            refresh_failures_total: meter
                .u64_counter("auth_refresh_failures_total")
                .with_description("Total token refreshes that ended the session")
                .build(),
            logout_total: meter.u64_counter("auth_logout_total").with_description("Total ended sessions").build(),
        }
    }
}

/// A backend call, kept as data so it can be replayed after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    endpoint: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self { method, endpoint: endpoint.into(), query: Vec::new(), body: None }
    }

    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    #[must_use]
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    #[must_use]
    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// # Errors
    /// Returns `Decode` if the body cannot be represented as JSON.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_auth_endpoint(&self) -> bool {
        self.endpoint.starts_with(AUTH_PREFIX)
    }
}

#[derive(Debug)]
pub(crate) struct ClientInner {
    http: reqwest::Client,
    config: ApiConfig,
    store: Arc<dyn SessionStore>,
    redirect: Arc<dyn LoginRedirect>,
    refresh: RefreshCoordinator,
    metrics: Metrics,
}

#[derive(Debug)]
#[must_use]
pub struct ApiClientBuilder {
    config: ApiConfig,
    store: Option<Arc<dyn SessionStore>>,
    redirect: Option<Arc<dyn LoginRedirect>>,
}

impl ApiClientBuilder {
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn login_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// # Errors
    /// - `Config` when the base URL or API key is missing.
    /// - `Transport` if the HTTP client cannot be initialized.
    pub fn build(self) -> Result<ApiClient> {
        self.config.ensure_complete()?;
        let http = reqwest::Client::builder().timeout(self.config.request_timeout()).build()?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                config: self.config,
                store: self.store.unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
                redirect: self.redirect.unwrap_or_else(|| Arc::new(LogRedirect)),
                refresh: RefreshCoordinator::default(),
                metrics: Metrics::new(),
            }),
        })
    }
}

/// Cheap to clone; clones share the session store and the refresh slot.
#[derive(Clone, Debug)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder(config: ApiConfig) -> ApiClientBuilder {
        ApiClientBuilder { config, store: None, redirect: None }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// The persisted session, if any.
    ///
    /// # Errors
    /// Returns `Storage` if the session store cannot be read.
    pub async fn session(&self) -> Result<Option<Session>> {
        self.inner.store.get().await
    }

    /// Performs `request` with the current bearer token and returns the parsed body.
    ///
    /// A 401 triggers one token refresh (shared with any other request that
    /// hits a 401 meanwhile) and a single retry. A second 401 is returned as
    /// an HTTP error.
    ///
    /// # Errors
    /// - `SessionMissing` when no session exists and the endpoint is not under `/auth/`.
    /// - `SessionExpired` when the token could not be refreshed.
    /// - `Http` for any other non-2xx response.
    #[tracing::instrument(
        skip(self, request),
        fields(
            http.method = %request.method,
            endpoint = %request.endpoint,
            request_id = tracing::field::Empty,
            status = tracing::field::Empty,
        ),
        err(level = "debug")
    )]
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let token = self.inner.current_token().await?;
        if token.is_none() && !request.is_auth_endpoint() {
            tracing::warn!("No active session");
            self.inner.end_session().await;
            return Err(ApiError::SessionMissing);
        }

        let mut response = self.inner.send(&request, token.as_deref(), &request_id).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && let Some(stale) = token.as_deref()
        {
            tracing::debug!("Access token rejected");
            let fresh = self.inner.refresh.fresh_token(&self.inner, stale).await?;
            response = self.inner.send(&request, Some(&fresh), &request_id).await?;
        }

        tracing::Span::current().record("status", response.status().as_u16());
        decode(response, &request.endpoint).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn get<T: DeserializeOwned>(&self, endpoint: impl Into<String>) -> Result<T> {
        self.request(ApiRequest::get(endpoint)).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn post<T, B>(&self, endpoint: impl Into<String>, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::post(endpoint).with_json(body)?).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn put<T, B>(&self, endpoint: impl Into<String>, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::put(endpoint).with_json(body)?).await
    }
}

impl ClientInner {
    /// Token of the persisted session; an empty token counts as no session.
    async fn current_token(&self) -> Result<Option<String>> {
        Ok(self.store.get().await?.map(|s| s.data.token).filter(|t| !t.is_empty()))
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        Url::parse(&self.config.url(endpoint)).map_err(|e| ApiError::Config(format!("invalid API URL: {e}")))
    }

    async fn send(&self, request: &ApiRequest, token: Option<&str>, request_id: &str) -> Result<reqwest::Response> {
        let mut url = self.url(&request.endpoint)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        let mut builder = self.http.request(request.method.clone(), url).header(REQUEST_ID_HEADER, request_id);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        self.metrics.requests_total.add(1, &[KeyValue::new("http.method", request.method.to_string())]);
        Ok(builder.send().await?)
    }

    /// Clears the persisted session and sends the user back to login.
    async fn end_session(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::error!(error = %e, "Failed to clear session");
        }
        self.metrics.logout_total.add(1, &[]);
        self.redirect.redirect_to_login();
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, endpoint: &str) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let err = ApiError::from_response(status, &body);
        tracing::error!(endpoint, status = status.as_u16(), error = %err, "Request failed");
        return Err(err);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(&body)?)
}
