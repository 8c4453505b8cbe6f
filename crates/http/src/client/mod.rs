//! Portal API client

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod refresh;
pub mod requests;

use crate::types::{ApiErrorBody, RefreshResponse, SessionTokenRequest};
use config::ClientConfig;
use error::{ClientError, RefreshFailure};
use events::{AuthEvent, AuthEvents};
use portal_core::identity::native_user_agent;
use portal_core::{ClientIdentityStore, KeyValueStore, MemoryStore, TokenStore};
use refresh::{RefreshCoordinator, RefreshOutcome};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh-token";
pub const PROFILE_PATH: &str = "/api/v1/profile";
pub const PENDING_REQUESTS_PATH: &str = "/api/v1/upgrade-request/get-by-status/pending/";

/// A request to the dashboard API, replayable after a token refresh
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    refreshable: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            refreshable: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Pass a 401 straight to the caller instead of refreshing
    #[must_use]
    pub const fn without_refresh(mut self) -> Self {
        self.refreshable = false;
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The refresh endpoint never refreshes itself
    pub fn is_refreshable(&self) -> bool {
        self.refreshable && self.path != REFRESH_PATH
    }
}

/// Portal API client
///
/// Clones share the token storage, the refresh coordinator and the event
/// channel, so at most one refresh is in flight across all of them.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
    identity: ClientIdentityStore,
    refresh: Arc<RefreshCoordinator>,
    events: AuthEvents,
}

impl ApiClient {
    /// Create a new client with in-memory storage
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub const fn identity(&self) -> &ClientIdentityStore {
        &self.identity
    }

    pub const fn events(&self) -> &AuthEvents {
        &self.events
    }

    /// Whether a token refresh is currently running
    pub fn refresh_in_flight(&self) -> bool {
        self.refresh.is_refreshing()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, refreshing the access token once on a 401
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let sent_with = self.tokens.access_token()?;
        let response = self.dispatch(request, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.is_refreshable() {
            return Ok(response);
        }

        // Another request may have refreshed while this one was in flight
        let token = match self.tokens.access_token()? {
            Some(current) if sent_with.as_deref() != Some(current.as_str()) => {
                debug!(path = %request.path, "Access token changed since send, retrying");
                current
            }
            _ => self.refreshed_access_token().await?,
        };

        debug!(path = %request.path, "Retrying request with refreshed token");
        self.dispatch(request, Some(&token)).await
    }

    /// Execute a request and decode the JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Execute a request whose response body is ignored
    pub async fn execute_empty(&self, request: &ApiRequest) -> Result<(), ClientError> {
        let response = self.send(request).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, path = %request.path, "Sending request");
        Ok(builder.send().await?)
    }

    async fn refreshed_access_token(&self) -> Result<String, ClientError> {
        self.refresh
            .refreshed_token(|| self.refresh_tokens())
            .await
            .map_err(ClientError::from)
    }

    /// Runs only on the request that won the refresh; waiters share the outcome
    async fn refresh_tokens(&self) -> RefreshOutcome {
        let outcome = self.request_new_tokens().await;
        match &outcome {
            Ok(_) => {
                info!("Access token refreshed");
                self.events.emit(AuthEvent::TokensRefreshed);
            }
            Err(failure) => {
                warn!(%failure, "Token refresh failed, signing out");
                self.end_session();
            }
        }
        outcome
    }

    async fn request_new_tokens(&self) -> RefreshOutcome {
        let storage = |e: portal_core::CoreError| RefreshFailure::Storage(e.to_string());

        let refresh_token = self
            .tokens
            .refresh_token()
            .map_err(storage)?
            .ok_or(RefreshFailure::MissingRefreshToken)?;
        let client_id = self.identity.get_client_id().map_err(storage)?;

        let response = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&SessionTokenRequest {
                refresh_token: &refresh_token,
                client_id: &client_id,
            })
            .send()
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(RefreshFailure::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))?;
        self.tokens.save(&body.token).map_err(storage)?;
        Ok(body.token.access_token)
    }

    /// Drop the stored tokens and tell listeners a new login is needed
    pub(crate) fn end_session(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!("Failed to clear stored tokens: {e}");
        }
        self.events.emit(AuthEvent::LoginRequired);
    }
}

/// Prefer the backend's `message` field over the raw body
async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(text) => serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| if text.is_empty() { status.to_string() } else { text }),
        Err(_) => status.to_string(),
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    ClientError::from_status(status, error_message(response).await)
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    storage: Option<Arc<dyn KeyValueStore>>,
}

impl ApiClientBuilder {
    /// Apply connection settings
    #[must_use]
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.base_url = Some(config.base_url.clone());
        self.timeout = Some(config.timeout());
        if let Some(agent) = &config.user_agent {
            self.user_agent = Some(agent.clone());
        }
        self
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Where tokens and the client identity are persisted
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let config = ClientConfig {
            base_url: self
                .base_url
                .unwrap_or_else(|| config::DEFAULT_BASE_URL.to_string()),
            timeout_secs: self
                .timeout
                .map_or(config::DEFAULT_TIMEOUT_SECS, |t| t.as_secs().max(1)),
            user_agent: self.user_agent,
        };
        config.validate()?;

        // Ensure base_url ends without a trailing slash
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let user_agent = config.user_agent.unwrap_or_else(native_user_agent);

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = ClientBuilder::new()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(config.timeout_secs)))
            .user_agent(user_agent.clone())
            .default_headers(headers)
            .build()?;

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        Ok(ApiClient {
            client,
            base_url,
            tokens: TokenStore::new(storage.clone()),
            identity: ClientIdentityStore::new(storage, user_agent),
            refresh: Arc::new(RefreshCoordinator::default()),
            events: AuthEvents::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_endpoint_is_never_refreshable() {
        assert!(ApiRequest::get(PROFILE_PATH).is_refreshable());
        assert!(!ApiRequest::post(REFRESH_PATH).is_refreshable());
        assert!(!ApiRequest::post(LOGIN_PATH).without_refresh().is_refreshable());
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.url(PROFILE_PATH), "http://localhost:3000/api/v1/profile");
    }

    #[test]
    fn test_builder_rejects_invalid_url() {
        let result = ApiClient::builder().base_url("localhost").build();
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_clones_share_storage() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let clone = client.clone();
        client
            .tokens()
            .save(&portal_core::TokenPair::new("a", "r"))
            .unwrap();
        assert_eq!(clone.tokens().access_token().unwrap().as_deref(), Some("a"));
    }
}
