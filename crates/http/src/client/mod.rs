//! Kuteera HTTP client

pub mod auth;
pub mod error;
pub mod registration;

use error::ClientError;
use kuteera_core::{ApiConfig, KeyValueStore, keys};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, ClientBuilder, Method, Request, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Kuteera API client
///
/// Every request carries the cookie jar. Backend requests also carry the
/// stored access token unless the caller already set `Authorization`.
#[derive(Clone)]
pub struct KuteeraClient {
    client: Client,
    base_url: String,
    backend_prefix: String,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for KuteeraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KuteeraClient")
            .field("base_url", &self.base_url)
            .field("backend_prefix", &self.backend_prefix)
            .finish_non_exhaustive()
    }
}

impl KuteeraClient {
    /// Create a new client builder
    pub fn builder() -> KuteeraClientBuilder {
        KuteeraClientBuilder::default()
    }

    /// Create a client from loaded configuration
    pub fn from_config(
        config: &ApiConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let mut builder = Self::builder()
            .base_url(&config.base_url)
            .backend_prefix(&config.backend_prefix)
            .user_agent(&config.user_agent)
            .store(store);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the token store shared with this client
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn backend_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.backend_prefix, path)
    }

    /// Request builder for a backend endpoint (`<base><prefix><path>`)
    pub fn backend(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.backend_url(path))
    }

    /// Request builder for a site-relative endpoint (`<base><path>`)
    pub fn site(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    fn stored(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(key, "Failed to read token store: {err}");
                None
            }
        }
    }

    /// Access token currently persisted, if any
    pub fn access_token(&self) -> Option<String> {
        self.stored(keys::ACCESS_TOKEN)
    }

    /// Refresh token currently persisted, if any
    pub fn refresh_token(&self) -> Option<String> {
        self.stored(keys::REFRESH_TOKEN)
    }

    fn set_bearer(request: &mut Request, token: &str) -> Result<(), ClientError> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(header::AUTHORIZATION, value);
        Ok(())
    }

    /// Send a request, attaching the bearer token and retrying once after a
    /// silent refresh when the backend answers `401`.
    ///
    /// If the refresh fails the original `401` response is returned untouched.
    /// The replayed request never triggers a second refresh.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let mut request = request.build()?;

        if !request.headers().contains_key(header::CONTENT_TYPE) {
            request.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let caller_authorized = request.headers().contains_key(header::AUTHORIZATION);
        if !caller_authorized && let Some(token) = self.access_token() {
            Self::set_bearer(&mut request, &token)?;
        }

        let replay = request.try_clone();
        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.client.execute(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(mut replay) = replay else {
            debug!("Request body cannot be replayed, returning 401");
            return Ok(response);
        };

        match self.refresh_access_token().await {
            Ok(token) => {
                if !caller_authorized {
                    Self::set_bearer(&mut replay, &token)?;
                }
                debug!(url = %replay.url(), "Replaying request after refresh");
                Ok(self.client.execute(replay).await?)
            }
            Err(err) => {
                warn!("Silent refresh failed: {err}");
                Ok(response)
            }
        }
    }

    /// Execute a request and decode a JSON body, mapping error statuses
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
        response: Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }
}

/// Builder for `KuteeraClient`
#[derive(Default)]
pub struct KuteeraClientBuilder {
    base_url: Option<String>,
    backend_prefix: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl KuteeraClientBuilder {
    /// Set the site origin
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the prefix the backend API is mounted under
    pub fn backend_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.backend_prefix = Some(prefix.into());
        self
    }

    /// Set the token store
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the request timeout
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<KuteeraClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| ClientError::Configuration("token store is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        let backend_prefix = self
            .backend_prefix
            .unwrap_or_else(|| "/api/backend".to_string())
            .trim_end_matches('/')
            .to_string();

        let mut client_builder = ClientBuilder::new().cookie_store(true);

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("kuteera-client/", env!("CARGO_PKG_VERSION")).into()),
        );

        let client = client_builder.build()?;

        Ok(KuteeraClient {
            client,
            base_url,
            backend_prefix,
            store,
        })
    }
}
