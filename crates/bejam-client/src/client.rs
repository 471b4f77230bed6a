//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bejam_oauth::{AccessTokenProvider, SharedTokenProvider};
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::api::{FollowApi, TracksApi, UsersApi};
use crate::error::{Error, ErrorResponse, Result};

/// Default Web API root.
pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Spotify Web API client.
///
/// Every request asks the token provider for a currently valid access
/// token, so an expired token is refreshed before the call goes out.
///
/// # Example
///
/// ```no_run
/// use bejam_client::SpotifyClient;
///
/// # async fn example() -> bejam_client::Result<()> {
/// let client = SpotifyClient::builder().access_token("BQD...").build()?;
///
/// let me = client.users().me().await?;
/// let tracks = client.tracks().search("daft punk", 5).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SpotifyClient {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) market: String,
    pub(crate) tokens: SharedTokenProvider,
}

impl std::fmt::Debug for SpotifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl SpotifyClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(crate) fn market(&self) -> &str {
        &self.inner.market
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access user profiles.
    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    /// Access search, top tracks and the saved-tracks library.
    pub fn tracks(&self) -> TracksApi {
        TracksApi::new(self.clone())
    }

    /// Access following other users.
    pub fn follow(&self) -> FollowApi {
        FollowApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("v1/{}", path))
            .map_err(Error::from)
    }

    async fn request<Q>(&self, method: Method, path: &str, query: &Q) -> Result<reqwest::Response>
    where
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let token = self.inner.tokens.access_token().await?;

        tracing::debug!(method = %method, path = url.path(), "api request");

        let response = self
            .inner
            .http
            .request(method, url)
            .query(query)
            .bearer_auth(token)
            .timeout(self.inner.timeout)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with_query(path, &[] as &[(&str, &str)]).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let response = self.request(Method::GET, path, query).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Make a PUT request whose response body is ignored.
    pub(crate) async fn put<Q>(&self, path: &str, query: &Q) -> Result<()>
    where
        Q: serde::Serialize + ?Sized,
    {
        self.request(Method::PUT, path, query).await?;
        Ok(())
    }

    /// Make a DELETE request.
    pub(crate) async fn delete<Q>(&self, path: &str, query: &Q) -> Result<()>
    where
        Q: serde::Serialize + ?Sized,
    {
        self.request(Method::DELETE, path, query).await?;
        Ok(())
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            tracing::warn!(retry_after, "rate limited");
            return Error::RateLimited { retry_after };
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        tracing::warn!(status = status.as_u16(), message = %message, "api request failed");

        match status {
            StatusCode::UNAUTHORIZED => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            _ => Error::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Provider that always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> bejam_oauth::Result<String> {
        Ok(self.0.clone())
    }
}

/// Builder for creating a [`SpotifyClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    tokens: Option<SharedTokenProvider>,
    timeout: Duration,
    market: String,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens: None,
            timeout: DEFAULT_TIMEOUT,
            market: "from_token".to_string(),
        }
    }

    /// Override the API root (tests, proxies).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Source of access tokens, usually the token manager.
    pub fn token_provider(mut self, tokens: SharedTokenProvider) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Use a fixed access token.
    pub fn access_token(self, token: impl Into<String>) -> Self {
        self.token_provider(Arc::new(StaticToken::new(token)))
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Market sent with searches.
    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<SpotifyClient> {
        let tokens = self
            .tokens
            .ok_or_else(|| Error::Config("a token provider is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&self.base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("bejam/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(SpotifyClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                market: self.market,
                tokens,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
