//! Token lifecycle: code exchange, refresh, expiry checks and logout.
//!
//! All writes to the persisted [`StoredAuth`] record go through
//! [`TokenManager`]. API clients only see the [`AccessTokenProvider`] side.

use std::fmt;
use std::sync::Arc;
#[cfg(any(test, feature = "test-util"))]
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OAuthConfig;
use crate::error::{OAuthError, Result};
use crate::store::{SharedTokenStore, StoredAuth};

// ============================================================================
// Clock
// ============================================================================

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> u64;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// A clock that only moves when told to.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Token endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

// ============================================================================
// AccessTokenProvider
// ============================================================================

/// Read side of the token state, handed to API-calling components.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync + fmt::Debug {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// Shared provider for use across async contexts.
pub type SharedTokenProvider = Arc<dyn AccessTokenProvider>;

// ============================================================================
// TokenManager
// ============================================================================

/// Exchanges codes for tokens, persists them and keeps them fresh.
#[derive(Debug)]
pub struct TokenManager {
    config: OAuthConfig,
    http: reqwest::Client,
    store: SharedTokenStore,
    clock: Arc<dyn Clock>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TokenManager {
    /// Create a manager over `store` using the system clock.
    pub fn new(config: OAuthConfig, store: SharedTokenStore) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            store,
            clock: Arc::new(SystemClock),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedTokenStore {
        &self.store
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Exchange an authorization code for a token pair and persist it.
    ///
    /// The stored verifier is discarded on success. Nothing is written on
    /// failure.
    pub async fn exchange(&self, code: &str, verifier: &str) -> Result<StoredAuth> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ];

        let response = self.request_tokens(&form, "exchange").await?;

        let mut auth = self.store.load().await?;
        self.apply(&mut auth, response);
        auth.code_verifier = None;
        self.store.save(&auth).await?;

        tracing::info!(
            expires_at = auth.expiration_time,
            has_refresh_token = auth.refresh_token.is_some(),
            "authorization code exchanged"
        );
        Ok(auth)
    }

    /// Mint a new access token from the stored refresh token.
    ///
    /// Fails without touching the network when no refresh token is stored.
    /// The stored refresh token is kept unless the response carries a new
    /// one.
    pub async fn refresh(&self) -> Result<StoredAuth> {
        let mut auth = self.store.load().await?;
        let refresh_token = auth
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                tracing::warn!("refresh requested without a stored refresh token");
                OAuthError::NoRefreshToken
            })?;

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];

        let response = self.request_tokens(&form, "refresh").await?;

        self.apply(&mut auth, response);
        self.store.save(&auth).await?;

        tracing::info!(expires_at = auth.expiration_time, "access token refreshed");
        Ok(auth)
    }

    /// True when no expiry is stored or it has been reached.
    ///
    /// A store that cannot be read counts as expired.
    pub async fn is_expired(&self) -> bool {
        match self.store.load().await {
            Ok(auth) => auth.is_expired_at(self.clock.now_millis()),
            Err(e) => {
                tracing::warn!(error = %e, "could not read auth state, treating token as expired");
                true
            }
        }
    }

    /// The stored access token, refreshed first if it has expired.
    pub async fn valid_access_token(&self) -> Result<String> {
        let auth = self.store.load().await?;
        if auth.access_token.is_none() {
            return Err(OAuthError::NotLoggedIn);
        }
        if !auth.is_expired_at(self.clock.now_millis()) {
            return auth.access_token.ok_or(OAuthError::NotLoggedIn);
        }

        let _guard = self.refresh_lock.lock().await;

        // Someone else may have refreshed while we waited.
        let auth = self.store.load().await?;
        if !auth.is_expired_at(self.clock.now_millis()) {
            return auth.access_token.ok_or(OAuthError::NotLoggedIn);
        }

        tracing::info!("access token expired, refreshing");
        let refreshed = self.refresh().await?;
        refreshed.access_token.ok_or(OAuthError::NotLoggedIn)
    }

    /// Snapshot for display.
    pub async fn status(&self) -> Result<TokenStatus> {
        let auth = self.store.load().await?;
        Ok(TokenStatus::from_auth(&auth, self.clock.now_millis()))
    }

    /// Remember the verifier of a login attempt until the exchange.
    pub async fn store_verifier(&self, verifier: &str) -> Result<()> {
        let mut auth = self.store.load().await?;
        auth.code_verifier = Some(verifier.to_string());
        self.store.save(&auth).await
    }

    /// The verifier of the login attempt in flight, if any.
    pub async fn stored_verifier(&self) -> Result<Option<String>> {
        Ok(self.store.load().await?.code_verifier)
    }

    /// Drop tokens, expiry and verifier.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        tracing::info!("auth state cleared");
        Ok(())
    }

    async fn request_tokens(&self, form: &[(&str, &str)], what: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "token {} request failed", what);
                OAuthError::Network(format!("Token {} request failed: {}", what, e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::Network(format!("Failed to read token {} response: {}", what, e)))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %body, "token {} rejected", what);
            return Err(OAuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "token {} response could not be parsed", what);
            OAuthError::InvalidResponse(format!("Failed to parse token {} response: {}", what, e))
        })
    }

    fn apply(&self, auth: &mut StoredAuth, response: TokenResponse) {
        let now = self.clock.now_millis();
        auth.access_token = Some(response.access_token);
        auth.expiration_time = Some(now.saturating_add(response.expires_in.saturating_mul(1000)));
        if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
            auth.refresh_token = Some(refresh_token);
        }
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn access_token(&self) -> Result<String> {
        self.valid_access_token().await
    }
}

// ============================================================================
// TokenStatus
// ============================================================================

/// Information about stored tokens for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStatus {
    pub logged_in: bool,
    pub has_refresh_token: bool,
    pub is_expired: bool,
    pub expires_at: Option<u64>,
    pub expires_in_secs: u64,
    pub login_pending: bool,
}

impl TokenStatus {
    pub fn from_auth(auth: &StoredAuth, now_ms: u64) -> Self {
        let expires_in_secs = auth
            .expiration_time
            .map(|at| at.saturating_sub(now_ms) / 1000)
            .unwrap_or(0);

        Self {
            logged_in: auth.has_tokens(),
            has_refresh_token: auth.refresh_token.is_some(),
            is_expired: auth.is_expired_at(now_ms),
            expires_at: auth.expiration_time,
            expires_in_secs,
            login_pending: auth.code_verifier.is_some(),
        }
    }

    /// Expiry as an RFC 3339 timestamp.
    pub fn expires_at_display(&self) -> Option<String> {
        self.expires_at
            .and_then(|ms| chrono::DateTime::from_timestamp_millis(ms as i64))
            .map(|dt| dt.to_rfc3339())
    }

    pub fn expires_in_display(&self) -> String {
        if self.is_expired {
            "Expired (will refresh on next use)".to_string()
        } else {
            let hours = self.expires_in_secs / 3600;
            let minutes = (self.expires_in_secs % 3600) / 60;
            format!("{}h {}m", hours, minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTokenStore;

    const T: u64 = 1_700_000_000_000;

    fn manager_with(auth: StoredAuth, clock: Arc<ManualClock>) -> TokenManager {
        let config = OAuthConfig {
            // Nothing listens here; any request would fail with a network error.
            token_url: "http://127.0.0.1:9/api/token".to_string(),
            ..OAuthConfig::spotify()
        };
        TokenManager::new(config, Arc::new(InMemoryTokenStore::with_auth(auth))).with_clock(clock)
    }

    fn logged_in() -> StoredAuth {
        StoredAuth {
            access_token: Some("A".to_string()),
            refresh_token: Some("R".to_string()),
            expiration_time: Some(T + 3_600_000),
            code_verifier: None,
        }
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(T);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_millis(), T + 2000);
        clock.set(5);
        assert_eq!(clock.now_millis(), 5);
    }

    #[test]
    fn test_token_response_optional_refresh() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"A","expires_in":3600,"token_type":"Bearer"}"#)
                .unwrap();
        assert_eq!(response.access_token, "A");
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_is_expired_boundaries() {
        let clock = Arc::new(ManualClock::new(T + 3_599_999));
        let manager = manager_with(logged_in(), clock.clone());
        assert!(!manager.is_expired().await);

        clock.set(T + 3_600_000);
        assert!(manager.is_expired().await);

        clock.set(T + 3_600_001);
        assert!(manager.is_expired().await);
    }

    #[tokio::test]
    async fn test_is_expired_without_state() {
        let manager = manager_with(StoredAuth::default(), Arc::new(ManualClock::new(T)));
        assert!(manager.is_expired().await);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_fast() {
        let auth = StoredAuth {
            refresh_token: None,
            ..logged_in()
        };
        let manager = manager_with(auth.clone(), Arc::new(ManualClock::new(T)));

        let err = manager.refresh().await.unwrap_err();
        assert!(matches!(err, OAuthError::NoRefreshToken));
        assert_eq!(manager.store().load().await.unwrap(), auth);
    }

    #[tokio::test]
    async fn test_valid_access_token_not_logged_in() {
        let manager = manager_with(StoredAuth::default(), Arc::new(ManualClock::new(T)));
        assert!(matches!(
            manager.valid_access_token().await,
            Err(OAuthError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn test_valid_access_token_fresh() {
        let manager = manager_with(logged_in(), Arc::new(ManualClock::new(T)));
        assert_eq!(manager.access_token().await.unwrap(), "A");
    }

    #[tokio::test]
    async fn test_network_failure_leaves_state() {
        let clock = Arc::new(ManualClock::new(T + 4_000_000));
        let manager = manager_with(logged_in(), clock);

        let err = manager.valid_access_token().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(manager.store().load().await.unwrap(), logged_in());
    }

    #[tokio::test]
    async fn test_verifier_roundtrip_and_logout() {
        let manager = manager_with(logged_in(), Arc::new(ManualClock::new(T)));
        manager.store_verifier("v").await.unwrap();
        assert_eq!(manager.stored_verifier().await.unwrap().as_deref(), Some("v"));
        assert!(manager.status().await.unwrap().login_pending);

        manager.logout().await.unwrap();
        assert!(manager.store().load().await.unwrap().is_empty());
    }

    #[test]
    fn test_status_display() {
        let status = TokenStatus::from_auth(&logged_in(), T);
        assert!(status.logged_in);
        assert!(!status.is_expired);
        assert_eq!(status.expires_in_secs, 3600);
        assert_eq!(status.expires_in_display(), "1h 0m");
        assert!(status.expires_at_display().unwrap().starts_with("2023-11-14T"));

        let expired = TokenStatus::from_auth(&logged_in(), T + 3_600_000);
        assert!(expired.expires_in_display().contains("Expired"));
    }
}
