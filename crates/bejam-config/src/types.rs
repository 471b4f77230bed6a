//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [spotify]                # provider endpoints and client registration
//! client_id = "..."
//! redirect_uri = "http://127.0.0.1:8888/callback"
//!
//! [auth]                   # login behaviour
//! callback_timeout_secs = 300
//!
//! [api]                    # Web API client
//! base_url = "https://api.spotify.com/"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use bejam_oauth::OAuthConfig;
use bejam_oauth::config::{
    DEFAULT_AUTHORIZE_URL, DEFAULT_CALLBACK_TIMEOUT, DEFAULT_CLIENT_ID, DEFAULT_REDIRECT_URI,
    DEFAULT_SCOPES, DEFAULT_TOKEN_URL,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Environment variable overriding where `auth.json` is kept.
pub const DATA_DIR_ENV: &str = "BEJAM_DATA_DIR";

/// Default Web API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/";

/// Default per-request timeout for Web API calls.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BejamConfig {
    pub spotify: Option<SpotifyConfig>,
    pub auth: Option<AuthConfig>,
    pub api: Option<ApiConfig>,
}

impl BejamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Every section filled in, defaults where a layer left one out.
    pub fn effective(&self) -> Self {
        Self {
            spotify: Some(self.spotify()),
            auth: Some(self.auth()),
            api: Some(self.api()),
        }
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: BejamConfig) {
        if other.spotify.is_some() {
            self.spotify = other.spotify;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.api.is_some() {
            self.api = other.api;
        }
    }

    pub fn spotify(&self) -> SpotifyConfig {
        self.spotify.clone().unwrap_or_default()
    }

    pub fn auth(&self) -> AuthConfig {
        self.auth.clone().unwrap_or_default()
    }

    pub fn api(&self) -> ApiConfig {
        self.api.clone().unwrap_or_default()
    }

    /// Settings for the login flow.
    pub fn oauth(&self) -> OAuthConfig {
        let spotify = self.spotify();
        OAuthConfig {
            client_id: spotify.client_id,
            authorize_url: spotify.authorize_url,
            token_url: spotify.token_url,
            redirect_uri: spotify.redirect_uri,
            scopes: spotify.scopes,
            callback_timeout: self.auth().callback_timeout(),
        }
    }

    /// Reject values that would only fail later, mid-login.
    pub fn validate(&self) -> Result<()> {
        let spotify = self.spotify();
        if spotify.client_id.trim().is_empty() {
            return Err(invalid("spotify.client_id", "must not be empty"));
        }
        for (field, value) in [
            ("spotify.authorize_url", &spotify.authorize_url),
            ("spotify.token_url", &spotify.token_url),
        ] {
            url::Url::parse(value).map_err(|e| invalid(field, e))?;
        }

        let oauth = self.oauth();
        oauth
            .callback_addr()
            .map_err(|e| invalid("spotify.redirect_uri", e))?;

        let api = self.api();
        let base = url::Url::parse(&api.base_url).map_err(|e| invalid("api.base_url", e))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("api.base_url", "must be an http(s) URL"));
        }
        if api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than zero"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Identity provider endpoints and client registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Must point at a loopback address; the redirect listener binds it.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Login behaviour and token storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Seconds to wait for the browser redirect. `0` waits forever.
    pub callback_timeout_secs: u64,

    /// Directory holding `auth.json`. Defaults to the config directory.
    ///
    /// Can be overridden by the `BEJAM_DATA_DIR` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Try to open the system browser on login.
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            callback_timeout_secs: DEFAULT_CALLBACK_TIMEOUT.as_secs(),
            data_dir: None,
            open_browser: true,
        }
    }
}

impl AuthConfig {
    pub fn callback_timeout(&self) -> Option<Duration> {
        match self.callback_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Where token state lives.
    ///
    /// Resolution order:
    /// 1. `BEJAM_DATA_DIR` environment variable
    /// 2. Configured `data_dir`
    /// 3. `config_dir`
    pub fn effective_data_dir(&self, config_dir: &Path) -> PathBuf {
        resolve_data_dir(
            std::env::var(DATA_DIR_ENV).ok(),
            self.data_dir.as_deref(),
            config_dir,
        )
    }
}

fn resolve_data_dir(env: Option<String>, configured: Option<&Path>, config_dir: &Path) -> PathBuf {
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir.to_path_buf())
}

// ─────────────────────────────────────────────────────────────────────────────
// Web API
// ─────────────────────────────────────────────────────────────────────────────

/// Web API client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Market sent with searches.
    pub market: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            market: "from_token".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
