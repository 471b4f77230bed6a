//! Identity provider settings for the login flow.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::error::{OAuthError, Result};

/// Default client id registered for the BeJam app.
pub const DEFAULT_CLIENT_ID: &str = "f929decae6b84dad9fa7ce752d50c7ec";

/// Default loopback redirect caught by the redirect listener.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// Default authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Scopes the app asks for.
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-library-modify",
    "user-library-read",
    "user-follow-modify",
    "user-follow-read",
    "user-top-read",
];

/// How long the listener waits for the browser before giving up.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth configuration for the music provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// `None` waits forever.
    pub callback_timeout: Option<Duration>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::spotify()
    }
}

impl OAuthConfig {
    /// Create the config used by the BeJam app.
    pub fn spotify() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            callback_timeout: Some(DEFAULT_CALLBACK_TIMEOUT),
        }
    }

    /// Space-separated scope list as sent to the authorization endpoint.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    /// Local address the redirect listener binds to.
    ///
    /// The redirect URI must point at a loopback host; `localhost` maps to
    /// `127.0.0.1`.
    pub fn callback_addr(&self) -> Result<SocketAddr> {
        let url = self.parsed_redirect()?;
        let ip = match url.host_str() {
            Some("localhost") => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Some(host) => host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .map_err(|_| {
                    OAuthError::Config(format!("redirect host '{}' is not an IP address", host))
                })?,
            None => {
                return Err(OAuthError::Config(
                    "redirect_uri has no host".to_string(),
                ));
            }
        };

        if !ip.is_loopback() {
            return Err(OAuthError::Config(format!(
                "redirect host {} is not a loopback address",
                ip
            )));
        }

        let port = url
            .port_or_known_default()
            .ok_or_else(|| OAuthError::Config("redirect_uri has no port".to_string()))?;

        Ok(SocketAddr::new(ip, port))
    }

    /// Path component of the redirect URI (e.g. `/callback`).
    pub fn callback_path(&self) -> Result<String> {
        Ok(self.parsed_redirect()?.path().to_string())
    }

    fn parsed_redirect(&self) -> Result<Url> {
        Url::parse(&self.redirect_uri)
            .map_err(|e| OAuthError::Config(format!("invalid redirect_uri: {}", e)))
    }
}
