//! Error types for the authorization handshake.

use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur during login, token exchange, refresh and storage.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The user (or the provider) refused the authorization request.
    #[error("Authorization denied: {0}")]
    AccessDenied(String),

    /// No code verifier was stored when the redirect arrived.
    #[error("No code verifier stored for this login attempt; start the login again")]
    MissingVerifier,

    /// The listener went away before a redirect arrived.
    #[error("Login was cancelled before the redirect arrived")]
    Cancelled,

    /// No redirect arrived within the configured window.
    #[error("No authorization redirect received within {}s", .0.as_secs())]
    CallbackTimeout(Duration),

    /// Network/HTTP transport error.
    #[error("Network error: {0}")]
    Network(String),

    /// The token endpoint answered with a non-success status.
    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// The token endpoint answered 2xx but the body was not a token response.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// No tokens are stored at all.
    #[error("Not logged in; run 'bejam auth login' first")]
    NotLoggedIn,

    /// Refresh requested but no refresh token is stored.
    #[error("No refresh token stored; log in again")]
    NoRefreshToken,

    /// The redirect listener could not bind its port.
    #[error("Failed to bind redirect listener on {addr}: {source}")]
    ListenerBind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// A login attempt is already waiting for its redirect.
    #[error("A login attempt is already in progress")]
    ListenerActive,

    /// Reading or writing persisted token state failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

impl OAuthError {
    /// Whether trying the same operation again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OAuthError::Network(_) | OAuthError::CallbackTimeout(_)
        ) || matches!(self, OAuthError::TokenEndpoint { status, .. } if *status >= 500)
    }

    /// Whether the only way forward is a fresh interactive login.
    pub fn requires_login(&self) -> bool {
        match self {
            OAuthError::NoRefreshToken
            | OAuthError::NotLoggedIn
            | OAuthError::MissingVerifier
            | OAuthError::AccessDenied(_) => true,
            OAuthError::TokenEndpoint { status, .. } => matches!(status, 400 | 401),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(e: serde_json::Error) -> Self {
        OAuthError::Serialization(e.to_string())
    }
}
