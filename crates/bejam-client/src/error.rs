//! Client error types.

use bejam_oauth::OAuthError;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No usable access token.
    #[error(transparent)]
    Token(#[from] OAuthError),

    /// The provider returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the provider.
        message: String,
    },

    /// The access token was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Too many requests.
    #[error("Rate limited by the provider{}", .retry_after.map(|s| format!(", retry after {}s", s)).unwrap_or_default())]
    RateLimited {
        /// Seconds from the `Retry-After` header.
        retry_after: Option<u64>,
    },

    /// The call was rejected before sending.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if the user has to log in (again).
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Auth(_) | Error::Api { status: 401, .. } => true,
            Error::Token(e) => e.requires_login(),
            _ => false,
        }
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. }) || matches!(self, Error::Api { status: 429, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the Web API.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorObject {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::Auth("expired".into()).is_auth_error());
        assert!(Error::Token(OAuthError::NotLoggedIn).is_auth_error());
        assert!(!Error::Token(OAuthError::Network("reset".into())).is_auth_error());
        assert!(Error::RateLimited { retry_after: None }.is_rate_limited());
        assert!(
            Error::Api {
                status: 502,
                message: "bad gateway".into()
            }
            .is_server_error()
        );
    }

    #[test]
    fn test_rate_limit_message() {
        let err = Error::RateLimited {
            retry_after: Some(7),
        };
        assert_eq!(err.to_string(), "Rate limited by the provider, retry after 7s");
        assert_eq!(
            Error::RateLimited { retry_after: None }.to_string(),
            "Rate limited by the provider"
        );
    }

    #[test]
    fn test_parse_provider_error_body() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"error":{"status":401,"message":"The access token expired"}}"#)
                .unwrap();
        assert_eq!(body.error.message, "The access token expired");
    }
}
