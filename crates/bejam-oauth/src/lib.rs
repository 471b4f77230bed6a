//! OAuth 2.0 PKCE login for the BeJam music provider.
//!
//! The handshake is split into small modules:
//!
//! - [`pkce`]: verifier/challenge generation and the authorization URL
//! - [`listener`]: one-shot loopback listener that catches the redirect
//! - [`token`]: code exchange, refresh, expiry and the [`AccessTokenProvider`] API clients use
//! - [`store`]: persisted token record behind the [`TokenStore`] trait
//! - [`flow`]: one login attempt (start, wait for the redirect, exchange)

pub mod config;
pub mod error;
pub mod flow;
pub mod listener;
pub mod pkce;
pub mod store;
pub mod token;

pub use config::OAuthConfig;
pub use error::{OAuthError, Result};
pub use flow::{LoginFlow, PendingLogin};
pub use listener::{CallbackOutcome, ListenerState, RedirectListener};
pub use pkce::PkceChallenge;
pub use store::{
    FileTokenStore, InMemoryTokenStore, SharedTokenStore, StoredAuth, TokenStore,
    create_file_store, create_memory_store,
};
pub use token::{
    AccessTokenProvider, Clock, SharedTokenProvider, SystemClock, TokenManager, TokenResponse,
    TokenStatus,
};

#[cfg(feature = "test-util")]
pub use token::ManualClock;
