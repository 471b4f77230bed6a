//! One login attempt, end to end.
//!
//! Ordering within an attempt: the verifier is persisted, then the redirect
//! listener is started, then the browser is pointed at the authorization
//! URL. The code is only exchanged once the listener has captured it.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{OAuthError, Result};
use crate::listener::{CallbackOutcome, ListenerState, RedirectListener};
use crate::pkce::{PkceChallenge, build_authorization_url};
use crate::store::StoredAuth;
use crate::token::TokenManager;

/// A started login attempt waiting for its redirect.
///
/// Owns the redirect listener. Dropping an attempt that was never completed
/// (a cancelled `login` future, say) shuts the listener down and frees the
/// port for the next `start`.
#[derive(Debug)]
pub struct PendingLogin {
    authorization_url: String,
    listener: Arc<RedirectListener>,
}

impl PendingLogin {
    /// Where the user's browser must go.
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// Address the redirect listener is bound to.
    pub fn redirect_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }
}

/// Drives login attempts and tracks the single active redirect listener.
#[derive(Debug)]
pub struct LoginFlow {
    tokens: Arc<TokenManager>,
    active: Mutex<Weak<RedirectListener>>,
}

impl LoginFlow {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self {
            tokens,
            active: Mutex::new(Weak::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Whether an attempt is currently waiting for its redirect.
    pub fn is_listening(&self) -> bool {
        self.active
            .lock()
            .upgrade()
            .is_some_and(|l| l.state() == ListenerState::Listening)
    }

    /// Begin an attempt: fresh PKCE pair, verifier persisted, listener up.
    pub async fn start(&self) -> Result<PendingLogin> {
        if self.is_listening() {
            return Err(OAuthError::ListenerActive);
        }

        let config = self.tokens.config();
        let addr = config.callback_addr()?;
        let path = config.callback_path()?;

        let pkce = PkceChallenge::generate();
        self.tokens.store_verifier(&pkce.verifier).await?;

        let listener = Arc::new(RedirectListener::start(addr, &path).await?);
        *self.active.lock() = Arc::downgrade(&listener);

        let authorization_url = build_authorization_url(config, &pkce.challenge);
        tracing::info!(addr = %listener.local_addr(), "login started, waiting for redirect");

        Ok(PendingLogin {
            authorization_url,
            listener,
        })
    }

    /// Wait for the redirect and exchange the captured code.
    pub async fn complete(&self, pending: PendingLogin) -> Result<StoredAuth> {
        let timeout = self.tokens.config().callback_timeout;
        let outcome = pending.listener.wait_for_callback(timeout).await;
        self.release(&pending.listener);

        match outcome? {
            CallbackOutcome::Denied { error, description } => {
                tracing::warn!(error = %error, "login denied at the provider");
                let reason = match description {
                    Some(description) => format!("{} ({})", error, description),
                    None => error,
                };
                Err(OAuthError::AccessDenied(reason))
            }
            CallbackOutcome::Code(code) => {
                let verifier = self
                    .tokens
                    .stored_verifier()
                    .await?
                    .filter(|v| !v.is_empty())
                    .ok_or(OAuthError::MissingVerifier)?;
                self.tokens.exchange(&code, &verifier).await
            }
        }
    }

    /// Run a full attempt. `open_browser` receives the authorization URL
    /// once the listener is up.
    pub async fn login<F>(&self, open_browser: F) -> Result<StoredAuth>
    where
        F: FnOnce(&str),
    {
        let pending = self.start().await?;
        open_browser(pending.authorization_url());
        self.complete(pending).await
    }

    /// Stop any waiting attempt and clear all stored state.
    pub async fn logout(&self) -> Result<()> {
        let listener = std::mem::take(&mut *self.active.lock()).upgrade();
        if let Some(listener) = listener {
            listener.stop().await;
        }
        self.tokens.logout().await
    }

    fn release(&self, listener: &Arc<RedirectListener>) {
        let mut active = self.active.lock();
        if std::ptr::eq(active.as_ptr(), Arc::as_ptr(listener)) {
            *active = Weak::new();
        }
    }
}
