//! One-shot loopback listener that catches the authorization redirect.
//!
//! The listener serves a single callback path. The first request on that
//! path carrying a `code` or an `error` is handed to the waiting login
//! attempt and the listener shuts itself down; everything else gets a 404.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{OAuthError, Result};

/// How long `stop` waits for open connections to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = "<html><body><h2>Login successful! You can return to BeJam.</h2></body></html>";

const DENIED_PAGE: &str = "<html><body><h2>Login was not completed. You can close this window and try again from BeJam.</h2></body></html>";

/// Lifecycle of the listener for one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
    Served,
}

/// What the redirect carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Authorization code to exchange.
    Code(String),
    /// The provider reported an error (e.g. `access_denied`).
    Denied {
        error: String,
        description: Option<String>,
    },
}

struct Shared {
    state: Mutex<ListenerState>,
    outcome_tx: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
    shutdown: watch::Sender<bool>,
}

/// Redirect listener bound to a local port.
pub struct RedirectListener {
    local_addr: SocketAddr,
    callback_path: String,
    shared: Arc<Shared>,
    outcome_rx: Mutex<Option<oneshot::Receiver<CallbackOutcome>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for RedirectListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectListener")
            .field("local_addr", &self.local_addr)
            .field("callback_path", &self.callback_path)
            .field("state", &self.state())
            .finish()
    }
}

impl RedirectListener {
    /// Bind `addr` and start serving `callback_path` in the background.
    pub async fn start(addr: SocketAddr, callback_path: &str) -> Result<Self> {
        if !callback_path.starts_with('/') {
            return Err(OAuthError::Config(format!(
                "callback path '{}' must start with '/'",
                callback_path
            )));
        }

        let listener = TcpListener::bind(addr).await.map_err(|source| {
            tracing::error!(addr = %addr, error = %source, "redirect listener could not bind");
            OAuthError::ListenerBind { addr, source }
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| OAuthError::ListenerBind { addr, source })?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            state: Mutex::new(ListenerState::Listening),
            outcome_tx: Mutex::new(Some(outcome_tx)),
            shutdown: shutdown_tx,
        });

        let router = Router::new()
            .route(
                callback_path,
                get(handle_callback).fallback(handle_not_found),
            )
            .fallback(handle_not_found)
            .with_state(shared.clone());

        let task_shared = shared.clone();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await.map(|_| ());
                })
                .await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "redirect listener exited with error");
            }
            *task_shared.state.lock() = ListenerState::Idle;
            tracing::debug!("redirect listener stopped");
        });

        tracing::info!(addr = %local_addr, path = callback_path, "redirect listener started");

        Ok(Self {
            local_addr,
            callback_path: callback_path.to_string(),
            shared,
            outcome_rx: Mutex::new(Some(outcome_rx)),
            task: Mutex::new(Some(task)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn callback_path(&self) -> &str {
        &self.callback_path
    }

    pub fn state(&self) -> ListenerState {
        *self.shared.state.lock()
    }

    /// Wait for the redirect.
    ///
    /// With a timeout, an attempt nobody completes stops the listener and
    /// fails with [`OAuthError::CallbackTimeout`]. Can be awaited once.
    pub async fn wait_for_callback(&self, timeout: Option<Duration>) -> Result<CallbackOutcome> {
        let rx = self
            .outcome_rx
            .lock()
            .take()
            .ok_or(OAuthError::Cancelled)?;

        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(timeout_secs = limit.as_secs(), "no authorization redirect received");
                    self.stop().await;
                    return Err(OAuthError::CallbackTimeout(limit));
                }
            },
            None => rx.await,
        };

        match received {
            Ok(outcome) => {
                self.stop().await;
                Ok(outcome)
            }
            Err(_) => Err(OAuthError::Cancelled),
        }
    }

    /// Shut the listener down and release the port. Idempotent.
    ///
    /// A login attempt still waiting on [`wait_for_callback`](Self::wait_for_callback)
    /// resolves with [`OAuthError::Cancelled`].
    pub async fn stop(&self) {
        self.shared.outcome_tx.lock().take();
        self.shared.shutdown.send_replace(true);

        let task = self.task.lock().take();
        if let Some(mut task) = task
            && tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err()
        {
            tracing::warn!("redirect listener did not drain in time, aborting");
            task.abort();
        }

        *self.shared.state.lock() = ListenerState::Idle;
    }
}

impl Drop for RedirectListener {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
    }
}

async fn handle_callback(
    State(shared): State<Arc<Shared>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let outcome = if let Some(code) = params.get("code").filter(|c| !c.is_empty()) {
        CallbackOutcome::Code(code.clone())
    } else if let Some(error) = params.get("error") {
        CallbackOutcome::Denied {
            error: error.clone(),
            description: params.get("error_description").cloned(),
        }
    } else {
        tracing::debug!("callback without code or error");
        return not_found();
    };

    let Some(tx) = shared.outcome_tx.lock().take() else {
        tracing::debug!("redirect arrived after the attempt was served, ignoring");
        return not_found();
    };

    let page = match &outcome {
        CallbackOutcome::Code(_) => {
            tracing::info!("authorization code received");
            SUCCESS_PAGE
        }
        CallbackOutcome::Denied { error, .. } => {
            tracing::warn!(error = %error, "authorization denied");
            DENIED_PAGE
        }
    };

    *shared.state.lock() = ListenerState::Served;
    if tx.send(outcome).is_err() {
        tracing::warn!("no login attempt is waiting for the redirect");
    }
    shared.shutdown.send_replace(true);

    (StatusCode::OK, Html(page)).into_response()
}

async fn handle_not_found() -> Response {
    not_found()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_code_is_dispatched_once() {
        let listener = RedirectListener::start(loopback(), "/callback").await.unwrap();
        assert_eq!(listener.state(), ListenerState::Listening);

        let url = format!("http://{}/callback?code=XYZ", listener.local_addr());
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("Login successful"));
        assert_ne!(listener.state(), ListenerState::Listening);

        let outcome = listener.wait_for_callback(None).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Code("XYZ".to_string()));
        assert_eq!(listener.state(), ListenerState::Idle);

        // Stopped: a second redirect is either refused or ignored.
        match reqwest::get(&url).await {
            Ok(response) => assert_eq!(response.status(), 404),
            Err(e) => assert!(e.is_connect() || e.is_request()),
        }

        // The outcome can only be taken once.
        assert!(matches!(
            listener.wait_for_callback(None).await,
            Err(OAuthError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_error_is_dispatched() {
        let listener = RedirectListener::start(loopback(), "/callback").await.unwrap();

        let url = format!(
            "http://{}/callback?error=access_denied",
            listener.local_addr()
        );
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("not completed"));

        let outcome = listener.wait_for_callback(None).await.unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Denied {
                error: "access_denied".to_string(),
                description: None
            }
        );
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found_and_keep_listening() {
        let listener = RedirectListener::start(loopback(), "/callback").await.unwrap();
        let base = format!("http://{}", listener.local_addr());

        let response = reqwest::get(format!("{}/favicon.ico", base)).await.unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.text().await.unwrap(), "Not found");

        // Callback path without code or error
        let response = reqwest::get(format!("{}/callback", base)).await.unwrap();
        assert_eq!(response.status(), 404);

        let response = reqwest::get(format!("{}/callback?code=", base)).await.unwrap();
        assert_eq!(response.status(), 404);

        assert_eq!(listener.state(), ListenerState::Listening);

        let response = reqwest::get(format!("{}/callback?code=later", base)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            listener.wait_for_callback(None).await.unwrap(),
            CallbackOutcome::Code("later".to_string())
        );
    }

    #[tokio::test]
    async fn test_port_in_use_fails_to_bind() {
        let first = RedirectListener::start(loopback(), "/callback").await.unwrap();
        let err = RedirectListener::start(first.local_addr(), "/callback")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::ListenerBind { .. }));
        first.stop().await;
    }

    #[tokio::test]
    async fn test_timeout_stops_and_releases_port() {
        let listener = RedirectListener::start(loopback(), "/callback").await.unwrap();
        let addr = listener.local_addr();

        let err = listener
            .wait_for_callback(Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::CallbackTimeout(_)));
        assert_eq!(listener.state(), ListenerState::Idle);

        let again = RedirectListener::start(addr, "/callback").await.unwrap();
        again.stop().await;
    }

    #[tokio::test]
    async fn test_stop_cancels_waiter() {
        let listener = Arc::new(RedirectListener::start(loopback(), "/callback").await.unwrap());

        let waiter = {
            let listener = listener.clone();
            tokio::spawn(async move { listener.wait_for_callback(None).await })
        };
        tokio::task::yield_now().await;

        listener.stop().await;
        listener.stop().await;

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(OAuthError::Cancelled)));
        assert_eq!(listener.state(), ListenerState::Idle);
    }

    #[tokio::test]
    async fn test_rejects_relative_path() {
        let err = RedirectListener::start(loopback(), "callback").await.unwrap_err();
        assert!(matches!(err, OAuthError::Config(_)));
    }

    #[tokio::test]
    async fn test_other_methods_on_callback_are_not_found() {
        let listener = RedirectListener::start(loopback(), "/callback").await.unwrap();
        let url = format!("http://{}/callback?code=XYZ", listener.local_addr());

        let response = reqwest::Client::new().post(&url).send().await.unwrap();
        assert_eq!(response.status(), 404);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(response.text().await.unwrap(), "Not found");
        assert_eq!(listener.state(), ListenerState::Listening);

        listener.stop().await;
    }

    #[tokio::test]
    async fn test_late_redirect_after_served_is_ignored() {
        let (outcome_tx, mut outcome_rx) = oneshot::channel();
        let (shutdown, _shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            state: Mutex::new(ListenerState::Listening),
            outcome_tx: Mutex::new(Some(outcome_tx)),
            shutdown,
        });
        let params = |code: &str| Query(HashMap::from([("code".to_string(), code.to_string())]));

        let first = handle_callback(State(shared.clone()), params("A")).await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(*shared.state.lock(), ListenerState::Served);
        assert!(*shared.shutdown.borrow());

        let second = handle_callback(State(shared.clone()), params("B")).await;
        assert_eq!(second.status(), StatusCode::NOT_FOUND);

        assert_eq!(
            outcome_rx.try_recv().unwrap(),
            CallbackOutcome::Code("A".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_redirects_yield_one_outcome() {
        let listener = RedirectListener::start(loopback(), "/callback").await.unwrap();
        let base = format!("http://{}/callback", listener.local_addr());
        let client = reqwest::Client::new();

        let (a, b) = tokio::join!(
            client.get(format!("{}?code=A", base)).send(),
            client.get(format!("{}?code=B", base)).send(),
        );
        let served = [a, b]
            .into_iter()
            .filter(|r| r.as_ref().is_ok_and(|resp| resp.status() == 200))
            .count();
        assert_eq!(served, 1);

        let outcome = listener.wait_for_callback(None).await.unwrap();
        assert!(matches!(outcome, CallbackOutcome::Code(ref c) if c == "A" || c == "B"));
        assert!(matches!(
            listener.wait_for_callback(None).await,
            Err(OAuthError::Cancelled)
        ));
    }
}
