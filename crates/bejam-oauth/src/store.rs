//! Persisted authorization state.
//!
//! A single record holds the token pair, its absolute expiry and the
//! verifier of the login attempt in flight. Writers are the token manager
//! and the login flow; everything else reads through
//! [`AccessTokenProvider`](crate::token::AccessTokenProvider).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{OAuthError, Result};

/// File name of the persisted record within the data directory.
pub const AUTH_FILE: &str = "auth.json";

/// Everything the handshake persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry of the access token, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<u64>,
    /// Verifier of the login attempt in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

impl StoredAuth {
    /// True when no expiry is known or `now_ms` has reached it.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expiration_time {
            Some(expires_at) => now_ms >= expires_at,
            None => true,
        }
    }

    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == StoredAuth::default()
    }
}

/// Storage for the authorization record.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    /// Read the current record; an empty record when nothing is stored.
    async fn load(&self) -> Result<StoredAuth>;

    /// Replace the stored record.
    async fn save(&self, auth: &StoredAuth) -> Result<()>;

    /// Remove every stored field.
    async fn clear(&self) -> Result<()>;
}

/// Shared token store for use across async contexts.
pub type SharedTokenStore = Arc<dyn TokenStore>;

// ============================================================================
// FileTokenStore
// ============================================================================

/// JSON file store used by the CLI.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<StoredAuth>>,
}

impl FileTokenStore {
    /// Store `auth.json` inside `data_dir`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(AUTH_FILE))
    }

    /// Create with a custom file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_file(&self, auth: &StoredAuth) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                OAuthError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let json = serde_json::to_string_pretty(auth)?;

        // Replace via rename so readers never see a half-written record.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| OAuthError::Storage(format!("Failed to write {}: {}", tmp.display(), e)))?;
        restrict_permissions(&tmp).await;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            OAuthError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<StoredAuth> {
        {
            let cache = self.cached.read().await;
            if let Some(auth) = cache.as_ref() {
                return Ok(auth.clone());
            }
        }

        let auth = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                OAuthError::Serialization(format!(
                    "Failed to parse {}: {}",
                    self.path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredAuth::default(),
            Err(e) => {
                return Err(OAuthError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        *self.cached.write().await = Some(auth.clone());
        Ok(auth)
    }

    async fn save(&self, auth: &StoredAuth) -> Result<()> {
        self.write_file(auth).await?;
        *self.cached.write().await = Some(auth.clone());
        tracing::debug!(path = %self.path.display(), "auth state saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(OAuthError::Storage(format!(
                    "Failed to delete {}: {}",
                    self.path.display(),
                    e
                )));
            }
        }
        *self.cached.write().await = Some(StoredAuth::default());
        tracing::debug!(path = %self.path.display(), "auth state cleared");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) =
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
    {
        tracing::warn!(path = %path.display(), error = %e, "could not restrict auth file permissions");
    }
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) {}

// ============================================================================
// InMemoryTokenStore
// ============================================================================

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    auth: RwLock<StoredAuth>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth(auth: StoredAuth) -> Self {
        Self {
            auth: RwLock::new(auth),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self) -> Result<StoredAuth> {
        Ok(self.auth.read().await.clone())
    }

    async fn save(&self, auth: &StoredAuth) -> Result<()> {
        *self.auth.write().await = auth.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.auth.write().await = StoredAuth::default();
        Ok(())
    }
}

/// Create a shared file-based store in `data_dir`.
pub fn create_file_store(data_dir: &Path) -> SharedTokenStore {
    Arc::new(FileTokenStore::new(data_dir))
}

/// Create a shared in-memory store.
pub fn create_memory_store() -> SharedTokenStore {
    Arc::new(InMemoryTokenStore::new())
}
