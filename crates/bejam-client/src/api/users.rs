//! User profiles API.

use crate::client::SpotifyClient;
use crate::error::{Error, Result};
use crate::types::UserProfile;

/// User profiles API client.
pub struct UsersApi {
    client: SpotifyClient,
}

impl UsersApi {
    pub(crate) fn new(client: SpotifyClient) -> Self {
        Self { client }
    }

    /// The logged-in user.
    pub async fn me(&self) -> Result<UserProfile> {
        self.client.get("me").await
    }

    /// Public profile of any user.
    pub async fn get(&self, id: &str) -> Result<UserProfile> {
        if id.trim().is_empty() {
            return Err(Error::InvalidRequest("user id must not be empty".to_string()));
        }
        self.client
            .get(&format!("users/{}", urlencoding::encode(id)))
            .await
    }
}
