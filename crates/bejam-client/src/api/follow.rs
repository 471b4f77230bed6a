//! Following other users.

use serde::Serialize;

use super::id_batches;
use crate::client::SpotifyClient;
use crate::error::Result;

#[derive(Debug, Serialize)]
struct FollowQuery<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    ids: &'a str,
}

/// Follow API client.
pub struct FollowApi {
    client: SpotifyClient,
}

impl FollowApi {
    pub(crate) fn new(client: SpotifyClient) -> Self {
        Self { client }
    }

    /// Follow the given users.
    pub async fn follow_users(&self, ids: &[&str]) -> Result<()> {
        for batch in id_batches(ids) {
            self.client
                .put("me/following", &FollowQuery { kind: "user", ids: &batch })
                .await?;
        }
        Ok(())
    }

    /// Stop following the given users.
    pub async fn unfollow_users(&self, ids: &[&str]) -> Result<()> {
        for batch in id_batches(ids) {
            self.client
                .delete("me/following", &FollowQuery { kind: "user", ids: &batch })
                .await?;
        }
        Ok(())
    }
}
