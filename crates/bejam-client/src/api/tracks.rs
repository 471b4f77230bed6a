//! Search, top tracks and the saved-tracks library.

use serde::Serialize;

use super::{clamp_limit, id_batches};
use crate::client::SpotifyClient;
use crate::error::{Error, Result};
use crate::types::{Page, Track, TrackSearchResponse};

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    limit: u32,
    market: &'a str,
}

#[derive(Debug, Serialize)]
struct LimitQuery {
    limit: u32,
}

#[derive(Debug, Serialize)]
struct IdsQuery<'a> {
    ids: &'a str,
}

/// Tracks API client.
pub struct TracksApi {
    client: SpotifyClient,
}

impl TracksApi {
    pub(crate) fn new(client: SpotifyClient) -> Self {
        Self { client }
    }

    /// Search the catalogue for tracks. `limit` is clamped to 1..=50.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidRequest("search query must not be empty".to_string()));
        }

        let response: TrackSearchResponse = self
            .client
            .get_with_query(
                "search",
                &SearchQuery {
                    q: query,
                    kind: "track",
                    limit: clamp_limit(limit),
                    market: self.client.market(),
                },
            )
            .await?;
        Ok(response.tracks.items)
    }

    /// The current user's most played tracks.
    pub async fn top(&self, limit: u32) -> Result<Vec<Track>> {
        let page: Page<Track> = self
            .client
            .get_with_query(
                "me/top/tracks",
                &LimitQuery {
                    limit: clamp_limit(limit),
                },
            )
            .await?;
        Ok(page.items)
    }

    /// Add tracks to the current user's library.
    ///
    /// Large id lists are sent in batches of 50; an empty list sends nothing.
    pub async fn save(&self, ids: &[&str]) -> Result<()> {
        for batch in id_batches(ids) {
            self.client.put("me/tracks", &IdsQuery { ids: &batch }).await?;
        }
        Ok(())
    }
}
