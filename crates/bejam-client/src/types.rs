//! Response types for the Spotify Web API.
//!
//! Only the fields BeJam reads are modelled; everything else in the
//! provider's payloads is ignored.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// A user profile (`/v1/me`, `/v1/users/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Only present for the current user with the `user-read-email` scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

impl UserProfile {
    /// Display name, falling back to the user id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn image_url(&self) -> Option<&str> {
        self.images.first().map(|i| i.url.as_str())
    }
}

/// Artwork or avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracks
// ─────────────────────────────────────────────────────────────────────────────

/// A track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Artist names joined with `", "`.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First album image (largest, per provider ordering).
    pub fn image_url(&self) -> Option<&str> {
        self.album.images.first().map(|i| i.url.as_str())
    }
}

/// Simplified artist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// Simplified album.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Paging
// ─────────────────────────────────────────────────────────────────────────────

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Response of `GET /v1/search?type=track`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TrackSearchResponse {
    pub tracks: Page<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_from_provider_payload() {
        let track: Track = serde_json::from_str(
            r#"{
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "preview_url": null,
                "popularity": 80,
                "artists": [{"id": "0gxyHStUsqpMadRV0Di1Qt", "name": "Rick Astley"}],
                "album": {"name": "Whenever You Need Somebody", "images": [{"url": "https://i.scdn.co/image/a", "height": 640, "width": 640}]}
            }"#,
        )
        .unwrap();

        assert_eq!(track.artist_names(), "Rick Astley");
        assert_eq!(track.image_url(), Some("https://i.scdn.co/image/a"));
        assert!(track.preview_url.is_none());
    }

    #[test]
    fn test_profile_name_fallback() {
        let profile: UserProfile = serde_json::from_str(r#"{"id":"jam","images":[]}"#).unwrap();
        assert_eq!(profile.name(), "jam");
        assert!(profile.image_url().is_none());
    }

    #[test]
    fn test_multiple_artists() {
        let track = Track {
            id: "t".into(),
            name: "Collab".into(),
            preview_url: None,
            artists: vec![
                Artist {
                    id: None,
                    name: "A".into(),
                },
                Artist {
                    id: None,
                    name: "B".into(),
                },
            ],
            album: Album::default(),
            duration_ms: None,
        };
        assert_eq!(track.artist_names(), "A, B");
    }
}
