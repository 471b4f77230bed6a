//! Spotify Web API client for BeJam.
//!
//! A thin typed client over the handful of endpoints the app uses. Access
//! tokens come from an [`AccessTokenProvider`](bejam_oauth::AccessTokenProvider),
//! normally the token manager, which refreshes them when they expire.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bejam_client::{Result, SpotifyClient};
//! use bejam_oauth::{OAuthConfig, TokenManager, create_memory_store};
//!
//! # async fn example() -> Result<()> {
//! let tokens = Arc::new(TokenManager::new(OAuthConfig::spotify(), create_memory_store()));
//! let client = SpotifyClient::builder().token_provider(tokens).build()?;
//!
//! let me = client.users().me().await?;
//! println!("Logged in as {}", me.name());
//!
//! for track in client.tracks().top(10).await? {
//!     println!("{} - {}", track.name, track.artist_names());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Users**: current profile, any user's public profile
//! - **Tracks**: search, top tracks, save to library
//! - **Follow**: follow and unfollow users

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientBuilder, DEFAULT_BASE_URL, SpotifyClient, StaticToken};
pub use error::{Error, Result};
pub use types::*;
