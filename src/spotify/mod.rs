//! # Spotify Integration Module
//!
//! Fetches playlists from the Spotify Web API using the client-credentials flow.
//! Only public playlists are reachable; no user authorization is involved.
//!
//! ```text
//! CLI / HTTP handlers
//!          ↓
//! SpotifyClient ── TokenManager (client-credentials token, cached until expiry)
//!          ↓
//! GET /playlists/{id}  →  follow tracks.next  →  Vec<Track>
//! ```
//!
//! Status codes are mapped to [`SpotifyError`] variants so the HTTP layer can
//! return a specific message for each (404 private/deleted, 401 credentials,
//! 403 forbidden, 429 rate limited).

pub mod auth;
pub mod playlist;

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{config::Settings, management::TokenManager};

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Invalid Spotify playlist URL")]
    InvalidUrl,
    #[error("Spotify authentication failed: {0}")]
    Auth(String),
    #[error("Playlist not found. It may be private or deleted")]
    NotFound,
    #[error("Access to this playlist is forbidden")]
    Forbidden,
    #[error("Spotify rate limit reached. Please try again later")]
    RateLimited,
    #[error("Spotify API error: {0}")]
    Upstream(String),
    #[error("Spotify request failed: {0}")]
    Http(String),
    #[error("Spotify credentials not configured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SpotifyError {
    fn from(e: reqwest::Error) -> Self {
        SpotifyError::Http(e.to_string())
    }
}

/// Spotify Web API client with a cached client-credentials token.
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        api_url: &str,
        token_url: &str,
        timeout: Duration,
    ) -> Result<Self, SpotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpotifyError::Http(format!("build client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens: Mutex::new(TokenManager::new(client_id, client_secret, token_url)),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SpotifyError> {
        let (id, secret) = settings
            .spotify_credentials()
            .map_err(|e| SpotifyError::Config(e.to_string()))?;
        Self::new(
            id,
            secret,
            &settings.spotify_api_url,
            &settings.spotify_token_url,
            settings.http_timeout,
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Sends an authorized GET request.
    pub async fn get(&self, url: &str) -> Result<Response, SpotifyError> {
        let token = self.tokens.lock().await.get_valid_token(&self.http).await?;
        Ok(self.http.get(url).bearer_auth(token).send().await?)
    }

    pub async fn get_playlist_tracks(
        &self,
        url: &str,
    ) -> Result<Vec<crate::types::Track>, SpotifyError> {
        playlist::get_playlist_tracks(self, url).await
    }
}
