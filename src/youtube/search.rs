use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::Settings,
    management::QuotaTracker,
    types::{MatchCandidate, Track, YouTubeErrorBody, YouTubeSearchItem, YouTubeSearchResponse},
    utils,
};

/// Most tracks a combined OR-query may carry.
pub const MAX_BATCH_TRACKS: usize = 5;

/// YouTube caps `maxResults` for `search.list` at 50.
const MAX_RESULTS_PER_REQUEST: u32 = 50;

/// Category id of "Music" in the YouTube Data API.
const MUSIC_CATEGORY_ID: &str = "10";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("YouTube API error: Invalid request - {0}")]
    InvalidRequest(String),
    #[error("YouTube API quota exceeded or access forbidden: {0}")]
    QuotaExceeded(String),
    #[error("YouTube API error: {0}")]
    Provider(String),
}

/// External catalog search used by the conversion pipeline.
///
/// Implementations charge the quota tracker for each successful request and
/// flag it as exceeded when the provider refuses for quota reasons.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Searches for one track. Candidates come back in provider relevance order.
    async fn search_single(
        &self,
        name: &str,
        artists: &[String],
        max_results: u32,
    ) -> Result<Vec<MatchCandidate>, SearchError>;

    /// Searches for up to [`MAX_BATCH_TRACKS`] tracks with a single combined query
    /// and distributes the shared results by title overlap. Keys are
    /// [`utils::track_identity`] values.
    async fn search_batch(
        &self,
        tracks: &[Track],
        max_results: u32,
    ) -> Result<HashMap<String, Vec<MatchCandidate>>, SearchError>;
}

/// YouTube Data API v3 client.
pub struct YouTubeClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    quota: Arc<QuotaTracker>,
}

impl YouTubeClient {
    pub fn new(
        api_key: Option<String>,
        base_url: &str,
        timeout: Duration,
        quota: Arc<QuotaTracker>,
    ) -> Result<Self, SearchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Provider(format!("build client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            quota,
        })
    }

    pub fn from_settings(
        settings: &Settings,
        quota: Arc<QuotaTracker>,
    ) -> Result<Self, SearchError> {
        Self::new(
            settings.youtube_api_key.clone(),
            &settings.youtube_api_url,
            settings.http_timeout,
            quota,
        )
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<MatchCandidate>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidRequest("empty search query".to_string()));
        }
        if max_results == 0 {
            return Err(SearchError::InvalidRequest(
                "maxResults must be at least 1".to_string(),
            ));
        }
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::Provider(
                "YouTube API key not configured. Please set YOUTUBE_API_KEY".to_string(),
            ));
        };

        let max_results = max_results.min(MAX_RESULTS_PER_REQUEST).to_string();
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("key", api_key),
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
                ("maxResults", max_results.as_str()),
                ("safeSearch", "none"),
                ("order", "relevance"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Provider("request timed out".to_string())
                } else {
                    SearchError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<YouTubeErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown").to_string());

            return Err(match status {
                StatusCode::BAD_REQUEST => SearchError::InvalidRequest(message),
                StatusCode::FORBIDDEN => {
                    self.quota.mark_exceeded().await;
                    SearchError::QuotaExceeded(message)
                }
                _ => SearchError::Provider(format!("({}) {}", status.as_u16(), message)),
            });
        }

        self.quota
            .record_usage(self.quota.limits().cost_per_search)
            .await;

        let body = response
            .json::<YouTubeSearchResponse>()
            .await
            .map_err(|e| SearchError::Provider(format!("invalid response: {}", e)))?;

        debug!(query, results = body.items.len(), "YouTube search completed");
        Ok(body.items.into_iter().filter_map(to_candidate).collect())
    }
}

#[async_trait]
impl SearchProvider for YouTubeClient {
    async fn search_single(
        &self,
        name: &str,
        artists: &[String],
        max_results: u32,
    ) -> Result<Vec<MatchCandidate>, SearchError> {
        self.search(&utils::search_query(name, artists), max_results)
            .await
    }

    async fn search_batch(
        &self,
        tracks: &[Track],
        max_results: u32,
    ) -> Result<HashMap<String, Vec<MatchCandidate>>, SearchError> {
        let query = batch_query(tracks)?;
        let requested = max_results.saturating_mul(tracks.len() as u32);
        let candidates = self.search(&query, requested).await?;
        Ok(attribute_batch_results(tracks, &candidates, max_results))
    }
}

/// Combines up to [`MAX_BATCH_TRACKS`] track queries into one OR-query.
pub fn batch_query(tracks: &[Track]) -> Result<String, SearchError> {
    if tracks.is_empty() {
        return Err(SearchError::InvalidRequest("no tracks in batch".to_string()));
    }
    if tracks.len() > MAX_BATCH_TRACKS {
        return Err(SearchError::InvalidRequest(format!(
            "batch holds {} tracks, at most {} allowed",
            tracks.len(),
            MAX_BATCH_TRACKS
        )));
    }

    Ok(tracks
        .iter()
        .map(|t| format!("({})", utils::search_query(&t.name, &t.artists)))
        .collect::<Vec<_>>()
        .join(" | "))
}

/// Hands each track the candidates whose title contains the track name or one
/// of its artists, case-insensitively, keeping relevance order and at most
/// `max_results` per track. Tracks without any overlap map to an empty list.
pub fn attribute_batch_results(
    tracks: &[Track],
    candidates: &[MatchCandidate],
    max_results: u32,
) -> HashMap<String, Vec<MatchCandidate>> {
    let mut out = HashMap::new();

    for track in tracks {
        let needles: Vec<String> = std::iter::once(&track.name)
            .chain(track.artists.iter())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let matched: Vec<MatchCandidate> = candidates
            .iter()
            .filter(|c| {
                let title = c.title.to_lowercase();
                needles.iter().any(|n| title.contains(n.as_str()))
            })
            .take(max_results as usize)
            .cloned()
            .collect();

        if matched.is_empty() {
            warn!(track = %track.name, "no batch result overlaps this track");
        }
        out.entry(utils::track_identity(track)).or_insert(matched);
    }

    out
}

fn to_candidate(item: YouTubeSearchItem) -> Option<MatchCandidate> {
    let video_id = item.id.video_id?;
    let thumbnail_url = item
        .snippet
        .thumbnails
        .and_then(|t| t.medium.or(t.default))
        .map(|t| t.url);

    Some(MatchCandidate {
        url: utils::watch_url(&video_id),
        video_id: Some(video_id),
        title: item.snippet.title,
        channel_title: item.snippet.channel_title,
        channel_id: item.snippet.channel_id,
        thumbnail_url,
        published_at: item.snippet.published_at,
        is_fallback: false,
    })
}
