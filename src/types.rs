use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// A track as fetched from the source platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub isrc: Option<String>,
}

impl Track {
    pub fn new(name: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            name: name.into(),
            artists,
            album: None,
            duration_ms: None,
            isrc: None,
        }
    }
}

/// A YouTube candidate for a track. Fallback candidates carry no video id and
/// point to a search results page instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub video_id: Option<String>,
    pub title: String,
    pub channel_title: String,
    pub channel_id: Option<String>,
    #[serde(alias = "thumbnail")]
    pub thumbnail_url: Option<String>,
    pub published_at: Option<String>,
    pub url: String,
    #[serde(default)]
    pub is_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeMatch {
    pub matches: Vec<MatchCandidate>,
    pub top_match: Option<MatchCandidate>,
    pub error: Option<String>,
    pub is_fallback: Option<bool>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub original: Track,
    pub youtube: YouTubeMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    pub total: usize,
    /// Results with any top match, fallbacks included.
    pub successful: usize,
    pub failed: usize,
    /// Genuine matches over total, formatted as a percentage.
    pub success_rate: String,
    pub matched: usize,
    pub fallbacks: usize,
    pub quota_used: u64,
    pub quota_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutput {
    pub results: Vec<ConversionResult>,
    pub summary: ConversionSummary,
}

/// Persisted quota counters. Written by the quota tracker only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub units_used_today: u64,
    pub exceeded: bool,
    pub last_reset_day: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub quota_used: u64,
    pub quota_limit: u64,
    pub quota_remaining: u64,
    pub quota_exceeded: bool,
    pub last_reset_date: NaiveDate,
    pub searches_used: u64,
    pub searches_remaining: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaResetResponse {
    pub message: String,
    pub previous_usage: u64,
    pub new_usage: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

/// A completed conversion stored for shareable retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPlaylist {
    pub results: Vec<ConversionResult>,
    pub summary: ConversionSummary,
    #[serde(alias = "spotifyUrl")]
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub backend: String,
    pub keys: usize,
}

// HTTP request/response bodies

#[derive(Debug, Clone, Deserialize)]
pub struct FetchPlaylistRequest {
    pub url: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPlaylistResponse {
    pub tracks: Vec<Track>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub tracks: Option<Vec<Track>>,
    pub spotify_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub results: Vec<ConversionResult>,
    pub summary: ConversionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

// Spotify Web API payloads

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub tracks: SpotifyTrackPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrackPage {
    pub items: Vec<SpotifyPlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
    pub duration_ms: Option<u64>,
    pub external_ids: Option<SpotifyExternalIds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyExternalIds {
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyErrorBody {
    pub error: SpotifyErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyErrorDetail {
    pub message: String,
}

// YouTube Data API payloads

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeSearchResponse {
    #[serde(default)]
    pub items: Vec<YouTubeSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeSearchItem {
    pub id: YouTubeItemId,
    pub snippet: YouTubeSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeItemId {
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSnippet {
    pub title: String,
    pub channel_title: String,
    pub channel_id: Option<String>,
    pub published_at: Option<String>,
    pub thumbnails: Option<YouTubeThumbnails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeThumbnails {
    pub medium: Option<YouTubeThumbnail>,
    pub default: Option<YouTubeThumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeErrorBody {
    pub error: YouTubeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeErrorDetail {
    pub message: String,
}

// CLI tables

#[derive(Tabled)]
pub struct TrackTableRow {
    pub name: String,
    pub artists: String,
    pub album: String,
}

#[derive(Tabled)]
pub struct ConversionTableRow {
    pub track: String,
    pub artists: String,
    pub youtube: String,
    pub url: String,
}
