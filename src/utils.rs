use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::types::{MatchCandidate, Track};

/// Length of the public id generated for a shared playlist.
pub const PLAYLIST_ID_LEN: usize = 12;

const YOUTUBE_SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";
const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Key under which search results for a track are cached.
///
/// Only name and artists take part; album, duration and ISRC are ignored.
pub fn cache_key(name: &str, artists: &[String]) -> String {
    let artists = artists
        .iter()
        .map(|a| normalize(a))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}_{}", normalize(name), artists)
}

/// Identity used to deduplicate tracks within a single conversion.
pub fn track_identity(track: &Track) -> String {
    let artists = track
        .artists
        .iter()
        .map(|a| normalize(a))
        .collect::<Vec<_>>()
        .join("\u{1f}");
    format!("{}\u{1e}{}", normalize(&track.name), artists)
}

/// Builds the provider search query for a track: `"name artist1 artist2"`.
pub fn search_query(name: &str, artists: &[String]) -> String {
    let mut parts = vec![name.trim().to_string()];
    parts.extend(
        artists
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
    );
    parts.join(" ")
}

pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", YOUTUBE_WATCH_URL, video_id)
}

/// Generic YouTube search page for a track. Pure function of name and artists.
pub fn fallback_url(name: &str, artists: &[String]) -> String {
    let query = format!("{} {} official audio", name, artists.join(" "));
    format!("{}{}", YOUTUBE_SEARCH_URL, urlencoding::encode(&query))
}

/// Synthesizes the placeholder candidate used when no real match is available.
pub fn fallback_candidate(track: &Track) -> MatchCandidate {
    MatchCandidate {
        video_id: None,
        title: format!("{} - {}", track.name, track.artists.join(", ")),
        channel_title: "YouTube Search".to_string(),
        channel_id: None,
        thumbnail_url: None,
        published_at: None,
        url: fallback_url(&track.name, &track.artists),
        is_fallback: true,
    }
}

/// Derives the public id of a shared playlist from its source URL.
pub fn generate_playlist_id(spotify_url: &str) -> String {
    let hash = Sha256::digest(spotify_url.trim().as_bytes());
    let mut id = URL_SAFE_NO_PAD.encode(hash);
    id.truncate(PLAYLIST_ID_LEN);
    id
}

/// Returns true if `id` looks like something [`generate_playlist_id`] produced.
pub fn is_valid_playlist_id(id: &str) -> bool {
    id.len() == PLAYLIST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extracts the playlist id from a Spotify playlist URL or URI.
///
/// Accepted forms:
/// - `https://open.spotify.com/playlist/{id}` (optional `intl-xx` prefix and query)
/// - `spotify:playlist:{id}`
pub fn extract_spotify_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();

    if let Some(id) = input.strip_prefix("spotify:playlist:") {
        return valid_spotify_id(id);
    }

    let url = Url::parse(input).ok()?;
    if !matches!(url.scheme(), "https" | "http") {
        return None;
    }
    if !url
        .host_str()
        .is_some_and(|h| h.eq_ignore_ascii_case("open.spotify.com"))
    {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let mut segment = segments.next()?;
    if segment.starts_with("intl-") {
        segment = segments.next()?;
    }
    if segment != "playlist" {
        return None;
    }
    valid_spotify_id(segments.next()?)
}

fn valid_spotify_id(id: &str) -> Option<String> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id.to_string())
    } else {
        None
    }
}

/// Formats `part / total` as a percentage with one decimal, e.g. `"66.7%"`.
pub fn format_success_rate(part: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / total as f64)
}

/// Truncates `value` to at most `max` characters, appending an ellipsis.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
