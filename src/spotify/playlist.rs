use reqwest::{Response, StatusCode};
use tracing::{debug, info};

use crate::{
    spotify::{SpotifyClient, SpotifyError},
    types::{SpotifyErrorBody, SpotifyPlaylist, SpotifyTrackPage, Track},
    utils,
};

/// Fetches every track of a public Spotify playlist.
///
/// Follows the `next` links of the track page until the playlist is exhausted.
/// Items whose `track` is null (removed or local files) are skipped, and so
/// are tracks without a name or artist.
///
/// # Errors
///
/// - [`SpotifyError::InvalidUrl`] if `url` is not a Spotify playlist link
/// - [`SpotifyError::NotFound`] for private or deleted playlists
/// - [`SpotifyError::Forbidden`], [`SpotifyError::RateLimited`], [`SpotifyError::Auth`]
///   for the corresponding upstream statuses
pub async fn get_playlist_tracks(
    client: &SpotifyClient,
    url: &str,
) -> Result<Vec<Track>, SpotifyError> {
    let playlist_id =
        utils::extract_spotify_playlist_id(url).ok_or(SpotifyError::InvalidUrl)?;

    let first_url = format!(
        "{uri}/playlists/{id}",
        uri = client.api_url(),
        id = playlist_id
    );
    let playlist = check_status(client.get(&first_url).await?)
        .await?
        .json::<SpotifyPlaylist>()
        .await?;

    let mut tracks = normalize_page(&playlist.tracks);
    let mut next = playlist.tracks.next;

    while let Some(page_url) = next {
        debug!(%page_url, "fetching next playlist page");
        let page = check_status(client.get(&page_url).await?)
            .await?
            .json::<SpotifyTrackPage>()
            .await?;
        tracks.extend(normalize_page(&page));
        next = page.next;
    }

    info!(playlist_id, count = tracks.len(), "fetched Spotify playlist");
    Ok(tracks)
}

/// Converts a page of playlist items into tracks.
///
/// Empty items are dropped, as are tracks left without a name or any named
/// artist once names are trimmed; the converter would reject them.
pub fn normalize_page(page: &SpotifyTrackPage) -> Vec<Track> {
    page.items
        .iter()
        .filter_map(|item| item.track.as_ref())
        .filter_map(|t| {
            let name = t.name.trim();
            let artists: Vec<String> = t
                .artists
                .iter()
                .map(|a| a.name.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            if name.is_empty() || artists.is_empty() {
                debug!(name = %t.name, "skipping playlist item without name or artists");
                return None;
            }

            Some(Track {
                name: name.to_string(),
                artists,
                album: t.album.as_ref().map(|a| a.name.clone()),
                duration_ms: t.duration_ms,
                isrc: t.external_ids.as_ref().and_then(|ids| ids.isrc.clone()),
            })
        })
        .collect()
}

async fn check_status(response: Response) -> Result<Response, SpotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<SpotifyErrorBody>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown").to_string());

    Err(match status {
        StatusCode::NOT_FOUND => SpotifyError::NotFound,
        StatusCode::UNAUTHORIZED => SpotifyError::Auth(message),
        StatusCode::FORBIDDEN => SpotifyError::Forbidden,
        StatusCode::TOO_MANY_REQUESTS => SpotifyError::RateLimited,
        _ => SpotifyError::Upstream(format!("HTTP {}: {}", status.as_u16(), message)),
    })
}
