use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::error;

use crate::{
    api::ApiError,
    server::AppState,
    types::{FetchPlaylistRequest, FetchPlaylistResponse},
};

/// `POST /api/playlist/fetch`
pub async fn fetch(
    State(state): State<AppState>,
    body: Result<Json<FetchPlaylistRequest>, JsonRejection>,
) -> Result<Json<FetchPlaylistResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;
    let platform = body
        .platform
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Platform is required"))?;

    match platform.trim().to_lowercase().as_str() {
        "spotify" => {}
        "apple-music" => {
            return Err(ApiError::new(
                StatusCode::NOT_IMPLEMENTED,
                "Apple Music not yet implemented",
            ));
        }
        _ => return Err(ApiError::bad_request("Unsupported platform")),
    }

    let Some(spotify) = state.spotify.as_ref() else {
        return Err(ApiError::internal("Spotify credentials not configured"));
    };

    let tracks = spotify.get_playlist_tracks(&url).await.map_err(|e| {
        error!(error = %e, "error fetching playlist");
        ApiError::from(e)
    })?;

    Ok(Json(FetchPlaylistResponse {
        count: tracks.len(),
        tracks,
    }))
}
