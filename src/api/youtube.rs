use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::warn;

use crate::{
    api::ApiError,
    server::AppState,
    types::{ConvertRequest, ConvertResponse, QuotaResetResponse, QuotaStatus, SharedPlaylist},
    utils,
};

/// `POST /api/playlist/youtube/convert`
///
/// Per-track failures never fail the request; they show up as fallback
/// results. Only malformed input is rejected.
pub async fn convert(
    State(state): State<AppState>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let tracks = body
        .tracks
        .ok_or_else(|| ApiError::bad_request("Tracks array is required and must not be empty"))?;

    let output = state.converter.convert(&tracks).await?;

    if let Some(file) = state.quota_file.as_ref() {
        if let Err(e) = file.persist(&state.quota).await {
            warn!(error = %e, "failed to persist quota state");
        }
    }

    let spotify_url = body.spotify_url.filter(|u| !u.trim().is_empty());
    let playlist_id = match spotify_url {
        Some(spotify_url) => {
            let playlist_id = utils::generate_playlist_id(&spotify_url);
            state
                .playlists
                .save(
                    &playlist_id,
                    SharedPlaylist {
                        results: output.results.clone(),
                        summary: output.summary.clone(),
                        source_url: spotify_url,
                        created_at: Utc::now(),
                    },
                )
                .await;
            Some(playlist_id)
        }
        None => None,
    };

    Ok(Json(ConvertResponse {
        results: output.results,
        summary: output.summary,
        playlist_id,
    }))
}

/// `GET /api/playlist/youtube/quota/status`
pub async fn quota_status(State(state): State<AppState>) -> Json<QuotaStatus> {
    Json(state.quota.status().await)
}

/// `POST /api/playlist/youtube/quota/reset`
pub async fn quota_reset(State(state): State<AppState>) -> Json<QuotaResetResponse> {
    let previous_usage = state.quota.reset().await;
    if let Some(file) = state.quota_file.as_ref() {
        if let Err(e) = file.persist(&state.quota).await {
            warn!(error = %e, "failed to persist quota state");
        }
    }

    Json(QuotaResetResponse {
        message: "Quota reset successfully".to_string(),
        previous_usage,
        new_usage: state.quota.units_used().await,
    })
}

/// `GET /api/playlist/youtube/cache/stats`
pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "cache": state.converter.cache().stats().await,
        "storage": state.playlists.stats().await,
    }))
}

/// `GET /api/playlist/youtube/{playlist_id}`
pub async fn shared_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<Json<SharedPlaylist>, ApiError> {
    Ok(Json(state.playlists.get(&playlist_id).await?))
}
