use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use tunebridge::api::{self, RateLimiter};
use tunebridge::config::{QuotaLimits, RateLimitSettings};
use tunebridge::management::{CacheStore, ManualClock, PlaylistStore, QuotaTracker};
use tunebridge::server::{self, AppState};
use tunebridge::types::{ConvertRequest, FetchPlaylistRequest, MatchCandidate, Track};
use tunebridge::utils;
use tunebridge::youtube::{Converter, ConverterOptions, SearchError, SearchProvider};

/// Returns one candidate per search and charges the tracker.
struct OneHitProvider {
    quota: Arc<QuotaTracker>,
}

#[async_trait]
impl SearchProvider for OneHitProvider {
    async fn search_single(
        &self,
        name: &str,
        _artists: &[String],
        _max_results: u32,
    ) -> Result<Vec<MatchCandidate>, SearchError> {
        self.quota
            .record_usage(self.quota.limits().cost_per_search)
            .await;
        Ok(vec![MatchCandidate {
            video_id: Some("vid".to_string()),
            title: format!("{} (Official Audio)", name),
            channel_title: "Channel".to_string(),
            channel_id: None,
            thumbnail_url: None,
            published_at: None,
            url: utils::watch_url("vid"),
            is_fallback: false,
        }])
    }

    async fn search_batch(
        &self,
        _tracks: &[Track],
        _max_results: u32,
    ) -> Result<HashMap<String, Vec<MatchCandidate>>, SearchError> {
        Ok(HashMap::new())
    }
}

fn state() -> AppState {
    let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let quota = Arc::new(QuotaTracker::with_clock(QuotaLimits::default(), Box::new(clock)));
    let provider = Arc::new(OneHitProvider {
        quota: Arc::clone(&quota),
    });
    let converter = Converter::new(
        provider,
        Arc::new(CacheStore::new(Duration::from_secs(60))),
        Arc::clone(&quota),
        ConverterOptions {
            throttle_delay: Duration::ZERO,
            ..ConverterOptions::default()
        },
    );

    AppState {
        converter: Arc::new(converter),
        quota,
        spotify: None,
        playlists: Arc::new(PlaylistStore::in_memory(Duration::from_secs(60))),
        quota_file: None,
    }
}

fn convert_body(tracks: Option<Vec<Track>>, spotify_url: Option<&str>) -> ConvertRequest {
    ConvertRequest {
        tracks,
        spotify_url: spotify_url.map(str::to_string),
    }
}

fn fetch_body(url: Option<&str>, platform: Option<&str>) -> FetchPlaylistRequest {
    FetchPlaylistRequest {
        url: url.map(str::to_string),
        platform: platform.map(str::to_string),
    }
}

#[tokio::test]
async fn test_health() {
    let Json(body) = api::health().await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_convert_returns_results_and_summary() {
    let tracks = vec![Track::new("Song", vec!["Artist".to_string()])];
    let Json(response) = api::convert(State(state()), Ok(Json(convert_body(Some(tracks), None))))
        .await
        .unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.summary.total, 1);
    assert_eq!(response.summary.success_rate, "100.0%");
    assert_eq!(response.summary.quota_used, 100);
    assert_eq!(response.playlist_id, None);
}

#[tokio::test]
async fn test_convert_rejects_missing_or_empty_tracks() {
    let err = api::convert(State(state()), Ok(Json(convert_body(None, None))))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "Tracks array is required and must not be empty");

    let err = api::convert(State(state()), Ok(Json(convert_body(Some(Vec::new()), None))))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_converted_playlist_can_be_shared() {
    let state = state();
    let url = "https://open.spotify.com/playlist/abc123";
    let tracks = vec![Track::new("Song", vec!["Artist".to_string()])];

    let Json(response) = api::convert(
        State(state.clone()),
        Ok(Json(convert_body(Some(tracks), Some(url)))),
    )
    .await
    .unwrap();
    let playlist_id = response.playlist_id.unwrap();
    assert_eq!(playlist_id, utils::generate_playlist_id(url));

    let Json(shared) = api::shared_playlist(State(state), Path(playlist_id))
        .await
        .unwrap();
    assert_eq!(shared.source_url, url);
    assert_eq!(shared.results, response.results);
}

#[tokio::test]
async fn test_unknown_shared_playlist_is_404() {
    let err = api::shared_playlist(State(state()), Path("AAAAAAAAAAAA".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.message, "Playlist not found or expired");
}

#[tokio::test]
async fn test_quota_status_and_reset() {
    let state = state();
    state.quota.record_usage(300).await;

    let Json(status) = api::quota_status(State(state.clone())).await;
    assert_eq!(status.quota_used, 300);
    assert_eq!(status.quota_remaining, 9_700);

    let Json(reset) = api::quota_reset(State(state.clone())).await;
    assert_eq!(reset.previous_usage, 300);
    assert_eq!(reset.new_usage, 0);
    assert_eq!(state.quota.units_used().await, 0);
}

#[tokio::test]
async fn test_cache_stats() {
    let state = state();
    let tracks = vec![Track::new("Song", vec!["Artist".to_string()])];
    api::convert(State(state.clone()), Ok(Json(convert_body(Some(tracks), None))))
        .await
        .unwrap();

    let Json(stats) = api::cache_stats(State(state)).await;
    assert_eq!(stats["cache"]["keys"], 1);
    assert_eq!(stats["cache"]["misses"], 1);
    assert_eq!(stats["storage"]["backend"], "memory");
}

#[tokio::test]
async fn test_fetch_validates_input() {
    let err = api::fetch(State(state()), Ok(Json(fetch_body(None, Some("spotify")))))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "URL is required");

    let err = api::fetch(State(state()), Ok(Json(fetch_body(Some("x"), None))))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "Platform is required");

    let err = api::fetch(
        State(state()),
        Ok(Json(fetch_body(Some("x"), Some("tidal")))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fetch_apple_music_is_not_implemented() {
    let err = api::fetch(
        State(state()),
        Ok(Json(fetch_body(Some("https://music.apple.com/x"), Some("apple-music")))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_fetch_without_spotify_credentials() {
    let err = api::fetch(
        State(state()),
        Ok(Json(fetch_body(
            Some("https://open.spotify.com/playlist/abc123"),
            Some("spotify"),
        ))),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_fixed_window() {
    let limiter = RateLimiter::new(2, Duration::from_secs(900), "slow down");
    let client = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    assert!(limiter.check(client).await.is_ok());
    assert!(limiter.check(client).await.is_ok());
    let retry_after = limiter.check(client).await.unwrap_err();
    assert_eq!(retry_after, Duration::from_secs(900));

    // limits are per client
    assert!(limiter.check(other).await.is_ok());

    tokio::time::advance(Duration::from_secs(900)).await;
    assert!(limiter.check(client).await.is_ok());
}

async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn allow_origin(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let base = serve(server::router(state(), &RateLimitSettings::default())).await;

    let response = reqwest::Client::new()
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/playlist/youtube/convert", base),
        )
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(allow_origin(&response).as_deref(), Some("*"));
}

#[tokio::test]
async fn test_cors_headers_on_regular_requests() {
    let base = serve(server::router(state(), &RateLimitSettings::default())).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/playlist/youtube/quota/status", base))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(allow_origin(&response).as_deref(), Some("*"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["quotaLimit"], 10_000);
}
