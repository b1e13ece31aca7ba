use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::{
    api::{self, RateLimiter},
    config::{RateLimitSettings, Settings, StorageBackend},
    management::{CacheStore, PlaylistStore, QuotaStateFile, QuotaTracker},
    spotify::SpotifyClient,
    youtube::{Converter, ConverterOptions, YouTubeClient},
};

/// How often expired search results and shared playlists are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    pub quota: Arc<QuotaTracker>,
    pub spotify: Option<Arc<SpotifyClient>>,
    pub playlists: Arc<PlaylistStore>,
    pub quota_file: Option<Arc<QuotaStateFile>>,
}

impl AppState {
    /// Wires the production services from settings.
    pub fn from_settings(settings: &Settings) -> crate::Res<Self> {
        let quota = Arc::new(QuotaTracker::new(settings.quota));
        let cache = Arc::new(CacheStore::new(settings.cache_ttl));
        let youtube = YouTubeClient::from_settings(settings, Arc::clone(&quota))?;
        let converter = Converter::new(
            Arc::new(youtube),
            cache,
            Arc::clone(&quota),
            ConverterOptions::from_settings(settings),
        );

        let spotify = match SpotifyClient::from_settings(settings) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "Spotify client unavailable");
                None
            }
        };

        let playlists = match settings.storage {
            StorageBackend::Memory => PlaylistStore::in_memory(settings.playlist_ttl),
            StorageBackend::File => PlaylistStore::on_disk(
                crate::config::data_dir().join("playlists"),
                settings.playlist_ttl,
            ),
        };

        Ok(Self {
            converter: Arc::new(converter),
            quota,
            spotify,
            playlists: Arc::new(playlists),
            quota_file: Some(Arc::new(QuotaStateFile::default_location())),
        })
    }
}

/// Builds the `/api` router with per-route rate limits and CORS for any origin.
pub fn router(state: AppState, limits: &RateLimitSettings) -> Router {
    let limiter = |max: u32, message: &'static str| {
        Arc::new(RateLimiter::new(max, limits.window, message))
    };
    let convert_limiter = limiter(
        limits.convert_max,
        "Too many conversion requests. Please wait 15 minutes before trying again.",
    );
    let fetch_limiter = limiter(
        limits.fetch_max,
        "Too many playlist fetch requests. Please wait before trying again.",
    );
    let shared_limiter = limiter(
        limits.shared_max,
        "Too many requests. Please wait before accessing more playlists.",
    );
    let general_limiter = limiter(limits.general_max, "Too many requests. Please slow down.");

    let routes = Router::new()
        .route("/health", get(api::health))
        .route(
            "/playlist/fetch",
            post(api::fetch).layer(middleware::from_fn_with_state(
                fetch_limiter,
                api::rate_limit,
            )),
        )
        .route(
            "/playlist/youtube/convert",
            post(api::convert).layer(middleware::from_fn_with_state(
                convert_limiter,
                api::rate_limit,
            )),
        )
        .route("/playlist/youtube/quota/status", get(api::quota_status))
        .route("/playlist/youtube/quota/reset", post(api::quota_reset))
        .route("/playlist/youtube/cache/stats", get(api::cache_stats))
        .route(
            "/playlist/youtube/{playlist_id}",
            get(api::shared_playlist).layer(middleware::from_fn_with_state(
                shared_limiter,
                api::rate_limit,
            )),
        )
        .layer(middleware::from_fn_with_state(
            general_limiter,
            api::rate_limit,
        ));

    Router::new()
        .nest("/api", routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_api_server(settings: &Settings, state: AppState) -> crate::Res<()> {
    let addr = settings.socket_addr()?;

    if let Some(file) = state.quota_file.as_ref() {
        match file.restore_into(&state.quota).await {
            Ok(true) => info!("restored quota state"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable quota state"),
        }
    }

    let cache = Arc::clone(state.converter.cache());
    let playlists = Arc::clone(&state.playlists);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                info!(purged, "purged expired search results");
            }
            let purged = playlists.purge_expired().await;
            if purged > 0 {
                info!(purged, "purged expired shared playlists");
            }
        }
    });

    let quota = Arc::clone(&state.quota);
    let quota_file = state.quota_file.clone();
    let app = router(state, &settings.rate_limits);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "TuneBridge API listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    if let Some(file) = quota_file {
        if let Err(e) = file.persist(&quota).await {
            warn!(error = %e, "failed to persist quota state on shutdown");
        }
    }
    Ok(())
}
