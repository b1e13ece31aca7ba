use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per client IP.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    message: &'static str,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration, message: &'static str) -> Self {
        Self {
            max,
            window,
            message,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request from `client`. Returns the time left in the window when
    /// the client is over its limit.
    pub async fn check(&self, client: IpAddr) -> Result<(), Duration> {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();

        // keep the map bounded by dropping finished windows
        if clients.len() > 10_000 {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max {
            return Err(self.window.saturating_sub(now.duration_since(entry.started)));
        }
        entry.count += 1;
        Ok(())
    }
}

/// Middleware rejecting over-limit clients with 429.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(client).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            debug!(%client, "rate limit reached");
            let minutes = limiter.window.as_secs().div_ceil(60);
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": limiter.message,
                    "retryAfter": format!("{} minutes", minutes),
                })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}
