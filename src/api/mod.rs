//! # API Module
//!
//! HTTP endpoints of the TuneBridge server, all mounted under `/api`:
//!
//! | Endpoint | Handler |
//! |---|---|
//! | `GET /health` | [`health`] |
//! | `POST /playlist/fetch` | [`fetch`] |
//! | `POST /playlist/youtube/convert` | [`convert`] |
//! | `GET /playlist/youtube/quota/status` | [`quota_status`] |
//! | `POST /playlist/youtube/quota/reset` | [`quota_reset`] |
//! | `GET /playlist/youtube/cache/stats` | [`cache_stats`] |
//! | `GET /playlist/youtube/{playlist_id}` | [`shared_playlist`] |
//!
//! Request-level failures become an [`ApiError`] (`{ "error": message }`).
//! Per-track search failures never do; they travel inside the conversion
//! results as fallback matches.

mod error;
mod health;
mod playlist;
mod rate_limit;
mod youtube;

pub use error::ApiError;
pub use health::health;
pub use playlist::fetch;
pub use rate_limit::{RateLimiter, rate_limit};
pub use youtube::{cache_stats, convert, quota_reset, quota_status, shared_playlist};
