//! # YouTube Conversion Module
//!
//! Matches tracks against the YouTube Data API v3 under its daily quota.
//!
//! ```text
//! Vec<Track>
//!     ↓ dedupe by identity (name + artists)
//!     ↓ CacheStore lookup ──────────────── hit → matches
//!     ↓ QuotaTracker budget ─────────────── over budget → fallback link
//!     ↓ waves of 5 concurrent searches ──── error → fallback link
//!     ↓ completion sweep
//! results (same order and length as input) + summary
//! ```
//!
//! ## Quota
//!
//! A `search.list` call costs a flat number of units regardless of how many
//! results it returns. The tracker enforces both the daily unit budget and a
//! stricter per-session search cap, and re-checks between waves so a
//! provider-reported 403 stops the remaining searches of the run.
//!
//! ## Fallbacks
//!
//! A track that cannot be matched is never dropped. It gets a single
//! candidate with `isFallback = true` pointing at a YouTube search page for
//! `"{name} {artists} official audio"`, plus a `fallbackReason`.
//!
//! ## Summary fields
//!
//! `successful` counts every result with a top match, fallbacks included,
//! while `successRate` only counts genuine matches. Both are reported.

pub mod convert;
pub mod search;

pub use convert::{ConversionError, Converter, ConverterOptions};
pub use search::{SearchError, SearchProvider, YouTubeClient};
