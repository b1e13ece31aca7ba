//! # CLI Module
//!
//! Command implementations for the `tunebridge` binary. Each command loads
//! settings, talks to the same services the HTTP server uses, and reports
//! through the colored output macros.
//!
//! ## Commands
//!
//! - [`serve`] - Runs the HTTP API server
//! - [`fetch`] - Lists the tracks of a Spotify playlist
//! - [`convert`] - Fetches a playlist and matches every track on YouTube
//! - [`quota`] - Shows or resets the locally tracked YouTube quota
//!
//! ## Quota between runs
//!
//! The CLI and the server share the quota snapshot stored in the local data
//! directory, so consecutive conversions draw from the same daily budget.
//!
//! ## Usage Patterns
//!
//! ```bash
//! tunebridge serve
//! tunebridge fetch --url https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M
//! tunebridge convert --url https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M --limit 10
//! tunebridge quota --reset
//! ```

mod convert;
mod fetch;
mod quota;
mod serve;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{config::Settings, error};

pub use convert::convert;
pub use fetch::fetch;
pub use quota::quota;
pub use serve::serve;

fn load_settings() -> Settings {
    match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => error!("Invalid configuration: {}", e),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
