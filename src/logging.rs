//! Tracing setup for the binary.
//!
//! `RUST_LOG` takes precedence; otherwise the given default directives apply.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const DEFAULT_FILTER: &str = "tunebridge=info";

/// Installs the global subscriber. Calling it twice is a no-op.
pub fn init_logging(default_filter: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
