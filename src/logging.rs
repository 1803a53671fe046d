// src/logging.rs
//! Tracing bootstrap for the CLI.
//!
//! Filter comes from `RUST_LOG` (default `curator=info,warn`). `CURATOR_LOG_JSON=1`
//! switches to JSON lines. Logs always go to stderr so exports on stdout stay parseable.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "curator=info,warn";
pub const ENV_LOG_JSON: &str = "CURATOR_LOG_JSON";

fn json_requested(raw: Option<String>) -> bool {
    raw.is_some_and(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_requested(std::env::var(ENV_LOG_JSON).ok()) {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
    // already initialized (tests, embedding): keep the existing subscriber
    let _ = result;
}
