//! Diagnostics on stderr via `tracing`.
//!
//! Stdout is reserved for the single JSON result line, so the subscriber
//! always writes to stderr and stays silent unless a level is requested.

use tracing_subscriber::EnvFilter;

use super::config::DEFAULT_LOG_LEVEL;

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
