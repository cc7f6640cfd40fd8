//! Logging setup built on tracing with env-filter support

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber
///
/// Respects `RUST_LOG`; defaults to `info` for this crate and `warn`
/// elsewhere. Panics if a subscriber is already installed.
pub fn init() {
    try_init().expect("failed to install tracing subscriber");
}

/// Fallible variant of [`init`] for embedders that may already log
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,hublink=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
