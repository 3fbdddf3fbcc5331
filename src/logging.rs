// src/logging.rs
// =============================================================================
// Sets up `tracing` output for the whole process.
//
// - Logs go to stdout in the compact format, next to our println! output
// - RUST_LOG wins if it is set (e.g. RUST_LOG=tally_harvester=debug,sqlx=warn)
// - Otherwise the --log-level value is used
// =============================================================================

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Installs the global subscriber
//
// Fails if the filter is not valid or a subscriber is already installed.
pub fn init_logging(default_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level '{}'", default_level))?,
    };

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| anyhow!("Could not install logger: {}", e))
}
