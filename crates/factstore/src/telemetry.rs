//! Logging setup.

use crate::config::LoggingConfig;
use crate::error::{StoreError, StoreResult};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `level` when set. Events go to stderr; with `json`,
/// as one JSON object per line. Fails if a subscriber is already installed.
pub fn init_logging(level: &str, json: bool) -> StoreResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| StoreError::Config(format!("invalid log filter {level:?}: {e}")))?;

    let registry = tracing_subscriber::registry();
    let installed = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_filter(env_filter),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_filter(env_filter),
            )
            .try_init()
    };
    installed.map_err(|e| StoreError::Config(format!("failed to initialize tracing subscriber: {e}")))?;

    tracing::debug!(log_level = level, json, "logging initialized");
    Ok(())
}

/// [`init_logging`] driven by the `[logging]` config section.
pub fn init_from_config(logging: &LoggingConfig) -> StoreResult<()> {
    init_logging(&logging.level, logging.json)
}
