//! Tracing subscriber bootstrap.

use mm_types::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level.
///
/// Returns `false` when a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(true)
        .try_init()
        .is_ok()
}
