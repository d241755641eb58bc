//! Global subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tubescribe_core::config::LoggingConfig;

use crate::tracing_layer::LogHistory;

/// Installs the process-wide subscriber: human-readable output on stderr,
/// filtered by `RUST_LOG` or the configured directive, plus the in-memory
/// history which records every event regardless of the filter.
///
/// Calling it again keeps the first subscriber; the returned history is then
/// never written to.
pub fn init_tracing(config: &LoggingConfig) -> LogHistory {
    let history = LogHistory::new(config.history_capacity);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter);

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .with(history.layer())
        .try_init()
        .is_err()
    {
        tracing::debug!("[Logging] Subscriber already installed");
    }
    history
}
