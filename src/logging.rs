//! Explicit logging initialization.
//!
//! The tools only emit `tracing` events. A host process that wants them on
//! stderr calls [`init_tracing`] once at startup; stdout stays free for
//! protocol traffic.

use crate::config::LogConfig;
use crate::error::{DbError, DbResult};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> DbResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    result.map_err(|e| DbError::internal(format!("Failed to initialize logging: {}", e)))
}
