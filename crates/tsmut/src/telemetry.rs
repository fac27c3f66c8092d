//! Logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding program. [`init_logging`] is a convenience for tests and
//! small drivers.

use crate::result::{TsError, TsResult};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`.
///
/// # Errors
/// `InvalidConfig` if the filter does not parse or a global subscriber is
/// already installed.
pub fn init_logging(default_filter: &str) -> TsResult<()> {
    tracing::subscriber::set_global_default(subscriber(default_filter, std::io::stderr)?)
        .map_err(|e| TsError::invalid_config(format!("logging already initialised: {e}")))
}

/// `fmt` subscriber with the environment-aware filter, writing to `writer`.
///
/// # Errors
/// `InvalidConfig` if the filter does not parse.
pub fn subscriber<W>(default_filter: &str, writer: W) -> TsResult<impl Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| TsError::invalid_config(format!("log filter: {e}")))?,
    };

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish())
}
