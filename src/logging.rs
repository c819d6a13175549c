//! Logging setup.
//!
//! Logs go to stderr through a `tracing` fmt subscriber. `RUST_LOG` wins over
//! the built-in level so a user can turn on module-level tracing without a
//! rebuild. Status lines of dispatched actions are printed to stdout
//! separately and are not affected by the filter.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let subscriber = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    tracing::info!("ledpanel v{} started", env!("CARGO_PKG_VERSION"));
    Ok(())
}
