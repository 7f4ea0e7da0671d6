use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::GridError;

pub const ENV_LOG: &str = "GRIDQ_LOG";

/// Log to stderr so stdout stays reserved for emitted events.
/// `GRIDQ_LOG` (or `RUST_LOG`) overrides the default level.
pub fn init(verbose: bool) -> Result<(), GridError> {
    let default_filter = if verbose { "gridq=debug" } else { "gridq=warn" };
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_filter.to_string());
    let filter = EnvFilter::try_new(&filter)
        .map_err(|e| GridError::Config(format!("invalid log filter '{filter}': {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| GridError::Config(format!("logging already initialized: {e}")))
}
