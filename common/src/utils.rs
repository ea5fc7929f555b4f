// common/src/utils.rs
use tracing_subscriber::EnvFilter;

use crate::error::ConfigurationError;

/// Setup tracing for the service. `RUST_LOG` wins over `default_level`.
pub fn setup_tracing(default_level: &str) -> Result<(), ConfigurationError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ConfigurationError::Tracing(e.to_string()))
}
