// common/src/error.rs

/// Misconfiguration detected at startup. Fatal: the server must not start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("session signing key is {len} bytes, at least {min} are required")]
    WeakSigningKey { len: usize, min: usize },

    #[error("{name} must be between 1 and {max} seconds, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        max: i64,
    },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
}
