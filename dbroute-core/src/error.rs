//! Configuration error types.
//!
//! Following `TigerStyle`: a bad configuration is rejected loudly at
//! startup, never deferred to the first routed call.

use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating router configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An invalid value was provided.
    #[error("invalid {name}: {reason}")]
    InvalidArgument {
        /// The name of the setting.
        name: &'static str,
        /// Why it was invalid.
        reason: &'static str,
    },

    /// A setting exceeded its explicit limit.
    #[error("{limit} exceeds limit: {actual} > {max}")]
    LimitExceeded {
        /// Which limit was exceeded.
        limit: &'static str,
        /// The maximum allowed value.
        max: u32,
        /// The actual value that exceeded the limit.
        actual: u32,
    },

    /// The configuration file could not be read.
    #[error("failed to read config from {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("failed to parse config: {message}")]
    Parse {
        /// Parser error message.
        message: String,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {message}")]
    Serialize {
        /// Encoder error message.
        message: String,
    },
}
