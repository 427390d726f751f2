//! Error types for settings handling.

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Layered config could not be built or deserialized
    #[error("Configuration error: {0}")]
    Load(String),

    /// A value was present but out of range
    #[error("Invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
