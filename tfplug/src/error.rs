//! Error types for tfplug

use std::time::Duration;

/// Error type for tfplug operations
#[derive(Debug, thiserror::Error)]
pub enum TfplugError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Attribute '{0}' not found")]
    AttributeNotFound(String),

    #[error("Upgrade failed: {0}")]
    UpgradeFailed(String),

    #[error("No state upgrader registered for schema version {version} (current is {current})")]
    UnsupportedVersion { version: i64, current: i64 },

    #[error("Remote state did not settle within {}s after {attempts} attempts", .waited.as_secs_f64())]
    SettleTimeout { waited: Duration, attempts: u32 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for tfplug operations
pub type Result<T> = std::result::Result<T, TfplugError>;

impl From<String> for TfplugError {
    fn from(s: String) -> Self {
        TfplugError::Custom(s)
    }
}

impl From<&str> for TfplugError {
    fn from(s: &str) -> Self {
        TfplugError::Custom(s.to_string())
    }
}

impl From<serde_json::Error> for TfplugError {
    fn from(e: serde_json::Error) -> Self {
        TfplugError::DecodingError(format!("json decoding failed: {}", e))
    }
}
