//! Error types for the contour mapper.

use thiserror::Error;

/// Result type alias using MapError.
pub type MapResult<T> = Result<T, MapError>;

/// Configuration and data-model errors.
#[derive(Debug, Error)]
pub enum MapError {
    // === Configuration Errors ===
    #[error("Invalid configuration for field '{field}': {message}")]
    InvalidFieldConfig { field: String, message: String },

    #[error("Unsupported interpolation method: {0}")]
    UnsupportedMethod(String),

    // === Data Errors ===
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid time bucket: {0}")]
    InvalidTime(String),

    #[error("Failed to read data: {0}")]
    DataReadError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl MapError {
    /// Create an InvalidFieldConfig error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFieldConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(err: std::io::Error) -> Self {
        MapError::DataReadError(err.to_string())
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::InternalError(format!("JSON error: {}", err))
    }
}
