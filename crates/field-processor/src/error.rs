//! Error types for field processing.

use map_common::MapError;
use thiserror::Error;

/// Errors that can occur while turning samples into contour features.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// No usable samples remain for the field.
    #[error("no usable samples: {0}")]
    EmptyInput(String),

    /// The interpolation strategy could not fit or evaluate the field.
    #[error("interpolation error: {0}")]
    Interpolation(String),

    /// The configured interpolation method is not supported.
    #[error("unsupported interpolation method: {0}")]
    UnsupportedMethod(String),

    /// Field configuration failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A geometry operation failed for a single region.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// The study-area boundary could not be loaded.
    #[error("invalid boundary: {0}")]
    Boundary(String),

    /// Grid construction failed.
    #[error("grid error: {0}")]
    Grid(String),
}

impl ProcessError {
    /// Create an Interpolation error.
    pub fn interpolation(msg: impl Into<String>) -> Self {
        Self::Interpolation(msg.into())
    }

    /// Create a Geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create a Boundary error.
    pub fn boundary(msg: impl Into<String>) -> Self {
        Self::Boundary(msg.into())
    }

    /// Whether this error means "skip the field" rather than a fault in
    /// the pipeline itself.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput(_)
                | Self::Interpolation(_)
                | Self::UnsupportedMethod(_)
                | Self::Config(_)
        )
    }
}

impl From<MapError> for ProcessError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::UnsupportedMethod(m) => Self::UnsupportedMethod(m),
            MapError::InvalidFieldConfig { .. } => Self::Config(err.to_string()),
            MapError::InvalidGrid(m) => Self::Grid(m),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> Self {
        Self::Boundary(err.to_string())
    }
}

impl From<serde_json::Error> for ProcessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Boundary(err.to_string())
    }
}

/// Result type for field processing operations.
pub type Result<T> = std::result::Result<T, ProcessError>;
