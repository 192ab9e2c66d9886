//! Error types for CineGrid.

use thiserror::Error;

/// Main error type for CineGrid operations.
#[derive(Error, Debug)]
pub enum CineGridError {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Shader compilation error: {0}")]
    Shader(String),

    #[error("Surface lost: {0}")]
    SurfaceLost(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Draw failed: {0}")]
    Draw(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for CineGrid operations.
pub type Result<T> = std::result::Result<T, CineGridError>;
