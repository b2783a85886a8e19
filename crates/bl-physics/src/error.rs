//! Error types for conversion, interpolation and calibration data.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for physics operations.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Spline fit failed: {what}")]
    Spline { what: String },

    #[error("Failed to read gap table {path}")]
    TableRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse gap table {path}: {source}")]
    TableParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Gap table source error: {message}")]
    Source { message: String },

    #[error(transparent)]
    Core(#[from] bl_core::CoreError),
}
