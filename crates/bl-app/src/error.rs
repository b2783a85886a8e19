//! Error types for the bl-app service layer.

use std::path::PathBuf;

/// Application error wrapping the lower-layer crates' errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read {what} file: {path}")]
    FileRead {
        what: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid name map: {0}")]
    Names(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Physics error: {0}")]
    Physics(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Unknown process variable: {0}")]
    UnknownPv(String),
}

/// Result type for bl-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<bl_model::ModelError> for AppError {
    fn from(err: bl_model::ModelError) -> Self {
        AppError::Model(err.to_string())
    }
}

impl From<bl_physics::PhysicsError> for AppError {
    fn from(err: bl_physics::PhysicsError) -> Self {
        AppError::Physics(err.to_string())
    }
}

impl From<bl_core::CoreError> for AppError {
    fn from(err: bl_core::CoreError) -> Self {
        AppError::Physics(err.to_string())
    }
}

impl From<bl_devices::DeviceError> for AppError {
    fn from(err: bl_devices::DeviceError) -> Self {
        AppError::Device(err.to_string())
    }
}
