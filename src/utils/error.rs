//! Error types and handling
//!
//! Common error types used across the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No media stream available")]
    NoActiveStream,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Recorder error: {0}")]
    RecorderFailure(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Platform error: {0}")]
    Platform(String),
}

impl AppError {
    /// Stable code the frontend can switch on
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            AppError::NoActiveStream => "NO_ACTIVE_STREAM",
            AppError::AlreadyRecording => "ALREADY_RECORDING",
            AppError::RecorderFailure(_) => "RECORDER_ERROR",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Platform(_) => "PLATFORM_ERROR",
        }
    }

    /// Whether the failure came from acquiring the camera/microphone
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, AppError::PermissionDenied(_) | AppError::DeviceNotFound(_))
    }
}

/// Error response for frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// IPC error payload: the `ErrorResponse` as JSON
impl From<AppError> for String {
    fn from(error: AppError) -> String {
        let message = error.to_string();
        serde_json::to_string(&ErrorResponse::from(error)).unwrap_or(message)
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
