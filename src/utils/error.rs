//! Error types and handling
//!
//! Common error type used by the command layer, and the error shape sent to
//! the frontend.

use crate::capture::CaptureError;
use crate::config::ConfigError;
use crate::recorder::sink::SinkError;
use crate::recorder::state::RecordingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error("Platform error: {0}")]
    Platform(String),
}

/// Error response for frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Capture(CaptureError::DeviceUnavailable(_)) => "DEVICE_UNAVAILABLE",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Recording(RecordingError::DirectoryCreation { .. }) => "DIRECTORY_CREATION",
            AppError::Recording(RecordingError::Sink(SinkError::EncoderUnavailable(_))) => {
                "ENCODER_UNAVAILABLE"
            }
            AppError::Recording(RecordingError::Sink(SinkError::FrameSizeMismatch { .. })) => {
                "FRAME_SIZE_MISMATCH"
            }
            AppError::Recording(RecordingError::OutputFolderMissing(_)) => "OUTPUT_FOLDER_MISSING",
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Platform(_) => "PLATFORM_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
