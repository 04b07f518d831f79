//! Error handling module for GifCrop

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for GifCrop operations
#[derive(Error, Debug)]
pub enum GifCropError {
    /// Domain rule or engine failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds")]
    InvalidTimeFormat { time: String },

    /// Invalid geometry argument (e.g. "800x450" or "300,168.75,180")
    #[error("Invalid {what}: {value}")]
    InvalidGeometry { what: &'static str, value: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration {path}: {message}")]
    ConfigError { path: String, message: String },

    /// Interaction script could not be parsed
    #[error("Failed to parse interaction script: {0}")]
    ScriptError(#[from] serde_json::Error),

    /// Output file write error
    #[error("Failed to write output file: {message}")]
    OutputError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for GifCrop operations
pub type GifCropResult<T> = std::result::Result<T, GifCropError>;

impl GifCropError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            GifCropError::Domain(DomainError::Cancelled) => 130,
            GifCropError::Domain(DomainError::InvalidInput(_))
            | GifCropError::InvalidTimeFormat { .. }
            | GifCropError::InvalidGeometry { .. }
            | GifCropError::ScriptError(_) => 2,
            GifCropError::Domain(DomainError::ResourceLimit(_)) => 3,
            GifCropError::Domain(DomainError::EngineLoadFailure(_))
            | GifCropError::Domain(DomainError::EngineExecutionFailure(_)) => 4,
            GifCropError::ConfigError { .. } => 5,
            _ => 1,
        }
    }
}
