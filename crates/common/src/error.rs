//! Error types shared across Wheelguard crates.

use std::path::PathBuf;

/// Top-level error type for Wheelguard operations.
#[derive(Debug, thiserror::Error)]
pub enum WheelguardError {
    #[error("Hook error: {message}")]
    Hook { message: String },

    #[error("Filter error: {message}")]
    Filter { message: String },

    #[error("Calibration error: {message}")]
    Calibration { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using WheelguardError.
pub type WheelguardResult<T> = Result<T, WheelguardError>;

impl WheelguardError {
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook {
            message: msg.into(),
        }
    }

    pub fn filter(msg: impl Into<String>) -> Self {
        Self::Filter {
            message: msg.into(),
        }
    }

    pub fn calibration(msg: impl Into<String>) -> Self {
        Self::Calibration {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled {
            message: msg.into(),
        }
    }
}
