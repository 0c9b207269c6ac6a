use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed memory string '{input}': {reason}")]
    MalformedMemoryString { input: String, reason: String },

    #[error("Malformed memory unit '{unit}' in '{input}' (expected one of b, k, m, g)")]
    MalformedMemoryUnit { input: String, unit: char },

    #[error("Memory limit must not be negative, got {0} bytes")]
    NegativeMemoryLimit(i64),

    #[error("Invalid heap ratio '{value}': {reason}")]
    InvalidRatio { value: String, reason: String },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Installation failed: {0}")]
    Install(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        AppError::MalformedMemoryString {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_ratio(value: impl ToString, reason: impl Into<String>) -> Self {
        AppError::InvalidRatio {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Download(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
