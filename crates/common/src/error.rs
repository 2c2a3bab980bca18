//! Error types shared across Cutline crates.

use std::path::PathBuf;

/// Top-level error type for Cutline operations.
#[derive(Debug, thiserror::Error)]
pub enum CutlineError {
    #[error("Unreadable media {path}: {message}")]
    UnreadableMedia { path: PathBuf, message: String },

    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    #[error("Splice error: {message}")]
    Splice { message: String },

    #[error("Composite error: {message}")]
    Composite { message: String },

    #[error("Extraction error: {message}")]
    Extract { message: String },

    #[error("{program} failed ({status}): {diagnostics}")]
    Backend {
        program: String,
        status: String,
        diagnostics: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Image error: {message}")]
    Image { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CutlineError.
pub type CutlineResult<T> = Result<T, CutlineError>;

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with corrected parameters.
    BadInput,
    /// Retry the operation unchanged.
    BackendFailure,
}

impl CutlineError {
    pub fn unreadable(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::UnreadableMedia {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange {
            message: msg.into(),
        }
    }

    pub fn splice(msg: impl Into<String>) -> Self {
        Self::Splice {
            message: msg.into(),
        }
    }

    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite {
            message: msg.into(),
        }
    }

    pub fn extract(msg: impl Into<String>) -> Self {
        Self::Extract {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image {
            message: msg.into(),
        }
    }

    /// Classify the error for retry decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidRange { .. }
            | Self::InvalidInput { .. }
            | Self::FileNotFound { .. }
            | Self::UnreadableMedia { .. }
            | Self::Config { .. }
            | Self::Unsupported { .. } => ErrorClass::BadInput,
            Self::Splice { .. }
            | Self::Composite { .. }
            | Self::Extract { .. }
            | Self::Backend { .. }
            | Self::Image { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ErrorClass::BackendFailure,
        }
    }

    /// Re-label a backend failure as a splice failure, keeping diagnostics.
    pub fn into_splice(self) -> Self {
        match self {
            Self::Backend { .. } | Self::Extract { .. } => Self::splice(self.to_string()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_input_is_distinguished_from_backend_failure() {
        assert_eq!(
            CutlineError::invalid_range("end before start").class(),
            ErrorClass::BadInput
        );
        assert_eq!(
            CutlineError::invalid_input("no clips").class(),
            ErrorClass::BadInput
        );
        assert_eq!(
            CutlineError::splice("concat failed").class(),
            ErrorClass::BackendFailure
        );
    }

    #[test]
    fn test_backend_diagnostics_survive_splice_relabel() {
        let err = CutlineError::Backend {
            program: "ffmpeg".to_string(),
            status: "exit status: 1".to_string(),
            diagnostics: "moov atom not found".to_string(),
        }
        .into_splice();

        assert!(matches!(err, CutlineError::Splice { .. }));
        assert!(err.to_string().contains("moov atom not found"));
    }

    #[test]
    fn test_into_splice_keeps_input_errors() {
        let err = CutlineError::invalid_range("inverted").into_splice();
        assert!(matches!(err, CutlineError::InvalidRange { .. }));
    }
}
