use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("workbook not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("not a valid workbook: {}: {message}", .path.display())]
    InvalidWorkbook { path: PathBuf, message: String },

    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IoError {
    pub fn from_backend<E: std::error::Error>(backend: &str, err: E) -> Self {
        IoError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }

    pub fn invalid_workbook(path: &Path, message: impl Into<String>) -> Self {
        IoError::InvalidWorkbook {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// The input itself is unusable: missing, or not a spreadsheet container.
    pub fn is_fatal_input(&self) -> bool {
        matches!(self, IoError::NotFound { .. } | IoError::InvalidWorkbook { .. })
    }
}
