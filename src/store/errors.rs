//! # Storage Errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Stored forms are corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to encode forms: {0}")]
    Encode(String),

    #[error("Storage is read-only")]
    ReadOnly,
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::IoError(_) => "STORAGE_IO",
            StorageError::Corrupt(_) => "STORAGE_CORRUPT",
            StorageError::Encode(_) => "STORAGE_ENCODE",
            StorageError::ReadOnly => "STORAGE_READ_ONLY",
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err.to_string())
    }
}
