//! Error types for the store and its persistence

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot file not found: {0}")]
    SnapshotNotFound(PathBuf),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    #[error("No ids left to assign in collection {0}")]
    IdsExhausted(String),
}

impl StoreError {
    /// Get error code for logs and diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io(_) => "IO_ERROR",
            StoreError::Json(_) => "JSON_ERROR",
            StoreError::SnapshotNotFound(_) => "SNAPSHOT_NOT_FOUND",
            StoreError::InvalidSnapshot(_) => "INVALID_SNAPSHOT",
            StoreError::LockPoisoned(_) => "LOCK_POISONED",
            StoreError::IdsExhausted(_) => "IDS_EXHAUSTED",
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreError::LockPoisoned("insert").code(), "LOCK_POISONED");
        assert_eq!(
            StoreError::InvalidSnapshot("top level is an array".to_string()).code(),
            "INVALID_SNAPSHOT"
        );
        assert_eq!(
            StoreError::SnapshotNotFound(PathBuf::from("db.json")).code(),
            "SNAPSHOT_NOT_FOUND"
        );
        assert_eq!(StoreError::IdsExhausted("todos".to_string()).code(), "IDS_EXHAUSTED");
    }

    #[test]
    fn test_json_error_converts() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), "JSON_ERROR");
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
