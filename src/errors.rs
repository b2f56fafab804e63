use std::io;

use thiserror::Error;

use crate::types::PathString;

/// Error type for object-store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object path '{path}' was not found")]
    NotFound { path: PathString },
    #[error("invalid storage path '{path}': {reason}")]
    InvalidPath { path: PathString, reason: String },
    #[error("storage backend failed for '{path}': {reason}")]
    Backend { path: PathString, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Error type for task discovery, manifest building, and configuration failures.
///
/// Write/verify failures of the manifest itself are not errors; they are
/// reported through [`crate::manifest::WriteOutcome`].
#[derive(Debug, Error)]
pub enum AssignError {
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("manifest serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}
