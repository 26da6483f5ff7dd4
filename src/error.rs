//! Error types for store infrastructure
//!
//! The query/mutation API never returns these: unknown ids and malformed input
//! are absorbed at the store boundary. They surface only from setup paths
//! (config, slot I/O, starting the sync listener) and explicit saves.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to replace slot file {}: {}", .path.display(), .source)]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Slot watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot is not a JSON object")]
    InvalidSnapshot,
}

impl StoreError {
    /// Get a user-facing recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            StoreError::Io(_) | StoreError::Persist { .. } => {
                "Check permissions and free space in the data directory."
            }
            StoreError::Json(_) | StoreError::InvalidSnapshot => {
                "The stored snapshot is unreadable; built-in defaults are in use."
            }
            StoreError::Watch(_) => {
                "Changes from other windows will not appear until restart."
            }
            StoreError::HomeDirNotFound => "Set dataDir explicitly in ~/.orgref/config.json",
            StoreError::Config(_) => "Check ~/.orgref/config.json for invalid values.",
        }
    }
}
