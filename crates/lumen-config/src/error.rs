//! Error types for session operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during session save and load.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or serialize session JSON.
    #[error("session JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A playlist references a clip the snapshot does not define.
    #[error("playlist for '{player}' references unknown clip {clip}")]
    DanglingClip {
        /// Player whose playlist is broken.
        player: String,
        /// Unknown clip id.
        clip: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }
}
