//! Error types for tessera_assets

use std::path::PathBuf;

use tessera_core::EngineError;
use thiserror::Error;

/// Errors produced while resolving and loading asset bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataLoaderError {
    /// The loader was handed a source of another kind
    #[error("Invalid data source type for this loader")]
    InvalidSource,

    /// The URL could not be parsed or uses an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered outside 200..=299
    #[error("HTTP error {status_code} for {url}")]
    HttpError { status_code: u16, url: String },

    /// No bundled resource matched the name in any category
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// No platform asset loader is installed
    #[error("No application context available")]
    NoContext,

    /// Transport failure (connect, TLS, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Filesystem failure other than a missing file
    #[error("IO error: {0}")]
    Io(String),

    /// Bytes were loaded but could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<EngineError> for DataLoaderError {
    fn from(err: EngineError) -> Self {
        DataLoaderError::Decode(err.to_string())
    }
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, DataLoaderError>;

/// Errors from the asset file factory
#[derive(Error, Debug)]
pub enum AssetFileError {
    /// `from_file_url` was given something other than a `file://` URL
    #[error("URL must be a file URL: {0}")]
    NotFileUrl(String),

    /// Fetching the file bytes failed
    #[error("Failed to load file: {0}")]
    Load(#[from] DataLoaderError),

    /// The engine rejected the file
    #[error("Failed to parse file: {0}")]
    Parse(#[from] EngineError),

    /// Worker task panicked or was cancelled
    #[error("Load task failed: {0}")]
    Task(String),
}
