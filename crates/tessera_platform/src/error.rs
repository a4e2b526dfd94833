//! Platform error types

use thiserror::Error;

/// Platform-related errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Failed to read a bundled asset
    #[error("Asset load failed: {0}")]
    AssetLoad(String),

    /// No bundled asset matched the requested name
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Host context (bundle, activity, resource root) is not available
    #[error("No host context available: {0}")]
    NoContext(String),

    /// Platform not supported on this OS
    #[error("Platform not supported: {0}")]
    Unsupported(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
