use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use super::DataLoader;
use crate::error::{DataLoaderError, Result};
use crate::source::DataSource;

/// Reads local files
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl FileLoader {
    /// Read a whole file
    pub async fn read(path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DataLoaderError::FileNotFound(path.to_path_buf()),
            _ => DataLoaderError::Io(format!("{}: {}", path.display(), e)),
        })
    }
}

#[async_trait]
impl DataLoader for FileLoader {
    async fn load(&self, source: &DataSource) -> Result<Vec<u8>> {
        match source {
            DataSource::File(path) => Self::read(path).await,
            _ => Err(DataLoaderError::InvalidSource),
        }
    }
}
