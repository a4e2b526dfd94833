use async_trait::async_trait;

use super::DataLoader;
use crate::error::{DataLoaderError, Result};
use crate::source::DataSource;

/// Returns in-memory buffers verbatim
#[derive(Debug, Default, Clone, Copy)]
pub struct BytesLoader;

#[async_trait]
impl DataLoader for BytesLoader {
    async fn load(&self, source: &DataSource) -> Result<Vec<u8>> {
        match source {
            DataSource::Bytes(bytes) => Ok(bytes.clone()),
            _ => Err(DataLoaderError::InvalidSource),
        }
    }
}
