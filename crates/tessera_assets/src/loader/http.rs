use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::DataLoader;
use crate::config::AssetLoaderConfig;
use crate::error::{DataLoaderError, Result};
use crate::source::DataSource;

/// Fetches `http(s)` sources with a GET request
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    /// Loader with an explicit request timeout
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Self {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        let client = match builder.build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("HTTP client setup failed, using defaults: {}", e);
                reqwest::Client::new()
            }
        };
        Self { client }
    }

    pub fn from_config(config: &AssetLoaderConfig) -> Self {
        Self::new(config.http_timeout(), config.user_agent.as_deref())
    }

    /// Download the body of `url`
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|_| DataLoaderError::InvalidUrl(url.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DataLoaderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataLoaderError::HttpError {
                status_code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DataLoaderError::Network(e.to_string()))?;

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::from_config(&AssetLoaderConfig::default())
    }
}

#[async_trait]
impl DataLoader for HttpLoader {
    async fn load(&self, source: &DataSource) -> Result<Vec<u8>> {
        match source {
            DataSource::Http(url) => self.download(url).await,
            _ => Err(DataLoaderError::InvalidSource),
        }
    }
}
