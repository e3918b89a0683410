use async_trait::async_trait;
use futures_util::StreamExt;

use super::source::AudioSource;
use crate::error::LoadError;

/// Retrieves the raw bytes of an audio source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &AudioSource) -> Result<Vec<u8>, LoadError>;
}

/// Fetches URLs over HTTP(S) and reads local files from disk.
#[derive(Debug, Clone, Default)]
pub struct AudioFetcher {
    client: reqwest::Client,
    /// Refuse bodies larger than this many bytes
    max_bytes: Option<u64>,
}

impl AudioFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    async fn fetch_url(&self, url: &reqwest::Url) -> Result<Vec<u8>, LoadError> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(LoadError::Fetch(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        if let (Some(max), Some(len)) = (self.max_bytes, response.content_length()) {
            if len > max {
                return Err(LoadError::Fetch(format!(
                    "{} is {} bytes, limit is {}",
                    url, len, max
                )));
            }
        }

        let mut bytes: Vec<u8> =
            Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes.extend_from_slice(&chunk);
            if let Some(max) = self.max_bytes {
                if bytes.len() as u64 > max {
                    return Err(LoadError::Fetch(format!(
                        "{} exceeds the {} byte limit",
                        url, max
                    )));
                }
            }
        }

        Ok(bytes)
    }

    async fn fetch_file(&self, path: &std::path::Path) -> Result<Vec<u8>, LoadError> {
        if let Some(max) = self.max_bytes {
            let len = tokio::fs::metadata(path)
                .await
                .map_err(|e| LoadError::Fetch(format!("{}: {}", path.display(), e)))?
                .len();
            if len > max {
                return Err(LoadError::Fetch(format!(
                    "{} is {} bytes, limit is {}",
                    path.display(),
                    len,
                    max
                )));
            }
        }

        tokio::fs::read(path)
            .await
            .map_err(|e| LoadError::Fetch(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl Fetcher for AudioFetcher {
    async fn fetch(&self, source: &AudioSource) -> Result<Vec<u8>, LoadError> {
        let bytes = match source {
            AudioSource::Url(url) => self.fetch_url(url).await?,
            AudioSource::File(path) => self.fetch_file(path).await?,
        };
        log::debug!("Fetched {} bytes from {}", bytes.len(), source);
        Ok(bytes)
    }
}
