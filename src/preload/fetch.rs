//! Blob fetcher over HTTP and the local filesystem

use std::time::Duration;

use log::debug;

use super::acquire::{BlobFetcher, FetchError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches `http(s)://` URLs with reqwest and everything else from disk.
///
/// `file://` prefixes are stripped; bare strings are treated as paths.
#[derive(Clone, Debug)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::request("<client>", e.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::request(url, e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl BlobFetcher for DefaultFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if is_http(url) {
            debug!("GET {url}");
            return self.fetch_http(url).await;
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        debug!("Reading {path}");
        tokio::fs::read(path).await.map_err(|source| FetchError::Io {
            path: path.to_string(),
            source,
        })
    }
}

fn is_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
