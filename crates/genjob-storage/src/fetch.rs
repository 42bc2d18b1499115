//! Downloads provider-hosted outputs before they are re-hosted.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Largest provider output accepted by default (512 MiB).
pub const DEFAULT_MAX_ASSET_BYTES: u64 = 512 * 1024 * 1024;

/// Bytes downloaded from a provider URL.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the host, if any.
    pub content_type: Option<String>,
}

/// HTTP fetcher for provider-hosted files.
#[derive(Clone)]
pub struct AssetFetcher {
    http: Client,
    max_bytes: u64,
}

impl AssetFetcher {
    pub fn new(timeout: Duration) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::config_error(format!("asset fetcher: {}", e)))?;
        Ok(Self {
            http,
            max_bytes: DEFAULT_MAX_ASSET_BYTES,
        })
    }

    /// Reject downloads larger than `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Create from `ASSET_FETCH_TIMEOUT_SECS` and `ASSET_MAX_BYTES`.
    pub fn from_env() -> StorageResult<Self> {
        let secs = std::env::var("ASSET_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);
        let max_bytes = std::env::var("ASSET_MAX_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n: &u64| *n > 0)
            .unwrap_or(DEFAULT_MAX_ASSET_BYTES);
        Ok(Self::new(Duration::from_secs(secs))?.with_max_bytes(max_bytes))
    }

    pub async fn fetch(&self, url: &str) -> StorageResult<FetchedAsset> {
        debug!("Fetching asset {}", url);

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::fetch_failed(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::fetch_failed(url, format!("HTTP {}", status)));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(self.too_large(url));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        // Content-Length may be absent or wrong; enforce the cap while reading
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StorageError::fetch_failed(url, e.to_string()))?
        {
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(StorageError::fetch_failed(url, "empty body"));
        }

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }

    fn too_large(&self, url: &str) -> StorageError {
        StorageError::fetch_failed(url, format!("body exceeds {} bytes", self.max_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, route: &str, size: usize) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![9u8; size], "video/mp4"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_within_limit() {
        let server = MockServer::start().await;
        serve(&server, "/ok.mp4", 16).await;

        let fetched = AssetFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_max_bytes(16)
            .fetch(&format!("{}/ok.mp4", server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.bytes.len(), 16);
        assert_eq!(fetched.content_type.as_deref(), Some("video/mp4"));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = MockServer::start().await;
        serve(&server, "/big.mp4", 64).await;

        let err = AssetFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_max_bytes(16)
            .fetch(&format!("{}/big.mp4", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::FetchFailed { ref reason, .. } if reason.contains("exceeds 16 bytes")));
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let server = MockServer::start().await;
        serve(&server, "/empty.mp4", 0).await;

        let err = AssetFetcher::new(Duration::from_secs(5))
            .unwrap()
            .fetch(&format!("{}/empty.mp4", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::FetchFailed { ref reason, .. } if reason == "empty body"));
    }
}
