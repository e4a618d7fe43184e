//! Remote playlist fetching
//!
//! Sources are fetched once, with no retries: a failed fetch only means the
//! source contributes nothing to the run.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure to obtain a source's text
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection/DNS/TLS error
    #[error("Network error: {0}")]
    Network(String),
    /// Request exceeded the client timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// Non-2xx status
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },
    /// Declared body size over the configured limit
    #[error("Playlist too large: {size_mb:.1}MB (limit {limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: usize },
    /// Body could not be read or decoded
    #[error("Failed to read body: {0}")]
    Body(String),
}

/// Returns the raw text behind a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_size_mb: usize,
}

impl HttpFetcher {
    /// Create a new fetcher
    pub fn new(user_agent: &str, timeout_ms: u64, max_size_mb: usize) -> reqwest::Result<Self> {
        let timeout = Duration::from_millis(timeout_ms);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            timeout,
            max_size_mb,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Error").to_string(),
            });
        }

        if let Some(len) = response.content_length() {
            let max_bytes = (self.max_size_mb as u64) * 1024 * 1024;
            if len > max_bytes {
                return Err(FetchError::TooLarge {
                    size_mb: len as f64 / 1024f64 / 1024f64,
                    limit_mb: self.max_size_mb,
                });
            }
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}
