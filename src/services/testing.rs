//! In-memory fetcher and sink for tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use crate::services::fetcher::{FetchError, Fetcher};
use crate::services::writer::PlaylistSink;

/// Serves canned bodies by URL; unknown URLs answer 404
#[derive(Default)]
pub struct MapFetcher {
    bodies: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        self.bodies.get(url).cloned().ok_or(FetchError::Http {
            status: 404,
            reason: "Not Found".to_string(),
        })
    }
}

/// Records every write instead of touching the filesystem
#[derive(Default)]
pub struct MemorySink {
    writes: Mutex<Vec<(String, Vec<String>, String)>>,
    fail_on: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail writes for this category
    pub fn failing_on(category: &str) -> Self {
        Self {
            fail_on: Some(category.to_string()),
            ..Default::default()
        }
    }

    /// (category, urls, base name) in call order
    pub fn writes(&self) -> Vec<(String, Vec<String>, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn written(&self, category: &str) -> Option<Vec<String>> {
        self.writes()
            .into_iter()
            .find(|(name, _, _)| name == category)
            .map(|(_, urls, _)| urls)
    }
}

#[async_trait]
impl PlaylistSink for MemorySink {
    async fn write(&self, category: &str, urls: &[String], base_name: &str) -> Result<PathBuf> {
        if self.fail_on.as_deref() == Some(category) {
            anyhow::bail!("disk full");
        }

        self.writes
            .lock()
            .unwrap()
            .push((category.to_string(), urls.to_vec(), base_name.to_string()));
        Ok(PathBuf::from(format!("{}-{}.m3u", base_name, category)))
    }
}
