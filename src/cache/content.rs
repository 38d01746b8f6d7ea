//! File content cache keyed by path
use super::{BoundedCache, CacheStats, EvictionPolicy};
use crate::error::{Result, RfscopeError};
use crate::metrics::Metrics;
use log::debug;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extensions that load as raw bytes instead of text.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "svg", "tiff",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(Arc<str>),
    Binary(Arc<[u8]>),
}

impl FileContent {
    pub fn as_text(&self) -> Option<&Arc<str>> {
        match self {
            FileContent::Text(text) => Some(text),
            FileContent::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FileContent::Text(text) => text.len(),
            FileContent::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn is_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

pub struct ContentCache {
    inner: Mutex<BoundedCache<PathBuf, FileContent>>,
    metrics: Option<Arc<Metrics>>,
}

impl ContentCache {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            inner: Mutex::new(BoundedCache::new(capacity, policy)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the cached content for `path`, reading the file on a miss.
    pub async fn get(&self, path: &Path) -> Result<FileContent> {
        let cached = self.inner.lock().get(path).cloned();
        if let Some(content) = cached {
            if let Some(metrics) = &self.metrics {
                metrics.content_cache_hits.inc();
            }
            return Ok(content);
        }
        if let Some(metrics) = &self.metrics {
            metrics.content_cache_misses.inc();
        }

        let content = load(path).await?;
        let evicted = self.inner.lock().insert(path.to_path_buf(), content.clone());
        if let Some(evicted) = evicted {
            debug!("Content cache full, evicted {}", evicted.display());
        }
        Ok(content)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.lock().contains(path)
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        self.inner.lock().remove(path).is_some()
    }

    /// Drops every entry under `prefix` (component-wise, so `/a/b` does not
    /// cover `/a/bc`).
    pub fn invalidate_by_prefix(&self, prefix: &Path) -> usize {
        self.inner.lock().remove_where(|key| key.starts_with(prefix))
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}

async fn load(path: &Path) -> Result<FileContent> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| RfscopeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    if is_binary_extension(path) {
        return Ok(FileContent::Binary(Arc::from(bytes)));
    }

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    };
    Ok(FileContent::Text(Arc::from(text)))
}
