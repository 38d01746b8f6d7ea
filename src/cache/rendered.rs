//! Cache of highlighted renderings
//!
//! Keys are either a bare path or `path:line`, where `line` is the zero-based
//! line that was emphasized when the rendering was produced.
use super::{BoundedCache, CacheStats, EvictionPolicy};
use crate::error::Result;
use parking_lot::Mutex;
use std::path::Path;

pub fn highlight_key(path: &Path, line: Option<usize>) -> String {
    match line {
        Some(line) => format!("{}:{}", path.display(), line),
        None => path.display().to_string(),
    }
}

pub struct RenderedContentCache<V: Clone> {
    inner: Mutex<BoundedCache<String, V>>,
}

impl<V: Clone> RenderedContentCache<V> {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        Self {
            inner: Mutex::new(BoundedCache::new(capacity, policy)),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Returns the cached rendering or produces, stores and returns a new one.
    /// The lock is not held while `render` runs.
    pub fn get_or_insert_with<F>(&self, key: &str, render: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = render()?;
        self.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub fn insert(&self, key: String, value: V) {
        self.inner.lock().insert(key, value);
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Raw string-prefix invalidation.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        self.inner.lock().remove_where(|key| key.starts_with(prefix))
    }

    /// Removes the bare `path` key and every `path:<line>` key for it, and
    /// nothing that merely shares the path as a string prefix.
    pub fn invalidate_file(&self, path: &Path) -> usize {
        let bare = highlight_key(path, None);
        let composite = format!("{bare}:");
        self.inner
            .lock()
            .remove_where(|key| *key == bare || key.starts_with(&composite))
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}
