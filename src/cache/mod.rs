//! Bounded caches for file contents and rendered previews
//!
//! Both caches are single instances owned by the application and shared by
//! reference. All mutation goes through the cache methods so the capacity
//! bound always holds.
pub mod content;
pub mod rendered;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

pub use content::{ContentCache, FileContent};
pub use rendered::{highlight_key, RenderedContentCache};

/// Which entry is dropped when a cache overflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Oldest insertion goes first; reads never change the order.
    #[default]
    Fifo,
    /// Least recently read goes first.
    Lru,
}

/// Capacity-bounded map. With [`EvictionPolicy::Fifo`] lookups use `peek`,
/// so the underlying recency list is only ever ordered by insertion.
pub struct BoundedCache<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    policy: EvictionPolicy,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            policy,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = match self.policy {
            EvictionPolicy::Fifo => self.entries.peek(key),
            EvictionPolicy::Lru => self.entries.get(key),
        };
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains(key)
    }

    /// Inserts `value`, returning the key that had to be evicted to make room.
    pub fn insert(&mut self, key: K, value: V) -> Option<K>
    where
        K: Clone,
    {
        if let Some(slot) = self.entries.peek_mut(&key) {
            // An update keeps the original insertion slot under FIFO.
            *slot = value;
            if self.policy == EvictionPolicy::Lru {
                self.entries.promote(&key);
            }
            return None;
        }
        let evicted = self.entries.push(key, value).map(|(evicted, _)| evicted);
        if evicted.is_some() {
            self.evictions += 1;
        }
        evicted
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.pop(key)
    }

    /// Removes every entry whose key satisfies `predicate`.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        K: Clone,
        F: FnMut(&K) -> bool,
    {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.entries.pop(key);
        }
        doomed.len()
    }

    /// Keys from oldest to newest position.
    pub fn keys(&self) -> Vec<&K> {
        self.entries.iter().rev().map(|(key, _)| key).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_evicts_oldest_insertion() {
        let mut cache = BoundedCache::new(3, EvictionPolicy::Fifo);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);

        assert_eq!(cache.insert("d", 4), Some("a"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(&2));
        assert_eq!(cache.get("c"), Some(&3));
        assert_eq!(cache.get("d"), Some(&4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_fifo_ignores_reads() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::Fifo);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // Reading "a" must not protect it.
        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.insert("c", 3), Some("a"));
        assert_eq!(cache.keys(), vec![&"b", &"c"]);
    }

    #[test]
    fn test_lru_policy_refreshes_on_read() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::Lru);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.get("a"), Some(&1));
        assert_eq!(cache.insert("c", 3), Some("b"));
        assert!(cache.contains("a"));
    }

    #[test]
    fn test_reinsert_existing_key_does_not_evict() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::Fifo);
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.get("a"), Some(&10));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.keys(), vec![&"a", &"b"]);

        // "a" is still the oldest insertion.
        assert_eq!(cache.insert("c", 3), Some("a"));
        assert_eq!(cache.keys(), vec![&"b", &"c"]);
    }

    #[test]
    fn test_lru_reinsert_counts_as_use() {
        let mut cache = BoundedCache::new(2, EvictionPolicy::Lru);
        cache.insert("a", 1);
        cache.insert("b", 2);

        cache.insert("a", 10);
        assert_eq!(cache.keys(), vec![&"b", &"a"]);
    }

    #[test]
    fn test_remove_where_and_stats() {
        let mut cache = BoundedCache::new(10, EvictionPolicy::Fifo);
        for i in 0..6 {
            cache.insert(i, i * 10);
        }

        assert_eq!(cache.remove_where(|k| k % 2 == 0), 3);
        assert_eq!(cache.len(), 3);

        cache.get(&1);
        cache.get(&2);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.capacity, 10);
    }
}
