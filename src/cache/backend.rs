//! Cache backend boundary and the bundled in-memory implementation.
//!
//! A backend is an opaque keyed store with single-key atomicity and no
//! cross-key ordering guarantees. [`MemoryBackend`] adds LRU bounding, a
//! tag index for targeted invalidation, and expiry enforcement on read.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::RwLock;

use dashmap::DashMap;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::backend";

const METRIC_BACKEND_EVICT: &str = "sigillo_backend_evict_total";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload could not be encoded: {0}")]
    Encoding(String),
}

/// A value stored in a cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    /// Opaque payload; callers serialize their own envelopes.
    pub data: String,
    /// Absolute expiry; `None` means permanent.
    pub expires_at: Option<OffsetDateTime>,
    /// Invalidation tags; the entry is dropped when any goes stale.
    pub tags: Vec<String>,
}

impl CacheItem {
    /// An untagged, never-expiring item.
    pub fn permanent(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            expires_at: None,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Generic key-value cache store.
pub trait CacheBackend: Send + Sync {
    /// Look up a live entry. Expired entries are treated as absent.
    fn get(&self, key: &str) -> Option<CacheItem>;

    /// Store an entry, replacing any previous value under the key.
    fn set(&self, key: &str, item: CacheItem) -> Result<(), BackendError>;

    /// Drop a single entry, if present.
    fn delete(&self, key: &str);

    /// Drop every entry whose tag set intersects `tags`.
    fn invalidate_tags(&self, tags: &[String]);
}

/// Bounded in-memory backend with LRU eviction and a tag index.
pub struct MemoryBackend {
    entries: RwLock<LruCache<String, CacheItem>>,
    tag_index: DashMap<String, HashSet<String>>,
}

impl MemoryBackend {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(limit)),
            tag_index: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries and index state.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
        self.tag_index.clear();
    }

    fn unindex(&self, key: &str, tags: &[String]) {
        for tag in tags {
            if let Some(mut keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                let empty = keys.is_empty();
                drop(keys);
                if empty {
                    self.tag_index.remove_if(tag, |_, keys| keys.is_empty());
                }
            }
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<CacheItem> {
        let now = OffsetDateTime::now_utc();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = matches!(entries.peek(key), Some(item) if item.is_expired(now));
        if expired {
            let popped = entries.pop(key);
            drop(entries);
            if let Some(item) = popped {
                self.unindex(key, &item.tags);
            }
            return None;
        }
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, item: CacheItem) -> Result<(), BackendError> {
        let tags = item.tags.clone();
        let displaced = rw_write(&self.entries, SOURCE, "set").push(key.to_string(), item);
        if let Some((displaced_key, displaced_item)) = displaced {
            self.unindex(&displaced_key, &displaced_item.tags);
            if displaced_key != key {
                counter!(METRIC_BACKEND_EVICT).increment(1);
            }
        }
        for tag in tags {
            self.tag_index
                .entry(tag)
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    fn delete(&self, key: &str) {
        let popped = rw_write(&self.entries, SOURCE, "delete").pop(key);
        if let Some(item) = popped {
            self.unindex(key, &item.tags);
        }
    }

    fn invalidate_tags(&self, tags: &[String]) {
        for tag in tags {
            let Some((_, keys)) = self.tag_index.remove(tag) else {
                continue;
            };
            for key in keys {
                let popped = rw_write(&self.entries, SOURCE, "invalidate_tags").pop(&key);
                if let Some(item) = popped {
                    self.unindex(&key, &item.tags);
                }
            }
        }
    }
}
