//! Request-scoped static cache.

use std::collections::HashMap;
use std::sync::RwLock;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::request";

/// Per-request memoisation tier.
///
/// Lives for exactly one request. Correctness across requests comes from
/// discarding it, not from invalidating it, so nothing in here is ever
/// persisted.
#[derive(Debug, Default)]
pub struct RequestCache {
    values: RwLock<HashMap<String, String>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        rw_read(&self.values, SOURCE, "get").get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        rw_write(&self.values, SOURCE, "set").insert(key.into(), value.into());
    }

    /// Drop all memoised values; call between requests when reusing the
    /// allocation.
    pub fn reset(&self) {
        rw_write(&self.values, SOURCE, "reset").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.values, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
