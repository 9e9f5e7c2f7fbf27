//! Crate configuration.
//!
//! Deserializable from the embedding application's config file, e.g.:
//!
//! ```toml
//! [render_cache]
//! enable_render_cache = true
//! render_entry_limit = 1024
//! permissions_entry_limit = 512
//! ```

use std::num::NonZeroUsize;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_RENDER_ENTRY_LIMIT: usize = 1024;
const DEFAULT_PERMISSIONS_ENTRY_LIMIT: usize = 512;

/// Render cache tuning knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable lookup and store of rendered output. Rendering and
    /// metadata bubbling are unaffected when disabled.
    pub enable_render_cache: bool,
    /// Maximum rendered entries held by the bundled memory backend.
    pub render_entry_limit: usize,
    /// Maximum permission hashes held by the bundled memory backend.
    pub permissions_entry_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_render_cache: true,
            render_entry_limit: DEFAULT_RENDER_ENTRY_LIMIT,
            permissions_entry_limit: DEFAULT_PERMISSIONS_ENTRY_LIMIT,
        }
    }
}

impl CacheConfig {
    /// Returns the render entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn render_entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.render_entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the permissions entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn permissions_entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.permissions_entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
