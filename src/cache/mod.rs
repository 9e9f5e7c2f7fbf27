//! Sigillo cache system.
//!
//! Provides the two building blocks of permission-aware render caching:
//!
//! - **Permission hashing**: condenses a viewer's role set into a stable
//!   cache key and a content hash, so cache entries are shared across
//!   viewers with identical effective permissions.
//! - **Cache contexts**: named, runtime-resolved values (viewer
//!   permissions, roles, identity) folded into composite cache keys.
//!
//! The persistent tier is any [`CacheBackend`]; a bounded in-memory
//! implementation with tag-based invalidation ships with the crate. The
//! static tier is a [`RequestCache`] owned by the request and discarded
//! when it ends.

mod backend;
mod context;
mod keys;
mod lock;
mod metadata;
mod permissions;
mod request;

pub use backend::{BackendError, CacheBackend, CacheItem, MemoryBackend};
pub use context::{
    CONTEXT_USER, CONTEXT_USER_PERMISSIONS, CONTEXT_USER_ROLES, CacheContext, ContextError,
    ContextRegistry, RequestContext,
};
pub use keys::assemble_cache_id;
pub use metadata::{CacheMetadata, MaxAge};
pub use permissions::{PERMISSIONS_HASH_KEY_PREFIX, PermissionsHashGenerator};
pub use request::RequestCache;
