//! Permission-aware render caching.
//!
//! Expensive rendered output is cached under a composite key built from
//! explicit key parts plus the current value of every *cache context*
//! the content varies by (viewer permissions, roles, identity). Viewers
//! with identical effective permission sets share entries; changing a
//! role's permissions changes the hash and routes those viewers to new
//! entries.
//!
//! Cacheability metadata (tags, contexts, max-age) bubbles from nested
//! render units up to their ancestors, so a single uncacheable fragment
//! degrades exactly the smallest enclosing scope. Wrapped in a lazy
//! placeholder, it degrades none of them: only the top-level result
//! reflects its volatility.
//!
//! ## Wiring
//!
//! ```ignore
//! let roles = Arc::new(MemoryRoleStore::new());
//! let backend = Arc::new(MemoryBackend::new(config.render_entry_limit_non_zero()));
//! let generator = Arc::new(PermissionsHashGenerator::new(roles, backend.clone()));
//! let contexts = ContextRegistry::with_defaults(generator);
//! let renderer = Renderer::new(backend, contexts, builders, config);
//!
//! let req = RequestContext::new(Account::authenticated(id, ["editor"]));
//! let rendered = renderer.render_root(&element, &req)?;
//! ```
//!
//! All collaborators are constructor-injected; registries are populated
//! explicitly at startup.

pub mod cache;
pub mod config;
pub mod domain;
pub mod render;
pub mod telemetry;
