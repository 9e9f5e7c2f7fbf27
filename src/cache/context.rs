//! Cache contexts: named, runtime-resolved values folded into cache keys.
//!
//! A context token names one dimension a cache entry must vary by. The
//! registry is populated explicitly at startup; resolving a token nobody
//! registered is a wiring mistake and fails the render of that unit.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::Account;

use super::permissions::PermissionsHashGenerator;
use super::request::RequestCache;

/// Varies cache entries by the viewer's effective permissions.
pub const CONTEXT_USER_PERMISSIONS: &str = "user.permissions";

/// Varies cache entries by the viewer's raw role list.
pub const CONTEXT_USER_ROLES: &str = "user.roles";

/// Varies cache entries per individual account.
pub const CONTEXT_USER: &str = "user";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// An unregistered token: a configuration error, not a runtime
    /// condition.
    #[error("no cache context registered for token `{token}`")]
    Unknown { token: String },
}

/// Everything a context resolver may depend on for one request.
///
/// Owns the request-scoped static cache; dropping the context at request
/// end is what tears the static tier down.
pub struct RequestContext {
    account: Account,
    statics: RequestCache,
}

impl RequestContext {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            statics: RequestCache::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn statics(&self) -> &RequestCache {
        &self.statics
    }
}

/// A named, runtime-resolvable cache key dimension.
pub trait CacheContext: Send + Sync {
    fn resolve(&self, req: &RequestContext) -> String;
}

struct PermissionsContext {
    generator: Arc<PermissionsHashGenerator>,
}

impl CacheContext for PermissionsContext {
    fn resolve(&self, req: &RequestContext) -> String {
        self.generator.generate(req.account(), req.statics())
    }
}

struct RolesContext;

impl CacheContext for RolesContext {
    fn resolve(&self, req: &RequestContext) -> String {
        req.account().role_list()
    }
}

struct UserContext;

impl CacheContext for UserContext {
    fn resolve(&self, req: &RequestContext) -> String {
        req.account().id().to_string()
    }
}

/// Registry of context resolvers, populated at startup.
#[derive(Default)]
pub struct ContextRegistry {
    contexts: HashMap<String, Arc<dyn CacheContext>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in viewer contexts.
    pub fn with_defaults(generator: Arc<PermissionsHashGenerator>) -> Self {
        let mut registry = Self::new();
        registry.register(
            CONTEXT_USER_PERMISSIONS,
            Arc::new(PermissionsContext { generator }),
        );
        registry.register(CONTEXT_USER_ROLES, Arc::new(RolesContext));
        registry.register(CONTEXT_USER, Arc::new(UserContext));
        registry
    }

    pub fn register(&mut self, token: impl Into<String>, context: Arc<dyn CacheContext>) {
        self.contexts.insert(token.into(), context);
    }

    pub fn contains(&self, token: &str) -> bool {
        self.contexts.contains_key(token)
    }

    pub fn resolve(&self, token: &str, req: &RequestContext) -> Result<String, ContextError> {
        self.contexts
            .get(token)
            .map(|context| context.resolve(req))
            .ok_or_else(|| ContextError::Unknown {
                token: token.to_string(),
            })
    }
}
