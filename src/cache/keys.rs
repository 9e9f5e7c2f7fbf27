//! Composite cache id assembly.

use std::collections::BTreeSet;

use super::context::{ContextError, ContextRegistry, RequestContext};

/// Builds the cache id for a render unit: the explicit key parts first,
/// then every context token in sorted order as `[token]=value`, all
/// joined by `:`. Sorting makes key construction reproducible no matter
/// how the context set was accumulated.
pub fn assemble_cache_id(
    keys: &[String],
    contexts: &BTreeSet<String>,
    registry: &ContextRegistry,
    req: &RequestContext,
) -> Result<String, ContextError> {
    let mut parts: Vec<String> = keys.to_vec();
    for token in contexts {
        let value = registry.resolve(token, req)?;
        parts.push(format!("[{token}]={value}"));
    }
    Ok(parts.join(":"))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::cache::backend::MemoryBackend;
    use crate::cache::context::{CONTEXT_USER_ROLES, ContextRegistry, RequestContext};
    use crate::cache::permissions::PermissionsHashGenerator;
    use crate::domain::{Account, MemoryRoleStore, Role};

    use super::*;

    fn fixture() -> (ContextRegistry, RequestContext) {
        let store = MemoryRoleStore::new();
        store.upsert(Role::new("authenticated"));
        store.upsert(Role::new("editor"));
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(64).unwrap()));
        let generator = Arc::new(PermissionsHashGenerator::new(Arc::new(store), backend));
        let registry = ContextRegistry::with_defaults(generator);
        let req = RequestContext::new(Account::authenticated(Uuid::nil(), ["editor"]));
        (registry, req)
    }

    #[test]
    fn explicit_keys_come_first() {
        let (registry, req) = fixture();
        let keys = vec!["entity_view".to_string(), "post".to_string()];

        let id = assemble_cache_id(&keys, &BTreeSet::new(), &registry, &req).unwrap();
        assert_eq!(id, "entity_view:post");
    }

    #[test]
    fn context_values_append_in_sorted_token_order() {
        let (registry, req) = fixture();
        let keys = vec!["test".to_string()];
        let contexts = BTreeSet::from([
            CONTEXT_USER_ROLES.to_string(),
            "user".to_string(),
        ]);

        let id = assemble_cache_id(&keys, &contexts, &registry, &req).unwrap();
        assert_eq!(
            id,
            format!(
                "test:[user]={}:[user.roles]=authenticated,editor",
                Uuid::nil()
            )
        );
    }

    #[test]
    fn unknown_context_token_propagates() {
        let (registry, req) = fixture();
        let contexts = BTreeSet::from(["session.id".to_string()]);

        assert!(assemble_cache_id(&[], &contexts, &registry, &req).is_err());
    }
}
