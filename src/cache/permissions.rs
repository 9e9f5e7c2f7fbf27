//! Permission hash generation.
//!
//! Condenses an account's role set into a stable fingerprint key and a
//! content hash shared by every viewer with the same effective
//! permissions. Two tiers sit in front of the computation: the
//! request-scoped [`RequestCache`] and the persistent [`CacheBackend`].

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::{Account, RoleStore};

use super::backend::{CacheBackend, CacheItem};
use super::request::RequestCache;

/// Prefix of the persisted hash entries. The exact format is an interop
/// requirement with pre-existing stores and must not change.
pub const PERMISSIONS_HASH_KEY_PREFIX: &str = "user_permissions_hash:";

/// Digest input replacing the permission union for administrative
/// accounts, collapsing every admin to one hash regardless of their
/// other roles.
const ADMIN_SENTINEL: &str = "is-admin";

/// Tag prefix binding a persisted hash to the roles it was derived from.
const ROLE_TAG_PREFIX: &str = "role:";

const METRIC_STATIC_HIT: &str = "sigillo_permissions_static_hit_total";
const METRIC_PERSISTENT_HIT: &str = "sigillo_permissions_persistent_hit_total";
const METRIC_COMPUTED: &str = "sigillo_permissions_computed_total";

/// Derives permission hashes for viewer accounts.
///
/// The hash is a pure function of the role-id set: same roles, same
/// hash, for any account, in any order. Role *content* only enters on a
/// full recompute, which is exactly what makes permission changes
/// invalidate correctly once the persisted entry is dropped.
pub struct PermissionsHashGenerator {
    roles: Arc<dyn RoleStore>,
    backend: Arc<dyn CacheBackend>,
}

impl PermissionsHashGenerator {
    pub fn new(roles: Arc<dyn RoleStore>, backend: Arc<dyn CacheBackend>) -> Self {
        Self { roles, backend }
    }

    /// Stable cache key for this account's role set, e.g.
    /// `user_permissions_hash:authenticated,editor`.
    pub fn fingerprint(account: &Account) -> String {
        format!("{PERMISSIONS_HASH_KEY_PREFIX}{}", account.role_list())
    }

    /// Permission hash for `account`, memoised in `statics` for the
    /// current request and in the persistent backend across requests.
    pub fn generate(&self, account: &Account, statics: &RequestCache) -> String {
        let key = Self::fingerprint(account);

        if let Some(hash) = statics.get(&key) {
            counter!(METRIC_STATIC_HIT).increment(1);
            return hash;
        }

        if let Some(item) = self.backend.get(&key) {
            counter!(METRIC_PERSISTENT_HIT).increment(1);
            statics.set(key, item.data.clone());
            return item.data;
        }

        let hash = self.compute(account);
        counter!(METRIC_COMPUTED).increment(1);
        debug!(cache_key = %key, "computed permissions hash");

        let role_tags = account
            .roles()
            .iter()
            .map(|role| format!("{ROLE_TAG_PREFIX}{role}"));
        let item = CacheItem::permanent(hash.clone()).with_tags(role_tags);
        // Best-effort persistence; a backend write failure never fails
        // the render.
        if let Err(error) = self.backend.set(&key, item) {
            warn!(%error, cache_key = %key, "failed to persist permissions hash");
        }
        statics.set(key, hash.clone());

        hash
    }

    fn compute(&self, account: &Account) -> String {
        let roles = self.roles.load_roles(account.roles());

        if roles.values().any(|role| role.is_admin) {
            return digest(ADMIN_SENTINEL);
        }

        // Missing roles are absent from the map and contribute nothing.
        let mut permissions: BTreeSet<&str> = BTreeSet::new();
        for role in roles.values() {
            permissions.extend(role.permissions.iter().map(String::as_str));
        }
        let serialized = permissions.into_iter().collect::<Vec<_>>().join("\n");
        digest(&serialized)
    }
}

fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use uuid::Uuid;

    use crate::cache::backend::MemoryBackend;
    use crate::domain::{MemoryRoleStore, Role};

    use super::*;

    fn generator_with(roles: &[Role]) -> (PermissionsHashGenerator, Arc<MemoryBackend>) {
        let store = MemoryRoleStore::new();
        store.upsert(Role::new("authenticated"));
        for role in roles {
            store.upsert(role.clone());
        }
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(64).unwrap()));
        let generator = PermissionsHashGenerator::new(Arc::new(store), backend.clone());
        (generator, backend)
    }

    #[test]
    fn fingerprint_uses_the_fixed_key_format() {
        let account = Account::authenticated(Uuid::new_v4(), ["editor"]);
        assert_eq!(
            PermissionsHashGenerator::fingerprint(&account),
            "user_permissions_hash:authenticated,editor"
        );
    }

    #[test]
    fn missing_roles_contribute_nothing() {
        let (generator, _) = generator_with(&[]);
        let statics = RequestCache::new();

        let with_ghost = Account::authenticated(Uuid::new_v4(), ["ghost"]);
        let plain = Account::authenticated(Uuid::new_v4(), Vec::<String>::new());

        // Different fingerprints, identical content: both hash the empty
        // permission union.
        let ghost_hash = generator.generate(&with_ghost, &statics);
        let plain_hash = generator.generate(&plain, &statics);
        assert_eq!(ghost_hash, plain_hash);
    }

    #[test]
    fn persisted_entry_is_tagged_with_its_roles() {
        let (generator, backend) = generator_with(&[
            Role::new("editor").with_permissions(["access comments"]),
        ]);
        let statics = RequestCache::new();
        let account = Account::authenticated(Uuid::new_v4(), ["editor"]);

        generator.generate(&account, &statics);

        let key = PermissionsHashGenerator::fingerprint(&account);
        let item = backend.get(&key).expect("hash should be persisted");
        assert!(item.tags.contains(&"role:editor".to_string()));
        assert!(item.tags.contains(&"role:authenticated".to_string()));
    }

    #[test]
    fn role_tag_invalidation_forces_a_recompute() {
        let store = Arc::new(MemoryRoleStore::new());
        store.upsert(Role::new("authenticated"));
        store.upsert(Role::new("editor").with_permissions(["access comments"]));
        let backend = Arc::new(MemoryBackend::new(NonZeroUsize::new(64).unwrap()));
        let generator = PermissionsHashGenerator::new(store.clone(), backend.clone());

        let account = Account::authenticated(Uuid::new_v4(), ["editor"]);
        let before = generator.generate(&account, &RequestCache::new());

        // A permission grant changes nothing while the persisted entry
        // lives: the key is role-set-based, not content-based.
        store.upsert(Role::new("editor").with_permissions(["access comments", "post comments"]));
        let stale = generator.generate(&account, &RequestCache::new());
        assert_eq!(before, stale);

        backend.invalidate_tags(&["role:editor".to_string()]);
        let recomputed = generator.generate(&account, &RequestCache::new());
        assert_ne!(before, recomputed);
    }
}
