//! Role records and the role store boundary.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// A named role granting a set of permissions.
///
/// Immutable for the duration of a computation; mutation happens only in
/// the role-management layer that owns the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Machine name, unique across the store.
    pub id: String,
    /// Permission strings granted by this role.
    pub permissions: BTreeSet<String>,
    /// Administrative roles bypass permission checks entirely.
    pub is_admin: bool,
}

impl Role {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            permissions: BTreeSet::new(),
            is_admin: false,
        }
    }

    pub fn with_permissions(
        mut self,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Read access to role records.
pub trait RoleStore: Send + Sync {
    /// Bulk-load roles by id.
    ///
    /// Ids with no backing record are simply absent from the returned
    /// map; callers treat them as granting nothing.
    fn load_roles(&self, ids: &BTreeSet<String>) -> HashMap<String, Role>;
}

/// In-memory role store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    roles: RwLock<HashMap<String, Role>>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role record.
    pub fn upsert(&self, role: Role) {
        self.roles.write().unwrap().insert(role.id.clone(), role);
    }

    /// Remove a role record, if present.
    pub fn remove(&self, id: &str) {
        self.roles.write().unwrap().remove(id);
    }
}

impl RoleStore for MemoryRoleStore {
    fn load_roles(&self, ids: &BTreeSet<String>) -> HashMap<String, Role> {
        let roles = self.roles.read().unwrap();
        ids.iter()
            .filter_map(|id| roles.get(id).map(|role| (id.clone(), role.clone())))
            .collect()
    }
}
