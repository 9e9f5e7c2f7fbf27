//! Domain model: viewer accounts and the role store boundary.

mod account;
mod roles;

pub use account::{ANONYMOUS_ROLE, AUTHENTICATED_ROLE, Account};
pub use roles::{MemoryRoleStore, Role, RoleStore};
