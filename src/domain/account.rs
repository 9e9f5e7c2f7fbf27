//! Viewer accounts.

use std::collections::BTreeSet;

use uuid::Uuid;

/// Implicit role carried by every unauthenticated viewer.
pub const ANONYMOUS_ROLE: &str = "anonymous";

/// Implicit role carried by every authenticated viewer.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// The viewer on whose behalf a render runs.
///
/// The role set is never empty: the constructors always include the
/// implicit `anonymous` or `authenticated` role. Two accounts with the
/// same role set are interchangeable for cache purposes regardless of
/// their identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: Uuid,
    roles: BTreeSet<String>,
}

impl Account {
    /// An unauthenticated viewer.
    pub fn anonymous() -> Self {
        Self {
            id: Uuid::nil(),
            roles: BTreeSet::from([ANONYMOUS_ROLE.to_string()]),
        }
    }

    /// An authenticated viewer holding zero or more extra roles.
    pub fn authenticated(
        id: Uuid,
        roles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        roles.insert(AUTHENTICATED_ROLE.to_string());
        Self { id, roles }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Role ids, sorted and deduplicated.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Sorted role ids joined by `,`.
    pub fn role_list(&self) -> String {
        self.roles
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_account_carries_the_anonymous_role() {
        let account = Account::anonymous();
        assert!(account.roles().contains(ANONYMOUS_ROLE));
        assert_eq!(account.roles().len(), 1);
    }

    #[test]
    fn authenticated_account_always_carries_the_authenticated_role() {
        let account = Account::authenticated(Uuid::new_v4(), Vec::<String>::new());
        assert!(account.roles().contains(AUTHENTICATED_ROLE));
    }

    #[test]
    fn role_list_is_sorted_regardless_of_insertion_order() {
        let a = Account::authenticated(Uuid::new_v4(), ["editor", "publisher"]);
        let b = Account::authenticated(Uuid::new_v4(), ["publisher", "editor"]);
        assert_eq!(a.role_list(), "authenticated,editor,publisher");
        assert_eq!(a.role_list(), b.role_list());
    }

    #[test]
    fn duplicate_roles_collapse() {
        let account = Account::authenticated(Uuid::new_v4(), ["editor", "editor"]);
        assert_eq!(account.role_list(), "authenticated,editor");
    }
}
