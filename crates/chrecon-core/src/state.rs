//! Actual server state as read by the state reader.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::privilege::Privilege;

/// A (database, table) pair grants apply to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Scope {
    /// Database component.
    pub database: String,
    /// Table component (`*` for all tables).
    pub table: String,
}

impl Scope {
    /// Create a scope.
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Current server-side state of one user, plus existence probes for the
/// objects the spec references.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserState {
    /// Whether the user exists.
    pub exists: bool,
    /// Opaque password fingerprint, when the server exposes one.
    pub password_hash: Option<String>,
    /// Roles currently granted to the user.
    pub roles: BTreeSet<String>,
    /// Settings profiles currently inherited by the user.
    pub profiles: Vec<String>,
    /// Quotas currently applied to the user.
    pub quotas: Vec<String>,
    /// Of the spec-referenced roles, the ones that exist on the server.
    pub existing_roles: BTreeSet<String>,
    /// Whether the spec-referenced profile exists. `None` when not probed.
    pub profile_exists: Option<bool>,
    /// Whether the spec-referenced quota exists. `None` when not probed.
    pub quota_exists: Option<bool>,
    /// Current apply-to list of the spec-referenced quota.
    pub quota_apply_users: Vec<String>,
}

impl UserState {
    /// Whether the given profile is already applied.
    pub fn has_profile(&self, profile: &str) -> bool {
        self.profiles.iter().any(|p| p == profile)
    }

    /// Whether the given quota is already applied.
    pub fn has_quota(&self, quota: &str) -> bool {
        self.quotas.iter().any(|q| q == quota)
    }
}

// The password fingerprint is opaque ciphertext; keep it out of Debug output.
impl fmt::Debug for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserState")
            .field("exists", &self.exists)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "********"))
            .field("roles", &self.roles)
            .field("profiles", &self.profiles)
            .field("quotas", &self.quotas)
            .field("existing_roles", &self.existing_roles)
            .field("profile_exists", &self.profile_exists)
            .field("quota_exists", &self.quota_exists)
            .field("quota_apply_users", &self.quota_apply_users)
            .finish()
    }
}

/// Current grants held by one grantee, keyed by scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantState {
    /// Whether the grantee exists as a user or role.
    pub grantee_exists: bool,
    /// Privileges currently held, per scope.
    pub privileges: BTreeMap<Scope, BTreeSet<Privilege>>,
}

impl GrantState {
    /// Privileges currently held at a scope (empty set when none).
    pub fn at(&self, scope: &Scope) -> BTreeSet<Privilege> {
        self.privileges.get(scope).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_ordering_and_display() {
        let a = Scope::new("main", "*");
        let b = Scope::new("main", "events");
        assert!(a < b);
        assert_eq!(b.to_string(), "main.events");
    }

    #[test]
    fn test_grant_state_lookup() {
        let mut state = GrantState::default();
        let scope = Scope::new("main", "*");
        state
            .privileges
            .entry(scope.clone())
            .or_default()
            .insert(Privilege::from_actual("SELECT"));

        assert_eq!(state.at(&scope).len(), 1);
        assert!(state.at(&Scope::new("other", "*")).is_empty());
    }

    #[test]
    fn test_user_state_debug_redacts_fingerprint() {
        let state = UserState {
            exists: true,
            password_hash: Some("deadbeef".to_string()),
            ..UserState::default()
        };
        let rendered = format!("{:?}", state);
        assert!(!rendered.contains("deadbeef"));
    }
}
