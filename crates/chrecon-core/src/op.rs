//! Typed operations produced by the diff engine.
//!
//! Operations carry identifiers and payload only; rendering to SQL is a
//! separate step so tests can assert on structure instead of strings.

use crate::privilege::Privilege;
use crate::state::Scope;

/// One required change, ready to be rendered as a single SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Create a user, optionally with a password hash.
    CreateUser {
        /// User name.
        name: String,
        /// Opaque pre-hashed password.
        password_hash: Option<String>,
    },
    /// Replace a user's password hash.
    AlterUserPassword {
        /// User name.
        name: String,
        /// Opaque pre-hashed password.
        password_hash: String,
    },
    /// Apply a settings profile to a user.
    AlterUserProfile {
        /// User name.
        name: String,
        /// Profile name.
        profile: String,
    },
    /// Re-point a quota at a full apply-to list.
    AlterUserQuota {
        /// Quota name.
        quota: String,
        /// Complete new apply-to list.
        apply_to: Vec<String>,
    },
    /// Create a role if it does not exist.
    CreateRole {
        /// Role name.
        role: String,
    },
    /// Grant a role to a user.
    GrantRole {
        /// User name.
        user: String,
        /// Role name.
        role: String,
    },
    /// Revoke a role from a user.
    RevokeRole {
        /// User name.
        user: String,
        /// Role name.
        role: String,
    },
    /// Drop a user.
    DropUser {
        /// User name.
        name: String,
    },
    /// Grant privileges at a scope.
    Grant {
        /// Grantee (user or role).
        grantee: String,
        /// Privileges to grant, in canonical order.
        privileges: Vec<Privilege>,
        /// Scope the grant applies to.
        scope: Scope,
    },
    /// Revoke privileges at a scope.
    Revoke {
        /// Grantee (user or role).
        grantee: String,
        /// Privileges to revoke, in canonical order.
        privileges: Vec<Privilege>,
        /// Scope the revoke applies to.
        scope: Scope,
    },
}

impl Operation {
    /// Payload-free description, safe for logs (never includes a hash).
    pub fn describe(&self) -> String {
        match self {
            Operation::CreateUser { name, .. } => format!("create user '{}'", name),
            Operation::AlterUserPassword { name, .. } => {
                format!("alter password for '{}'", name)
            }
            Operation::AlterUserProfile { name, profile } => {
                format!("apply profile '{}' to '{}'", profile, name)
            }
            Operation::AlterUserQuota { quota, .. } => format!("re-point quota '{}'", quota),
            Operation::CreateRole { role } => format!("create role '{}'", role),
            Operation::GrantRole { user, role } => {
                format!("grant role '{}' to '{}'", role, user)
            }
            Operation::RevokeRole { user, role } => {
                format!("revoke role '{}' from '{}'", role, user)
            }
            Operation::DropUser { name } => format!("drop user '{}'", name),
            Operation::Grant {
                grantee, scope, ..
            } => format!("grant on {} to '{}'", scope, grantee),
            Operation::Revoke {
                grantee, scope, ..
            } => format!("revoke on {} from '{}'", scope, grantee),
        }
    }
}
