//! Desired-state records and normalization.
//!
//! Raw records arrive loosely specified from an external orchestration
//! layer; the [`Normalizer`] fills defaults and produces canonical targets
//! before any diffing occurs. Whether `user_roles` was supplied at all is
//! preserved through normalization: an omitted role list means "do not touch
//! roles", which is different from an explicitly empty one.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::privilege::Privilege;

/// Desired presence of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// The user should exist.
    Present,
    /// The user should not exist.
    Absent,
}

/// Raw user record as supplied by the caller.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSpec {
    /// User name. Required.
    pub user_name: String,
    /// Pre-hashed password, used verbatim when present.
    pub password_hash: Option<String>,
    /// Plaintext password; requires an injected hashing collaborator.
    pub password: Option<String>,
    /// Roles the user should hold. `None` means "do not touch roles".
    pub user_roles: Option<Vec<String>>,
    /// Settings profile to apply.
    pub user_profile: Option<String>,
    /// Quota to apply.
    pub user_quota: Option<String>,
    /// Whether the user should exist.
    pub user_state: Presence,
    /// Create roles referenced by `user_roles` when they are missing.
    pub init_roles: bool,
}

impl Default for UserSpec {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            password_hash: None,
            password: None,
            user_roles: None,
            user_profile: None,
            user_quota: None,
            user_state: Presence::Present,
            init_roles: true,
        }
    }
}

// Passwords must not leak through Debug output.
impl fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSpec")
            .field("user_name", &self.user_name)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "********"))
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("user_roles", &self.user_roles)
            .field("user_profile", &self.user_profile)
            .field("user_quota", &self.user_quota)
            .field("user_state", &self.user_state)
            .field("init_roles", &self.init_roles)
            .finish()
    }
}

/// Raw grant record as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GranteeSpec {
    /// User or role the grants target. Required.
    pub grantee_name: String,
    /// Privilege tokens to reconcile.
    pub grants: Vec<String>,
    /// Databases the grants apply to.
    pub databases: Vec<String>,
    /// Tables the grants apply to.
    pub tables: Vec<String>,
    /// Drop privileges at each scope that are not in `grants`.
    pub replace_grants: bool,
    /// Revoke privileges at each scope that are not in `grants`.
    pub revoke_grants: bool,
    /// Render GRANT/REVOKE with an `ON CLUSTER` clause.
    pub cluster: Option<String>,
}

impl Default for GranteeSpec {
    fn default() -> Self {
        Self {
            grantee_name: String::new(),
            grants: Vec::new(),
            databases: vec!["default".to_string()],
            tables: vec!["*".to_string()],
            replace_grants: false,
            revoke_grants: false,
            cluster: None,
        }
    }
}

/// Canonical user target produced by normalization.
#[derive(Clone, PartialEq, Eq)]
pub struct UserTarget {
    /// User name.
    pub name: String,
    /// Opaque password hash, if a password was specified.
    pub password_hash: Option<String>,
    /// Role set to converge to; `None` leaves roles untouched.
    pub roles: Option<BTreeSet<String>>,
    /// Settings profile, if specified.
    pub profile: Option<String>,
    /// Quota, if specified.
    pub quota: Option<String>,
    /// Desired presence.
    pub state: Presence,
    /// Create missing referenced roles.
    pub init_roles: bool,
}

impl fmt::Debug for UserTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserTarget")
            .field("name", &self.name)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "********"))
            .field("roles", &self.roles)
            .field("profile", &self.profile)
            .field("quota", &self.quota)
            .field("state", &self.state)
            .field("init_roles", &self.init_roles)
            .finish()
    }
}

/// Direction of grant reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantMode {
    /// Grant what is missing; never revoke.
    Additive,
    /// Grant what is missing and revoke what is not wanted.
    Replace,
    /// Revoke everything current that is not in the wanted set.
    Revoke,
}

/// Canonical grant target produced by normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
    /// Grantee (user or role).
    pub grantee: String,
    /// Wanted privileges.
    pub privileges: BTreeSet<Privilege>,
    /// Database scope components, in spec order.
    pub databases: Vec<String>,
    /// Table scope components, in spec order.
    pub tables: Vec<String>,
    /// Reconciliation direction.
    pub mode: GrantMode,
    /// Cluster for distributed GRANT/REVOKE.
    pub cluster: Option<String>,
}

/// Pure hashing collaborator for plaintext passwords.
pub type PasswordHasher = dyn Fn(&str) -> String + Send + Sync;

/// Turns raw records into canonical targets, filling defaults and rejecting
/// contradictory specs before any query is issued.
pub struct Normalizer {
    hasher: Option<Box<PasswordHasher>>,
}

impl Normalizer {
    /// Create a normalizer without a hashing collaborator; plaintext
    /// passwords will be rejected.
    pub fn new() -> Self {
        Self { hasher: None }
    }

    /// Inject the hashing collaborator used for plaintext passwords.
    pub fn with_hasher(mut self, hasher: Box<PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Normalize a raw user record.
    pub fn user(&self, spec: &UserSpec) -> Result<UserTarget, Error> {
        if spec.user_name.is_empty() {
            return Err(Error::Validation("user_name is required".to_string()));
        }

        let password_hash = match (&spec.password_hash, &spec.password) {
            (Some(_), Some(_)) => {
                return Err(Error::Validation(
                    "only one of password and password_hash may be set".to_string(),
                ));
            }
            (Some(hash), None) => Some(hash.clone()),
            (None, Some(plaintext)) => match &self.hasher {
                Some(hasher) => Some(hasher(plaintext)),
                None => {
                    return Err(Error::Validation(
                        "plaintext password given but no hasher is configured".to_string(),
                    ));
                }
            },
            (None, None) => None,
        };

        let roles = spec
            .user_roles
            .as_ref()
            .map(|roles| roles.iter().cloned().collect::<BTreeSet<_>>());

        Ok(UserTarget {
            name: spec.user_name.clone(),
            password_hash,
            roles,
            profile: spec.user_profile.clone(),
            quota: spec.user_quota.clone(),
            state: spec.user_state,
            init_roles: spec.init_roles,
        })
    }

    /// Normalize a raw grant record.
    pub fn grants(&self, spec: &GranteeSpec) -> Result<GrantTarget, Error> {
        if spec.grantee_name.is_empty() {
            return Err(Error::Validation("grantee_name is required".to_string()));
        }
        if spec.replace_grants && spec.revoke_grants {
            return Err(Error::Validation(
                "replace_grants and revoke_grants are mutually exclusive".to_string(),
            ));
        }

        let mode = if spec.revoke_grants {
            GrantMode::Revoke
        } else if spec.replace_grants {
            GrantMode::Replace
        } else {
            GrantMode::Additive
        };

        // An empty wanted set is only meaningful as a keep-list.
        if spec.grants.is_empty() && mode == GrantMode::Additive {
            return Err(Error::Validation("no grants are defined".to_string()));
        }

        let privileges = spec
            .grants
            .iter()
            .map(|token| Privilege::parse(token))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let databases = if spec.databases.is_empty() {
            vec!["default".to_string()]
        } else {
            spec.databases.clone()
        };
        let tables = if spec.tables.is_empty() {
            vec!["*".to_string()]
        } else {
            spec.tables.clone()
        };

        Ok(GrantTarget {
            grantee: spec.grantee_name.clone(),
            privileges,
            databases,
            tables,
            mode,
            cluster: spec.cluster.clone(),
        })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
