//! Diff engine.
//!
//! Compares a normalized target against read server state and produces the
//! ordered operation sequence that converges the server to the target. The
//! sequence is idempotent: run against a server already matching the target
//! it comes out empty. Pure - no I/O happens here.

use std::collections::BTreeSet;

use crate::error::{Error, ObjectKind};
use crate::op::Operation;
use crate::privilege::Privilege;
use crate::spec::{GrantMode, GrantTarget, Presence, UserTarget};
use crate::state::{GrantState, Scope, UserState};

/// Compute the operations required to converge one user.
///
/// Ordering: create/alter statements first, then role creation, then role
/// grants, then role revocations. A role grant never precedes the creation
/// of the role it references.
pub fn diff_user(target: &UserTarget, actual: &UserState) -> Result<Vec<Operation>, Error> {
    match (target.state, actual.exists) {
        (Presence::Absent, true) => Ok(vec![Operation::DropUser {
            name: target.name.clone(),
        }]),
        (Presence::Absent, false) => Ok(Vec::new()),
        (Presence::Present, false) => diff_create_user(target, actual),
        (Presence::Present, true) => diff_update_user(target, actual),
    }
}

fn diff_create_user(target: &UserTarget, actual: &UserState) -> Result<Vec<Operation>, Error> {
    check_references(target, actual)?;

    let mut ops = vec![Operation::CreateUser {
        name: target.name.clone(),
        password_hash: target.password_hash.clone(),
    }];

    if let Some(profile) = &target.profile {
        ops.push(Operation::AlterUserProfile {
            name: target.name.clone(),
            profile: profile.clone(),
        });
    }
    if let Some(quota) = &target.quota {
        ops.push(quota_op(quota, &actual.quota_apply_users, &target.name));
    }
    if let Some(roles) = &target.roles {
        let (creates, grants) = role_grant_ops(target, roles, &BTreeSet::new(), actual)?;
        ops.extend(creates);
        ops.extend(grants);
    }

    Ok(ops)
}

fn diff_update_user(target: &UserTarget, actual: &UserState) -> Result<Vec<Operation>, Error> {
    check_references(target, actual)?;

    let mut ops = Vec::new();

    if let Some(hash) = &target.password_hash {
        if actual.password_hash.as_deref() != Some(hash.as_str()) {
            ops.push(Operation::AlterUserPassword {
                name: target.name.clone(),
                password_hash: hash.clone(),
            });
        }
    }
    if let Some(profile) = &target.profile {
        if !actual.has_profile(profile) {
            ops.push(Operation::AlterUserProfile {
                name: target.name.clone(),
                profile: profile.clone(),
            });
        }
    }
    if let Some(quota) = &target.quota {
        if !actual.has_quota(quota) {
            ops.push(quota_op(quota, &actual.quota_apply_users, &target.name));
        }
    }
    if let Some(roles) = &target.roles {
        let (creates, grants) = role_grant_ops(target, roles, &actual.roles, actual)?;
        ops.extend(creates);
        ops.extend(grants);
        for role in actual.roles.difference(roles) {
            ops.push(Operation::RevokeRole {
                user: target.name.clone(),
                role: role.clone(),
            });
        }
    }

    Ok(ops)
}

// Profile and quota references must exist; roles are handled separately
// because init_roles can create them.
fn check_references(target: &UserTarget, actual: &UserState) -> Result<(), Error> {
    if let Some(profile) = &target.profile {
        if actual.profile_exists == Some(false) {
            return Err(Error::NotFound {
                kind: ObjectKind::Profile,
                name: profile.clone(),
            });
        }
    }
    if let Some(quota) = &target.quota {
        if actual.quota_exists == Some(false) {
            return Err(Error::NotFound {
                kind: ObjectKind::Quota,
                name: quota.clone(),
            });
        }
    }
    Ok(())
}

// ALTER QUOTA replaces the whole apply list, so carry the existing members
// plus this user.
fn quota_op(quota: &str, current_apply: &[String], user: &str) -> Operation {
    let mut apply_to = current_apply.to_vec();
    if !apply_to.iter().any(|u| u == user) {
        apply_to.push(user.to_string());
    }
    Operation::AlterUserQuota {
        quota: quota.to_string(),
        apply_to,
    }
}

fn role_grant_ops(
    target: &UserTarget,
    wanted: &BTreeSet<String>,
    current: &BTreeSet<String>,
    actual: &UserState,
) -> Result<(Vec<Operation>, Vec<Operation>), Error> {
    let mut creates = Vec::new();
    let mut grants = Vec::new();

    for role in wanted.difference(current) {
        if !actual.existing_roles.contains(role) {
            if !target.init_roles {
                return Err(Error::NotFound {
                    kind: ObjectKind::Role,
                    name: role.clone(),
                });
            }
            creates.push(Operation::CreateRole { role: role.clone() });
        }
        grants.push(Operation::GrantRole {
            user: target.name.clone(),
            role: role.clone(),
        });
    }

    Ok((creates, grants))
}

/// Compute the operations required to converge one grantee's privileges.
///
/// Scopes are visited in spec order. At a scope, revokes are emitted before
/// grants so a replace never leaves a transient union of old and new sets in
/// the generated sequence.
pub fn diff_grants(target: &GrantTarget, actual: &GrantState) -> Result<Vec<Operation>, Error> {
    let wanted = &target.privileges;
    let wants_all = wanted.iter().any(Privilege::is_all);

    let mut ops = Vec::new();
    let mut visited = BTreeSet::new();

    for database in &target.databases {
        for table in &target.tables {
            let scope = Scope::new(database.clone(), table.clone());
            if !visited.insert(scope.clone()) {
                continue;
            }
            let current = actual.at(&scope);
            let current_has_all = current.iter().any(Privilege::is_all);

            match target.mode {
                GrantMode::Revoke => {
                    // Wanted entries form a keep-list; ALL keeps everything.
                    if wants_all {
                        continue;
                    }
                    let to_revoke: Vec<_> = current.difference(wanted).cloned().collect();
                    if !to_revoke.is_empty() {
                        ops.push(Operation::Revoke {
                            grantee: target.grantee.clone(),
                            privileges: to_revoke,
                            scope,
                        });
                    }
                }
                GrantMode::Replace => {
                    if wants_all {
                        // ALL supersedes whatever is currently held.
                        if !current_has_all {
                            ops.push(grant_all(target, scope));
                        }
                        continue;
                    }
                    let to_revoke: Vec<_> = current.difference(wanted).cloned().collect();
                    if !to_revoke.is_empty() {
                        ops.push(Operation::Revoke {
                            grantee: target.grantee.clone(),
                            privileges: to_revoke,
                            scope: scope.clone(),
                        });
                    }
                    let to_grant: Vec<_> = wanted.difference(&current).cloned().collect();
                    if !to_grant.is_empty() {
                        ops.push(Operation::Grant {
                            grantee: target.grantee.clone(),
                            privileges: to_grant,
                            scope,
                        });
                    }
                }
                GrantMode::Additive => {
                    if wants_all {
                        if !current_has_all {
                            ops.push(grant_all(target, scope));
                        }
                        continue;
                    }
                    let to_grant: Vec<_> = wanted.difference(&current).cloned().collect();
                    if !to_grant.is_empty() {
                        ops.push(Operation::Grant {
                            grantee: target.grantee.clone(),
                            privileges: to_grant,
                            scope,
                        });
                    }
                }
            }
        }
    }

    Ok(ops)
}

fn grant_all(target: &GrantTarget, scope: Scope) -> Operation {
    Operation::Grant {
        grantee: target.grantee.clone(),
        privileges: vec![Privilege::all()],
        scope,
    }
}
