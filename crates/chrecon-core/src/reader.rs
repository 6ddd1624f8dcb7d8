//! State reader: read-only introspection of the live server.
//!
//! Every query here is a SELECT against the `system.*` tables; absence of a
//! principal is a normal outcome, never an error. Which probes run depends
//! on what the spec references (roles, profile, quota), since creating a
//! user needs to know whether those objects exist before any DDL is emitted.

use tracing::debug;

use chrecon_client::{Row, SqlClient, Value};

use crate::error::Error;
use crate::spec::{GrantTarget, UserTarget};
use crate::sql::quote_literal;
use crate::state::{GrantState, Scope, UserState};

/// Reads actual principal state through the database collaborator.
pub struct StateReader<'a, C: SqlClient> {
    client: &'a C,
}

impl<'a, C: SqlClient> StateReader<'a, C> {
    /// Create a reader over a client.
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Read the current state of the user a spec targets, including
    /// existence probes for the roles, profile, and quota it references.
    pub async fn read_user(&self, target: &UserTarget) -> Result<UserState, Error> {
        debug!(user = %target.name, "reading user state");

        let mut state = UserState {
            exists: self
                .count(&format!(
                    "SELECT count() FROM system.users WHERE name = {}",
                    quote_literal(&target.name)
                ))
                .await?
                > 0,
            ..UserState::default()
        };

        if state.exists {
            state.password_hash = self
                .first_text(&format!(
                    "SELECT auth_params FROM system.users WHERE name = {}",
                    quote_literal(&target.name)
                ))
                .await?
                .filter(|fingerprint| !fingerprint.is_empty());
            state.roles = self
                .text_column(&format!(
                    "SELECT granted_role_name FROM system.role_grants WHERE user_name = {}",
                    quote_literal(&target.name)
                ))
                .await?
                .into_iter()
                .collect();
            state.profiles = self
                .text_column(&format!(
                    "SELECT inherit_profile FROM system.settings_profile_elements WHERE user_name = {}",
                    quote_literal(&target.name)
                ))
                .await?;
            state.quotas = self
                .text_column(&format!(
                    "SELECT name FROM system.quotas WHERE has(apply_to_list, {})",
                    quote_literal(&target.name)
                ))
                .await?;
        }

        if let Some(roles) = &target.roles {
            for role in roles {
                let exists = self
                    .count(&format!(
                        "SELECT count() FROM system.roles WHERE name = {}",
                        quote_literal(role)
                    ))
                    .await?
                    > 0;
                if exists {
                    state.existing_roles.insert(role.clone());
                }
            }
        }

        if let Some(profile) = &target.profile {
            let exists = self
                .count(&format!(
                    "SELECT count() FROM system.settings_profiles WHERE name = {}",
                    quote_literal(profile)
                ))
                .await?
                > 0;
            state.profile_exists = Some(exists);
        }

        if let Some(quota) = &target.quota {
            let rows = self
                .client
                .execute(&format!(
                    "SELECT apply_to_list FROM system.quotas WHERE name = {}",
                    quote_literal(quota)
                ))
                .await?;
            state.quota_exists = Some(!rows.is_empty());
            state.quota_apply_users = rows
                .first()
                .and_then(|row| row.first())
                .and_then(Value::as_text_array)
                .map(<[String]>::to_vec)
                .unwrap_or_default();
        }

        Ok(state)
    }

    /// Read the grants currently held by the grantee a spec targets.
    pub async fn read_grants(&self, target: &GrantTarget) -> Result<GrantState, Error> {
        debug!(grantee = %target.grantee, "reading grant state");

        let grantee = quote_literal(&target.grantee);
        let user_count = self
            .count(&format!(
                "SELECT count() FROM system.users WHERE name = {}",
                grantee
            ))
            .await?;
        let role_count = self
            .count(&format!(
                "SELECT count() FROM system.roles WHERE name = {}",
                grantee
            ))
            .await?;

        let mut state = GrantState {
            grantee_exists: user_count + role_count > 0,
            ..GrantState::default()
        };

        let rows = self
            .client
            .execute(&format!(
                "SELECT access_type, database, table FROM system.grants \
                 WHERE user_name = {} OR role_name = {}",
                grantee, grantee
            ))
            .await?;

        for row in rows {
            let Some(access) = row.first().and_then(Value::as_text) else {
                continue;
            };
            let database = cell_or_star(&row, 1);
            let table = cell_or_star(&row, 2);
            state
                .privileges
                .entry(Scope::new(database, table))
                .or_default()
                .insert(crate::privilege::Privilege::from_actual(access));
        }

        Ok(state)
    }

    async fn count(&self, sql: &str) -> Result<u64, Error> {
        let rows = self.client.execute(sql).await?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_uint)
            .unwrap_or(0))
    }

    async fn first_text(&self, sql: &str) -> Result<Option<String>, Error> {
        let rows = self.client.execute(sql).await?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_text)
            .map(str::to_string))
    }

    async fn text_column(&self, sql: &str) -> Result<Vec<String>, Error> {
        let rows = self.client.execute(sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_text))
            .map(str::to_string)
            .collect())
    }
}

// A NULL database/table in system.grants means "any".
fn cell_or_star(row: &Row, index: usize) -> String {
    row.get(index)
        .and_then(Value::as_text)
        .unwrap_or("*")
        .to_string()
}
