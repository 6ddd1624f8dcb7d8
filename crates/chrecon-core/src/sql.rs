//! SQL statement generation.
//!
//! Pure rendering of [`Operation`] values into single statements. Every
//! user-supplied name goes through identifier or literal quoting; the
//! renderer never touches the network.

use crate::op::Operation;
use crate::state::Scope;

const REDACTED: &str = "********";

/// Backquote an identifier, escaping backslashes and backticks.
pub fn quote_ident(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('`');
    for c in name.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '`' => quoted.push_str("\\`"),
            _ => quoted.push(c),
        }
    }
    quoted.push('`');
    quoted
}

/// Single-quote a string literal, escaping backslashes and quotes.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn render_scope(scope: &Scope) -> String {
    let database = if scope.database == "*" {
        "*".to_string()
    } else {
        quote_ident(&scope.database)
    };
    let table = if scope.table == "*" {
        "*".to_string()
    } else {
        quote_ident(&scope.table)
    };
    format!("{}.{}", database, table)
}

/// Renders operations to SQL, optionally with an `ON CLUSTER` clause on
/// GRANT/REVOKE statements.
#[derive(Debug, Clone, Default)]
pub struct SqlRenderer {
    cluster: Option<String>,
}

impl SqlRenderer {
    /// Create a renderer without cluster context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render GRANT/REVOKE with `ON CLUSTER`.
    pub fn with_cluster(mut self, cluster: Option<String>) -> Self {
        self.cluster = cluster;
        self
    }

    /// Render one operation with any password literal replaced by
    /// `'********'`. This is the form reports and errors carry; the
    /// unredacted form only ever goes to the server.
    pub fn render_redacted(&self, op: &Operation) -> String {
        match op {
            Operation::CreateUser {
                name,
                password_hash: Some(_),
            } => self.render(&Operation::CreateUser {
                name: name.clone(),
                password_hash: Some(REDACTED.to_string()),
            }),
            Operation::AlterUserPassword { name, .. } => {
                self.render(&Operation::AlterUserPassword {
                    name: name.clone(),
                    password_hash: REDACTED.to_string(),
                })
            }
            _ => self.render(op),
        }
    }

    /// Render one operation as one SQL statement.
    pub fn render(&self, op: &Operation) -> String {
        match op {
            Operation::CreateUser {
                name,
                password_hash,
            } => match password_hash {
                Some(hash) => format!(
                    "CREATE USER {} IDENTIFIED WITH sha256_hash BY {}",
                    quote_ident(name),
                    quote_literal(hash)
                ),
                None => format!("CREATE USER {}", quote_ident(name)),
            },
            Operation::AlterUserPassword {
                name,
                password_hash,
            } => format!(
                "ALTER USER {} IDENTIFIED WITH sha256_hash BY {}",
                quote_ident(name),
                quote_literal(password_hash)
            ),
            Operation::AlterUserProfile { name, profile } => format!(
                "ALTER USER {} SETTINGS PROFILE {}",
                quote_ident(name),
                quote_literal(profile)
            ),
            Operation::AlterUserQuota { quota, apply_to } => {
                let users = apply_to
                    .iter()
                    .map(|u| quote_ident(u))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("ALTER QUOTA {} TO {}", quote_ident(quota), users)
            }
            Operation::CreateRole { role } => {
                format!("CREATE ROLE IF NOT EXISTS {}", quote_ident(role))
            }
            Operation::GrantRole { user, role } => {
                format!("GRANT {} TO {}", quote_ident(role), quote_ident(user))
            }
            Operation::RevokeRole { user, role } => {
                format!("REVOKE {} FROM {}", quote_ident(role), quote_ident(user))
            }
            Operation::DropUser { name } => format!("DROP USER {}", quote_ident(name)),
            Operation::Grant {
                grantee,
                privileges,
                scope,
            } => format!(
                "GRANT {}{} ON {} TO {}",
                self.cluster_clause(),
                join_privileges(privileges),
                render_scope(scope),
                quote_ident(grantee)
            ),
            Operation::Revoke {
                grantee,
                privileges,
                scope,
            } => format!(
                "REVOKE {}{} ON {} FROM {}",
                self.cluster_clause(),
                join_privileges(privileges),
                render_scope(scope),
                quote_ident(grantee)
            ),
        }
    }

    fn cluster_clause(&self) -> String {
        match &self.cluster {
            Some(cluster) => format!("ON CLUSTER {} ", quote_ident(cluster)),
            None => String::new(),
        }
    }
}

fn join_privileges(privileges: &[crate::privilege::Privilege]) -> String {
    privileges
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
