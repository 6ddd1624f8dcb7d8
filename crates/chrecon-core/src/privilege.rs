//! Privilege token model.
//!
//! Tokens are canonicalized to upper case (`dictGet` keeps its server
//! spelling) and validated against the set of grants the server actually
//! accepts, split by the level they apply at.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Level a privilege applies at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Server-wide grants (KILL QUERY, CLUSTER, ...).
    System,
    /// Database-level grants (CREATE DATABASE, ...).
    Database,
    /// Table-level grants (SELECT, INSERT, ...).
    Table,
}

const SYSTEM_LEVEL: &[&str] = &[
    "CREATE FUNCTION",
    "DROP FUNCTION",
    "RELOAD DICTIONARY",
    "KILL QUERY",
    "MYSQL",
    "CLUSTER",
];

const DATABASE_LEVEL: &[&str] = &["CREATE DATABASE", "DROP DATABASE"];

const TABLE_LEVEL: &[&str] = &[
    "ALL",
    "SELECT",
    "SHOW",
    "dictGet",
    "INSERT",
    "UPDATE",
    "DELETE",
    "ALTER",
    "ALTER TABLE",
    "ALTER COLUMN",
    "ALTER CONSTRAINT",
    "ALTER INDEX",
    "ALTER VIEW",
    "ALTER TTL",
    "CREATE",
    "CREATE TABLE",
    "CREATE VIEW",
    "CREATE DICTIONARY",
    "DROP",
    "DROP TABLE",
    "DROP VIEW",
    "DROP DICTIONARY",
    "TRUNCATE",
    "OPTIMIZE",
];

/// A canonicalized privilege token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Privilege(String);

impl Privilege {
    /// Parse a spec-supplied token, rejecting anything the server would not
    /// accept as a grant.
    pub fn parse(token: &str) -> Result<Self, Error> {
        let canonical = canonicalize(token);
        let known = SYSTEM_LEVEL
            .iter()
            .chain(DATABASE_LEVEL)
            .chain(TABLE_LEVEL)
            .any(|t| *t == canonical);
        if !known {
            return Err(Error::Validation(format!(
                "'{}' is not an applicable grant",
                token
            )));
        }
        Ok(Privilege(canonical))
    }

    /// Canonicalize a token read back from the server without validating it;
    /// servers may report grants this engine does not manage.
    pub fn from_actual(token: &str) -> Self {
        Privilege(canonicalize(token))
    }

    /// The `ALL` token, which subsumes every other privilege at a scope.
    pub fn all() -> Self {
        Privilege("ALL".to_string())
    }

    /// Whether this is the `ALL` token.
    pub fn is_all(&self) -> bool {
        self.0 == "ALL"
    }

    /// Canonical token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The level this privilege applies at. Unmanaged tokens read back from
    /// the server default to table level.
    pub fn level(&self) -> PrivilegeLevel {
        if SYSTEM_LEVEL.contains(&self.0.as_str()) {
            PrivilegeLevel::System
        } else if DATABASE_LEVEL.contains(&self.0.as_str()) {
            PrivilegeLevel::Database
        } else {
            PrivilegeLevel::Table
        }
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn canonicalize(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.eq_ignore_ascii_case("dictGet") {
        return "dictGet".to_string();
    }
    trimmed.to_ascii_uppercase()
}
