//! Engine error types.

use thiserror::Error;

/// Kind of database object a spec referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A user principal.
    User,
    /// A role principal.
    Role,
    /// A settings profile.
    Profile,
    /// A quota.
    Quota,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::User => write!(f, "user"),
            ObjectKind::Role => write!(f, "role"),
            ObjectKind::Profile => write!(f, "profile"),
            ObjectKind::Quota => write!(f, "quota"),
        }
    }
}

/// Reconciliation errors.
///
/// `Validation` and `NotFound` are raised before any statement is generated;
/// `Execution` carries the text of the statement the server rejected, with
/// password literals redacted; `Connection` surfaces transport failures from
/// the collaborator verbatim.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or contradictory spec. Raised before any query is issued.
    #[error("invalid spec: {0}")]
    Validation(String),

    /// A referenced object does not exist on the server.
    #[error("{kind} '{name}' does not exist")]
    NotFound {
        /// What kind of object was referenced.
        kind: ObjectKind,
        /// Name of the missing object.
        name: String,
    },

    /// The server rejected a generated statement.
    #[error("statement failed: {statement}: {message}")]
    Execution {
        /// Rejected statement text, with password literals redacted.
        statement: String,
        /// The server's error message.
        message: String,
    },

    /// Transport-level failure from the database collaborator.
    #[error("connection error: {0}")]
    Connection(#[from] chrecon_client::Error),
}
