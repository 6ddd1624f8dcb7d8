//! Database-collaborator surface for chrecon.
//!
//! The reconciliation engine never owns a transport. It talks to the server
//! through the [`SqlClient`] trait defined here, and the caller supplies a
//! concrete driver (native TCP, HTTP, a test double) together with the
//! [`ClientConfig`] connection parameters. This crate is the shared
//! vocabulary between the engine and whatever driver the caller wires in.

pub mod config;
pub mod error;
pub mod value;

pub use config::ClientConfig;
pub use error::Error;
pub use value::{Row, Value};

use std::future::Future;

/// Query-execute primitive the reconciliation engine runs against.
///
/// `execute` submits one SQL statement and returns the result rows.
/// Introspection SELECTs return data rows; DDL/DCL statements return an
/// empty row set on success. Transport concerns (TLS, timeouts, retries on
/// broken connections) belong to the implementation, not to callers.
pub trait SqlClient {
    /// Execute a single SQL statement and return its result rows.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<Vec<Row>, Error>> + Send;
}
