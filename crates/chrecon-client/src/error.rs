//! Transport-level error types.

use thiserror::Error;

/// Errors surfaced by a [`SqlClient`](crate::SqlClient) implementation.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Connection failed or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server rejected a statement.
    #[error("server error {code}: {message}")]
    Server {
        /// Server-side error code.
        code: i32,
        /// Server-side error message.
        message: String,
    },
}
