//! Result row model for introspection queries.
//!
//! The engine only ever reads a handful of `system.*` column shapes, so the
//! value model is deliberately small: text, unsigned counters, text arrays
//! (`apply_to_list`), and NULL.

use serde::{Deserialize, Serialize};

/// One result row.
pub type Row = Vec<Value>;

/// A single result cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// String column.
    Text(String),
    /// Unsigned integer column (e.g. `count()`).
    UInt(u64),
    /// Array-of-strings column (e.g. `apply_to_list`).
    TextArray(Vec<String>),
    /// NULL.
    Null,
}

impl Value {
    /// Borrow the cell as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Read the cell as an unsigned integer, if it is one.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the cell as a text array, if it is one.
    pub fn as_text_array(&self) -> Option<&[String]> {
        match self {
            Value::TextArray(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the cell is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::TextArray(items)
    }
}
