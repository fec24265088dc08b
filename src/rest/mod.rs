//! Data service layer for the remote tables.
//!
//! The repositories talk to the backend only through [`DataService`], a small
//! select/insert/update/delete surface with equality filters. The production
//! implementation is [`postgrest::PostgrestClient`].

pub mod postgrest;

#[cfg(test)]
pub mod memory;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while talking to the backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or IO failure before a response was received
    #[error("request to '{table}' failed: {message}")]
    Transport { table: String, message: String },

    /// The backend answered with a non-success status
    #[error("backend returned {code} for '{table}': {body}")]
    Status {
        table: String,
        code: u16,
        body: String,
    },

    /// Rows did not match the expected shape
    #[error("failed to decode rows from '{table}': {source}")]
    Decode {
        table: String,
        source: serde_json::Error,
    },
}

/// Equality constraint on a named column
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    /// Query-string operand, e.g. `eq.teste@exemplo.com`
    pub fn query_value(&self) -> String {
        format!("eq.{}", render_scalar(&self.value))
    }

    /// Whether a row satisfies this filter. Values compare by their textual
    /// form, the way the query string carries them.
    #[cfg(test)]
    pub fn matches(&self, row: &Value) -> bool {
        match row.get(&self.column) {
            Some(Value::Null) | None => self.value.is_null(),
            Some(v) => render_scalar(v) == render_scalar(&self.value),
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Trait for backends to allow mocking and abstraction
pub trait DataService {
    /// Fetch all rows of `table`, optionally constrained by `filter`
    fn select(&self, table: &str, filter: Option<&Filter>) -> Result<Vec<Value>, BackendError>;

    /// Insert one row and return the stored representation
    fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>, BackendError>;

    /// Apply the fields of `row` to every row matching `filter`
    fn update(&self, table: &str, row: &Value, filter: &Filter) -> Result<(), BackendError>;

    /// Remove every row matching `filter`
    fn delete(&self, table: &str, filter: &Filter) -> Result<(), BackendError>;
}

/// Decode raw rows into a named-field shape
pub fn decode_rows<T: DeserializeOwned>(
    table: &str,
    rows: Vec<Value>,
) -> Result<Vec<T>, BackendError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|source| BackendError::Decode {
                table: table.to_string(),
                source,
            })
        })
        .collect()
}

/// Column names of the first row, for logging schema drift
pub fn column_names(rows: &[Value]) -> Vec<String> {
    rows.first()
        .and_then(Value::as_object)
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}
