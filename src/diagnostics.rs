//! Schema-drift diagnostics for the backend tables.
//!
//! The owner-column check runs when the exercise list opens; everything
//! else is reachable only with `--debug` or through the `debug` subcommand.

use crate::exercises::OWNER_COLUMN;
use crate::models::UserVariant;
use crate::rest::{column_names, decode_rows, DataService};
use serde_json::{Map, Value};

/// Result of probing the exercises table for the owner column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    /// The owner column is present
    Ready,
    /// No rows to inspect; assumed fine
    Empty,
    MissingColumn(String),
    /// The table could not be read at all
    Unreachable(String),
}

impl SchemaCheck {
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ready | Self::Empty)
    }
}

pub struct Diagnostics<'a> {
    service: &'a dyn DataService,
    users_table: String,
    exercises_table: String,
}

impl<'a> Diagnostics<'a> {
    pub fn new(service: &'a dyn DataService, users_table: &str, exercises_table: &str) -> Self {
        Self {
            service,
            users_table: users_table.to_string(),
            exercises_table: exercises_table.to_string(),
        }
    }

    pub fn exercises_table(&self) -> &str {
        &self.exercises_table
    }

    /// Users decoded with every column optional
    pub fn list_user_variants(&self) -> Vec<UserVariant> {
        let result = self
            .service
            .select(&self.users_table, None)
            .and_then(|rows| decode_rows::<UserVariant>(&self.users_table, rows));
        match result {
            Ok(users) => {
                for user in &users {
                    tracing::debug!(
                        id = ?user.id,
                        email = ?user.email,
                        username = ?user.username,
                        name = ?user.name,
                        credential_column = ?user.credential_column(),
                        "user row"
                    );
                }
                users
            }
            Err(e) => {
                tracing::error!(error = %e, "listing user variants failed");
                Vec::new()
            }
        }
    }

    /// Column name to raw value for the first row of `table`
    pub fn inspect_schema(&self, table: &str) -> Map<String, Value> {
        match self.service.select(table, None) {
            Ok(rows) => {
                tracing::debug!(table, columns = ?column_names(&rows), "schema probe");
                match rows.into_iter().next() {
                    Some(Value::Object(obj)) => obj,
                    _ => Map::new(),
                }
            }
            Err(e) => {
                tracing::error!(table, error = %e, "schema probe failed");
                Map::new()
            }
        }
    }

    /// Check that the exercises table carries the owner column
    pub fn check_exercise_table(&self) -> SchemaCheck {
        let rows = match self.service.select(&self.exercises_table, None) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(table = %self.exercises_table, error = %e, "cannot read exercises table");
                return SchemaCheck::Unreachable(e.to_string());
            }
        };
        if rows.is_empty() {
            return SchemaCheck::Empty;
        }
        if column_names(&rows).iter().any(|c| c == OWNER_COLUMN) {
            SchemaCheck::Ready
        } else {
            tracing::warn!(table = %self.exercises_table, column = OWNER_COLUMN, "owner column missing");
            SchemaCheck::MissingColumn(OWNER_COLUMN.to_string())
        }
    }

    /// True when the users table answers a select
    pub fn test_connection(&self) -> bool {
        match self.service.select(&self.users_table, None) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "connection test failed");
                false
            }
        }
    }
}
