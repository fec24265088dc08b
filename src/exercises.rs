//! Exercise CRUD scoped to one owner.
//!
//! Listing is fail-soft; writes propagate errors so the caller can report
//! them.

use crate::config::OwnerFilter;
use crate::models::Exercise;
use crate::rest::{column_names, decode_rows, DataService, Filter};
use anyhow::{Context, Result};

pub const OWNER_COLUMN: &str = "usuario_id";

pub struct ExerciseRepository<'a> {
    service: &'a dyn DataService,
    table: String,
    owner_filter: OwnerFilter,
    probe_columns: bool,
}

impl<'a> ExerciseRepository<'a> {
    pub fn new(service: &'a dyn DataService, table: &str, owner_filter: OwnerFilter) -> Self {
        Self {
            service,
            table: table.to_string(),
            owner_filter,
            probe_columns: false,
        }
    }

    /// Fetch the table before each insert and log its columns
    pub fn with_column_probe(mut self, enabled: bool) -> Self {
        self.probe_columns = enabled;
        self
    }

    /// Exercises owned by `user_id`.
    ///
    /// In [`OwnerFilter::Client`] mode the whole table is fetched and
    /// narrowed here; in server mode the backend does it. The owner check
    /// below runs in both modes.
    pub fn list_exercises(&self, user_id: &str) -> Vec<Exercise> {
        let filter = match self.owner_filter {
            OwnerFilter::Client => None,
            OwnerFilter::Server => Some(Filter::eq(OWNER_COLUMN, user_id)),
        };
        let result = self
            .service
            .select(&self.table, filter.as_ref())
            .and_then(|rows| decode_rows::<Exercise>(&self.table, rows));

        match result {
            Ok(all) => {
                let total = all.len();
                let owned: Vec<Exercise> = all
                    .into_iter()
                    .filter(|ex| ex.owner_user_id.as_deref() == Some(user_id))
                    .collect();
                tracing::debug!(user_id, total, owned = owned.len(), "listed exercises");
                owned
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "listing exercises failed");
                self.log_columns();
                Vec::new()
            }
        }
    }

    /// Best-effort raw fetch so a schema mismatch shows up in the log
    fn log_columns(&self) {
        match self.service.select(&self.table, None) {
            Ok(rows) => {
                let columns = column_names(&rows);
                tracing::debug!(
                    table = %self.table,
                    rows = rows.len(),
                    columns = ?columns,
                    "raw exercise rows"
                );
                if !rows.is_empty() && !columns.iter().any(|c| c == OWNER_COLUMN) {
                    tracing::warn!(table = %self.table, column = OWNER_COLUMN, "owner column missing");
                }
            }
            Err(e) => tracing::error!(table = %self.table, error = %e, "raw fetch failed"),
        }
    }

    pub fn add_exercise(&self, exercise: &Exercise) -> Result<()> {
        tracing::debug!(
            name = %exercise.name,
            owner = ?exercise.owner_user_id,
            "inserting exercise"
        );
        if self.probe_columns {
            self.log_columns();
        }
        let row = serde_json::to_value(exercise.without_id())?;
        self.service
            .insert(&self.table, &row)
            .context("Failed to add exercise")?;
        Ok(())
    }

    /// Rewrite the row identified by `exercise.id`. Without an id nothing is sent.
    pub fn update_exercise(&self, exercise: &Exercise) -> Result<()> {
        let Some(id) = exercise.id else {
            tracing::debug!(name = %exercise.name, "update skipped: exercise has no id");
            return Ok(());
        };
        tracing::debug!(id, name = %exercise.name, "updating exercise");
        let row = serde_json::to_value(exercise.without_id())?;
        self.service
            .update(&self.table, &row, &Filter::eq("id", id))
            .with_context(|| format!("Failed to update exercise {}", id))?;
        Ok(())
    }

    pub fn delete_exercise(&self, id: i64) -> Result<()> {
        tracing::debug!(id, "deleting exercise");
        self.service
            .delete(&self.table, &Filter::eq("id", id))
            .with_context(|| format!("Failed to delete exercise {}", id))?;
        Ok(())
    }
}
