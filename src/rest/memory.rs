//! In-memory [`DataService`] for tests.

use super::{BackendError, DataService, Filter};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
pub struct MemoryService {
    tables: RefCell<HashMap<String, Vec<Value>>>,
    uuid_tables: HashSet<String>,
    next_id: Cell<i64>,
    calls: RefCell<Vec<String>>,
    failing: Cell<bool>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            ..Self::default()
        }
    }

    /// Rows inserted into `table` get UUID string ids instead of integers
    pub fn uuid_keyed(mut self, table: &str) -> Self {
        self.uuid_tables.insert(table.to_string());
        self
    }

    /// Seed a row verbatim, bypassing id assignment
    pub fn with_row(self, table: &str, row: Value) -> Self {
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(row);
        self
    }

    /// Make every subsequent call fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Calls made so far, as `verb:table` (plus `?column` when filtered)
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    fn record(&self, verb: &str, table: &str, filter: Option<&Filter>) -> Result<(), BackendError> {
        let entry = match filter {
            Some(f) => format!("{}:{}?{}", verb, table, f.column),
            None => format!("{}:{}", verb, table),
        };
        self.calls.borrow_mut().push(entry);
        if self.failing.get() {
            return Err(BackendError::Transport {
                table: table.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn assign_id(&self, table: &str, obj: &mut Map<String, Value>) {
        if obj.get("id").is_some_and(|v| !v.is_null()) {
            return;
        }
        let id = if self.uuid_tables.contains(table) {
            Value::String(uuid::Uuid::new_v4().to_string())
        } else {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            Value::from(id)
        };
        obj.insert("id".to_string(), id);
    }
}

impl DataService for MemoryService {
    fn select(&self, table: &str, filter: Option<&Filter>) -> Result<Vec<Value>, BackendError> {
        self.record("select", table, filter)?;
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|row| filter.map_or(true, |f| f.matches(row)))
            .collect())
    }

    fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>, BackendError> {
        self.record("insert", table, None)?;
        let mut obj = row.as_object().cloned().unwrap_or_default();
        self.assign_id(table, &mut obj);
        let stored = Value::Object(obj);
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(vec![stored])
    }

    fn update(&self, table: &str, row: &Value, filter: &Filter) -> Result<(), BackendError> {
        self.record("update", table, Some(filter))?;
        let changes = row.as_object().cloned().unwrap_or_default();
        let mut tables = self.tables.borrow_mut();
        for existing in tables.entry(table.to_string()).or_default().iter_mut() {
            if !filter.matches(existing) {
                continue;
            }
            if let Some(obj) = existing.as_object_mut() {
                for (key, value) in &changes {
                    obj.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn delete(&self, table: &str, filter: &Filter) -> Result<(), BackendError> {
        self.record("delete", table, Some(filter))?;
        self.tables
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .retain(|row| !filter.matches(row));
        Ok(())
    }
}
