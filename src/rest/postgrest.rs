//! PostgREST client over HTTP.

use super::{BackendError, DataService, Filter};
use serde_json::Value;
use std::time::Duration;

pub struct PostgrestClient {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: &str, table: &str, filter: Option<&Filter>) -> ureq::Request {
        let mut req = self
            .agent
            .request(method, &self.endpoint(table))
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json");
        if let Some(filter) = filter {
            req = req.query(&filter.column, &filter.query_value());
        }
        req
    }

    fn rows(table: &str, resp: ureq::Response) -> Result<Vec<Value>, BackendError> {
        let body = resp
            .into_string()
            .map_err(|e| transport_error(table, e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|source| BackendError::Decode {
            table: table.to_string(),
            source,
        })
    }
}

fn transport_error(table: &str, message: String) -> BackendError {
    BackendError::Transport {
        table: table.to_string(),
        message,
    }
}

fn check(table: &str, result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, BackendError> {
    match result {
        Ok(r) => Ok(r),
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(BackendError::Status {
                table: table.to_string(),
                code,
                body,
            })
        }
        Err(e) => Err(transport_error(table, e.to_string())),
    }
}

impl DataService for PostgrestClient {
    fn select(&self, table: &str, filter: Option<&Filter>) -> Result<Vec<Value>, BackendError> {
        tracing::debug!(table, filter = ?filter.map(|f| &f.column), "select");
        let resp = check(
            table,
            self.request("GET", table, filter).query("select", "*").call(),
        )?;
        Self::rows(table, resp)
    }

    fn insert(&self, table: &str, row: &Value) -> Result<Vec<Value>, BackendError> {
        tracing::debug!(table, "insert");
        let resp = check(
            table,
            self.request("POST", table, None)
                .set("Prefer", "return=representation")
                .send_json(row),
        )?;
        Self::rows(table, resp)
    }

    fn update(&self, table: &str, row: &Value, filter: &Filter) -> Result<(), BackendError> {
        tracing::debug!(table, column = %filter.column, "update");
        check(table, self.request("PATCH", table, Some(filter)).send_json(row))?;
        Ok(())
    }

    fn delete(&self, table: &str, filter: &Filter) -> Result<(), BackendError> {
        tracing::debug!(table, column = %filter.column, "delete");
        check(table, self.request("DELETE", table, Some(filter)).call())?;
        Ok(())
    }
}
