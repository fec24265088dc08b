//! Local login session.
//!
//! A small JSON key-value file (`user_id`, `user_email`, `is_logged_in`)
//! in the state directory. Writes go through a temp file and a rename so a
//! reader never sees a half-written session. Last write wins.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

/// Persisted session fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_at: Option<DateTime<Utc>>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Session store rooted at `dir`; nothing is touched until the first write
    pub fn open(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Current session; missing or unreadable file means logged out
    pub fn load(&self) -> Session {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Session::default(),
        };
        match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                Session::default()
            }
        }
    }

    /// Store both fields and mark the session logged in, replacing any prior session
    pub fn create_session(&self, user_id: &str, email: &str) -> Result<()> {
        tracing::debug!(user_id, email, "creating session");
        let session = Session {
            user_id: Some(user_id.to_string()),
            user_email: Some(email.to_string()),
            is_logged_in: true,
            logged_in_at: Some(Utc::now()),
        };
        self.write(&session)
    }

    pub fn user_id(&self) -> Option<String> {
        self.load().user_id
    }

    pub fn user_email(&self) -> Option<String> {
        self.load().user_email
    }

    pub fn is_logged_in(&self) -> bool {
        self.load().is_logged_in
    }

    /// Clear all stored fields
    pub fn logout(&self) -> Result<()> {
        tracing::debug!("ending session");
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    fn write(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(session)?)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_store_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path());
        assert!(!store.is_logged_in());
        assert!(store.user_id().is_none());
        assert!(store.user_email().is_none());
    }

    #[test]
    fn test_create_session_persists() {
        let dir = TempDir::new().unwrap();
        SessionStore::open(dir.path())
            .create_session("u-1", "teste@exemplo.com")
            .unwrap();

        // A second handle sees the same state
        let store = SessionStore::open(dir.path());
        assert!(store.is_logged_in());
        assert_eq!(store.user_id().as_deref(), Some("u-1"));
        assert_eq!(store.user_email().as_deref(), Some("teste@exemplo.com"));
        assert!(store.load().logged_in_at.is_some());
        assert!(!dir.path().join("session.json.tmp").exists());
    }

    #[test]
    fn test_create_session_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path());
        store.create_session("u-1", "a@exemplo.com").unwrap();
        store.create_session("u-2", "b@exemplo.com").unwrap();
        assert_eq!(store.user_id().as_deref(), Some("u-2"));
        assert_eq!(store.user_email().as_deref(), Some("b@exemplo.com"));
    }

    #[test]
    fn test_logout_clears_everything() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path());
        store.create_session("u-1", "a@exemplo.com").unwrap();
        store.logout().unwrap();
        assert_eq!(store.load(), Session::default());

        // Logging out twice is fine
        store.logout().unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_as_logged_out() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("session.json"), "{not json").unwrap();
        let store = SessionStore::open(dir.path());
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_creates_missing_state_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("state").join("reps");
        let store = SessionStore::open(&nested);
        store.create_session("u-1", "a@exemplo.com").unwrap();
        assert!(nested.join("session.json").exists());
    }
}
