//! User lookup and authentication against the users table.
//!
//! Every operation here is fail-soft: backend errors are logged and turned
//! into `None`, `false` or an empty list so callers never see them.

use crate::config::PasswordCheck;
use crate::models::User;
use crate::rest::{decode_rows, BackendError, DataService, Filter};

pub const TEST_USER_EMAIL: &str = "teste@exemplo.com";
pub const PLAIN_USER_EMAIL: &str = "plain@exemplo.com";
pub const SEED_PASSWORD: &str = "senha123";

pub struct UserRepository<'a> {
    service: &'a dyn DataService,
    table: String,
    password_check: PasswordCheck,
}

impl<'a> UserRepository<'a> {
    pub fn new(service: &'a dyn DataService, table: &str, password_check: PasswordCheck) -> Self {
        Self {
            service,
            table: table.to_string(),
            password_check,
        }
    }

    fn find_by_email(&self, email: &str) -> Result<Vec<User>, BackendError> {
        let rows = self
            .service
            .select(&self.table, Some(&Filter::eq("email", email)))?;
        decode_rows(&self.table, rows)
    }

    /// Look up `email` and compare the stored password.
    ///
    /// The first matching row wins. With [`PasswordCheck::Advisory`] a
    /// mismatch is only logged and the user is still returned.
    pub fn authenticate(&self, email: &str, password: &str) -> Option<User> {
        let users = match self.find_by_email(email) {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(email, error = %e, "user lookup failed");
                return None;
            }
        };
        tracing::debug!(email, matches = users.len(), "user lookup");

        let user = users.into_iter().next()?;
        if user.password == password {
            return Some(user);
        }

        match self.password_check {
            PasswordCheck::Advisory => {
                tracing::warn!(
                    email,
                    "password mismatch ignored (auth.password_check = \"advisory\")"
                );
                Some(user)
            }
            PasswordCheck::Strict => {
                tracing::debug!(email, "password mismatch");
                None
            }
        }
    }

    pub fn user_exists(&self, email: &str) -> bool {
        match self.find_by_email(email) {
            Ok(users) => !users.is_empty(),
            Err(e) => {
                tracing::error!(email, error = %e, "existence check failed");
                false
            }
        }
    }

    /// Insert `email` unless it already exists; true if the user exists afterwards
    pub fn insert_seed_user(&self, email: &str, password: &str) -> bool {
        if self.user_exists(email) {
            tracing::debug!(email, "seed user already present");
            return true;
        }
        if let Err(e) = self.insert(email, password) {
            tracing::error!(email, error = %e, "seed insert failed");
            return false;
        }
        let inserted = self.user_exists(email);
        tracing::debug!(email, inserted, "seed user verified");
        inserted
    }

    pub fn insert_test_user(&self) -> bool {
        self.insert_seed_user(TEST_USER_EMAIL, SEED_PASSWORD)
    }

    /// Like [`Self::insert_test_user`] for the plain-text account, but trusts
    /// the insert without reading it back
    pub fn insert_plain_user(&self) -> bool {
        if self.user_exists(PLAIN_USER_EMAIL) {
            return true;
        }
        match self.insert(PLAIN_USER_EMAIL, SEED_PASSWORD) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(email = PLAIN_USER_EMAIL, error = %e, "seed insert failed");
                false
            }
        }
    }

    fn insert(&self, email: &str, password: &str) -> Result<(), BackendError> {
        let row = serde_json::to_value(User::new(email, password)).map_err(|source| {
            BackendError::Decode {
                table: self.table.clone(),
                source,
            }
        })?;
        self.service.insert(&self.table, &row)?;
        Ok(())
    }

    pub fn list_all_users(&self) -> Vec<User> {
        let result = self
            .service
            .select(&self.table, None)
            .and_then(|rows| decode_rows::<User>(&self.table, rows));
        match result {
            Ok(users) => {
                tracing::debug!(count = users.len(), "listed users");
                users
            }
            Err(e) => {
                tracing::error!(error = %e, "listing users failed");
                Vec::new()
            }
        }
    }
}
