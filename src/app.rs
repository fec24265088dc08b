//! Front-end flow shared by subcommands and the REPL: login gate, session
//! handling and the exercise form.

use crate::config::Config;
use crate::diagnostics::{Diagnostics, SchemaCheck};
use crate::exercises::ExerciseRepository;
use crate::models::{Exercise, User};
use crate::rest::DataService;
use crate::session::SessionStore;
use crate::users::UserRepository;
use anyhow::{anyhow, bail, Result};

/// Which seed account to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SeedKind {
    #[default]
    Test,
    Plain,
}

/// The logged-in user as read from the session
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

/// Raw exercise form input. Numbers stay text until saved.
#[derive(Debug, Clone, Default)]
pub struct ExerciseForm {
    /// Set when editing an existing exercise
    pub editing_id: Option<i64>,
    pub name: String,
    pub repetitions: String,
    pub sets: String,
}

fn parse_count(input: &str) -> i32 {
    input.trim().parse().unwrap_or(0)
}

pub struct App<'a> {
    users: UserRepository<'a>,
    exercises: ExerciseRepository<'a>,
    session: SessionStore,
    diagnostics: Diagnostics<'a>,
    debug: bool,
}

impl<'a> App<'a> {
    pub fn new(
        service: &'a dyn DataService,
        config: &Config,
        session: SessionStore,
        debug: bool,
    ) -> Self {
        Self {
            users: UserRepository::new(service, config.users_table(), config.password_check()),
            exercises: ExerciseRepository::new(
                service,
                config.exercises_table(),
                config.owner_filter(),
            )
            .with_column_probe(debug),
            session,
            diagnostics: Diagnostics::new(
                service,
                config.users_table(),
                config.exercises_table(),
            ),
            debug,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Authenticate and open a session
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            bail!("Fill in all fields");
        }
        tracing::info!(email, "login attempt");
        let user = self
            .users
            .authenticate(email, password)
            .ok_or_else(|| anyhow!("Invalid credentials"))?;
        self.session
            .create_session(user.id.as_deref().unwrap_or(""), &user.email)?;
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.session.logout()
    }

    /// The session user, or an error when no one is logged in
    pub fn current_user(&self) -> Result<CurrentUser> {
        if !self.session.is_logged_in() {
            bail!("Not logged in. Use `login <email> <password>`.");
        }
        let id = self
            .session
            .user_id()
            .ok_or_else(|| anyhow!("User id not found in session"))?;
        Ok(CurrentUser {
            id,
            email: self.session.user_email().unwrap_or_default(),
        })
    }

    pub fn list(&self) -> Result<Vec<Exercise>> {
        let user = self.current_user()?;
        Ok(self.exercises.list_exercises(&user.id))
    }

    /// Add a new exercise, or update the one being edited
    pub fn save_exercise(&self, form: &ExerciseForm) -> Result<Exercise> {
        let user = self.current_user()?;
        let name = form.name.trim();
        if name.is_empty() {
            bail!("Exercise name is required");
        }
        let mut exercise = Exercise::new(
            name,
            parse_count(&form.repetitions),
            parse_count(&form.sets),
            Some(&user.id),
        );
        exercise.id = form.editing_id;
        match exercise.id {
            None => self.exercises.add_exercise(&exercise)?,
            Some(_) => self.exercises.update_exercise(&exercise)?,
        }
        Ok(exercise)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.current_user()?;
        self.exercises.delete_exercise(id)
    }

    /// Create a seed account; returns its email and whether it now exists
    pub fn seed(&self, kind: SeedKind) -> (&'static str, bool) {
        match kind {
            SeedKind::Test => (crate::users::TEST_USER_EMAIL, self.users.insert_test_user()),
            SeedKind::Plain => (
                crate::users::PLAIN_USER_EMAIL,
                self.users.insert_plain_user(),
            ),
        }
    }

    pub fn users(&self) -> &UserRepository<'a> {
        &self.users
    }

    /// Owner-column check run when the exercise list is opened
    pub fn check_schema(&self) -> SchemaCheck {
        self.diagnostics.check_exercise_table()
    }

    /// Raw listings and probes, only in debug mode
    pub fn diagnostics(&self) -> Option<&Diagnostics<'a>> {
        self.debug.then_some(&self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordCheck;
    use crate::rest::memory::MemoryService;
    use serde_json::json;
    use tempfile::TempDir;

    fn service() -> MemoryService {
        MemoryService::new()
            .uuid_keyed("usuarios")
            .with_row("usuarios", json!({ "id": "alice", "email": "alice@x.com", "senha": "pw" }))
    }

    fn app<'a>(svc: &'a MemoryService, dir: &TempDir, config: &Config) -> App<'a> {
        App::new(svc, config, SessionStore::open(dir.path()), false)
    }

    fn form(id: Option<i64>, name: &str, reps: &str, sets: &str) -> ExerciseForm {
        ExerciseForm {
            editing_id: id,
            name: name.to_string(),
            repetitions: reps.to_string(),
            sets: sets.to_string(),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        let err = app.login("alice@x.com", "").unwrap_err();
        assert_eq!(err.to_string(), "Fill in all fields");
        assert!(svc.calls().is_empty());
    }

    #[test]
    fn test_login_opens_session() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        app.login("alice@x.com", "pw").unwrap();
        let user = app.current_user().unwrap();
        assert_eq!(user.id, "alice");
        assert_eq!(user.email, "alice@x.com");
    }

    #[test]
    fn test_login_unknown_user() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        let err = app.login("nobody@x.com", "pw").unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(!app.session().is_logged_in());
    }

    #[test]
    fn test_strict_login_rejects_wrong_password() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.auth.password_check = Some(PasswordCheck::Strict);
        let app = app(&svc, &dir, &config);
        assert!(app.login("alice@x.com", "wrong").is_err());
        assert!(!app.session().is_logged_in());
    }

    #[test]
    fn test_gate_blocks_without_session() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        assert!(app.list().unwrap_err().to_string().contains("Not logged in"));
        assert!(app.save_exercise(&form(None, "Supino", "10", "3")).is_err());
        assert!(app.delete(1).is_err());
        assert!(svc.calls().is_empty());
    }

    #[test]
    fn test_save_add_then_edit() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        app.login("alice@x.com", "pw").unwrap();

        app.save_exercise(&form(None, "  Supino ", "10", "3")).unwrap();
        let list = app.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Supino");
        assert_eq!(list[0].owner_user_id.as_deref(), Some("alice"));

        let id = list[0].id;
        app.save_exercise(&form(id, "Supino reto", "12", "4")).unwrap();
        let list = app.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!((list[0].repetitions, list[0].sets), (12, 4));
    }

    #[test]
    fn test_save_bad_numbers_become_zero() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        app.login("alice@x.com", "pw").unwrap();
        let saved = app.save_exercise(&form(None, "Prancha", "abc", "")).unwrap();
        assert_eq!((saved.repetitions, saved.sets), (0, 0));
    }

    #[test]
    fn test_save_requires_name() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        app.login("alice@x.com", "pw").unwrap();
        let err = app.save_exercise(&form(None, "   ", "1", "1")).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_delete_and_logout() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        app.login("alice@x.com", "pw").unwrap();
        app.save_exercise(&form(None, "Remada", "10", "3")).unwrap();
        let id = app.list().unwrap()[0].id.unwrap();
        app.delete(id).unwrap();
        assert!(app.list().unwrap().is_empty());

        app.logout().unwrap();
        assert!(app.current_user().is_err());
    }

    #[test]
    fn test_seed_then_login_with_wrong_password() {
        let svc = MemoryService::new().uuid_keyed("usuarios");
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        assert_eq!(app.seed(SeedKind::Test), ("teste@exemplo.com", true));
        let user = app.login("teste@exemplo.com", "wrong").unwrap();
        assert_eq!(user.email, "teste@exemplo.com");
    }

    #[test]
    fn test_diagnostics_only_in_debug() {
        let svc = service();
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        assert!(app(&svc, &dir, &config).diagnostics().is_none());
        let debug = App::new(&svc, &config, SessionStore::open(dir.path()), true);
        assert!(debug.diagnostics().is_some());
    }

    #[test]
    fn test_schema_check_without_debug() {
        let svc = service().with_row(
            "exercicios",
            json!({ "id": 1, "nome": "Supino", "repeticoes": 10, "series": 3 }),
        );
        let dir = TempDir::new().unwrap();
        let app = app(&svc, &dir, &Config::default());
        assert!(app.diagnostics().is_none());
        assert_eq!(
            app.check_schema(),
            SchemaCheck::MissingColumn("usuario_id".to_string())
        );
    }
}
