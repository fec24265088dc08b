use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USERS_TABLE: &str = "usuarios";
pub const DEFAULT_EXERCISES_TABLE: &str = "exercicios";
pub const DEFAULT_API_KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// How a password mismatch on login is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordCheck {
    /// Mismatch is logged, login still succeeds (existing deployment behavior)
    #[default]
    Advisory,
    /// Mismatch rejects the login
    Strict,
}

impl PasswordCheck {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "advisory" => Some(Self::Advisory),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advisory => "advisory",
            Self::Strict => "strict",
        }
    }
}

/// Where exercise rows are narrowed down to the current owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerFilter {
    /// Fetch the whole table, filter locally
    #[default]
    Client,
    /// Push an equality filter on the owner column to the backend
    Server,
}

impl OwnerFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

/// Connection settings for the data API
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl BackendConfig {
    /// Resolve the API key from config or environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }

        let env_var = self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        std::env::var(env_var).map_err(|_| {
            anyhow!(
                "No API key configured. Set {} or backend.api_key in the config file.",
                env_var
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or_else(default_timeout_ms))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TablesConfig {
    #[serde(default)]
    pub users: Option<String>,
    #[serde(default)]
    pub exercises: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub password_check: Option<PasswordCheck>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExercisesConfig {
    #[serde(default)]
    pub owner_filter: Option<OwnerFilter>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SessionConfig {
    /// Directory holding the session file
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub exercises: ExercisesConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.reps/config.local.toml) > project (.reps/config.toml) > user (~/.reps/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".reps").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".reps").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored: usually carries the API key
        let local_config = Path::new(".reps").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority for every field it sets)
    pub fn merge(&mut self, other: Config) {
        fn take<T>(slot: &mut Option<T>, other: Option<T>) {
            if other.is_some() {
                *slot = other;
            }
        }

        take(&mut self.backend.url, other.backend.url);
        take(&mut self.backend.api_key, other.backend.api_key);
        take(&mut self.backend.api_key_env, other.backend.api_key_env);
        take(&mut self.backend.timeout_ms, other.backend.timeout_ms);
        take(&mut self.tables.users, other.tables.users);
        take(&mut self.tables.exercises, other.tables.exercises);
        take(&mut self.auth.password_check, other.auth.password_check);
        take(&mut self.exercises.owner_filter, other.exercises.owner_filter);
        take(&mut self.session.dir, other.session.dir);
    }

    pub fn users_table(&self) -> &str {
        self.tables.users.as_deref().unwrap_or(DEFAULT_USERS_TABLE)
    }

    pub fn exercises_table(&self) -> &str {
        self.tables
            .exercises
            .as_deref()
            .unwrap_or(DEFAULT_EXERCISES_TABLE)
    }

    pub fn password_check(&self) -> PasswordCheck {
        self.auth.password_check.unwrap_or_default()
    }

    pub fn owner_filter(&self) -> OwnerFilter {
        self.exercises.owner_filter.unwrap_or_default()
    }

    /// Directory for local state; `~/.reps` unless overridden
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.session.dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".reps"))
            .ok_or_else(|| anyhow!("Cannot determine home directory; set session.dir"))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match self.backend.url.as_deref() {
            None | Some("") => errors.push(ValidationError {
                field: "backend.url".to_string(),
                message: "Backend URL is required (set SUPABASE_URL or backend.url)".to_string(),
            }),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                errors.push(ValidationError {
                    field: "backend.url".to_string(),
                    message: format!("Invalid URL '{}', expected http:// or https://", url),
                })
            }
            Some(_) => {}
        }

        if self.backend.timeout_ms == Some(0) {
            errors.push(ValidationError {
                field: "backend.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        for (field, name) in [
            ("tables.users", self.users_table()),
            ("tables.exercises", self.exercises_table()),
        ] {
            if name.trim().is_empty() {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "Table name must not be empty".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
