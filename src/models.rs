//! Row shapes for the `usuarios` and `exercicios` tables.
//!
//! Field names are English; the serde renames carry the column names the
//! deployed schema uses.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A row of the users table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default,
        deserialize_with = "id_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub email: String,
    #[serde(rename = "senha")]
    pub password: String,
}

impl User {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            id: None,
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// Users table decoded with every column optional, tolerating alternate
/// credential column names
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserVariant {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub senha: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserVariant {
    /// Name of the column holding the credential, if any
    pub fn credential_column(&self) -> Option<&'static str> {
        if self.senha.is_some() {
            Some("senha")
        } else if self.password.is_some() {
            Some("password")
        } else {
            None
        }
    }
}

/// A row of the exercises table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "repeticoes")]
    pub repetitions: i32,
    #[serde(rename = "series")]
    pub sets: i32,
    #[serde(rename = "usuario_id", default, deserialize_with = "id_as_string")]
    pub owner_user_id: Option<String>,
}

impl Exercise {
    pub fn new(name: &str, repetitions: i32, sets: i32, owner: Option<&str>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            repetitions,
            sets,
            owner_user_id: owner.map(str::to_string),
        }
    }

    /// Same fields with the id cleared, for update payloads
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Exercise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}x{}", self.name, self.repetitions, self.sets)
    }
}

/// Accept ids stored as either UUID strings or integers
fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
