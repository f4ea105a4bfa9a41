//! Redis server records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::RedisTarget;
use crate::secrets::{self, SecretError};
use crate::validation::{self, FieldRules, Fields, Rule, ValidationError, Value};

/// Port used when a server is registered without one.
pub const DEFAULT_PORT: i64 = 6379;

/// Constraints applied to every create and (merged) update.
pub const SERVER_RULES: &[FieldRules] = &[
    FieldRules {
        field: "name",
        rules: &[Rule::Required, Rule::Length { min: 2, max: 64 }],
    },
    FieldRules {
        field: "description",
        rules: &[Rule::Length { min: 0, max: 512 }],
    },
    FieldRules {
        field: "host",
        rules: &[Rule::Required, Rule::Ipv4],
    },
    FieldRules {
        field: "port",
        rules: &[Rule::Range {
            min: 1024,
            max: 65535,
        }],
    },
];

/// Database row for `redis_server`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServerRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub host: String,
    pub port: i64,
    /// Sealed with [`secrets::seal`]; `None` when the server has no password.
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServerRow {
    /// Connection parameters with the password unsealed.
    pub fn target(&self, secret_key: &str) -> Result<RedisTarget, SecretError> {
        let password = self
            .password
            .as_deref()
            .map(|sealed| secrets::open(sealed, secret_key))
            .transpose()?;
        Ok(RedisTarget {
            host: self.host.clone(),
            port: u16::try_from(self.port).unwrap_or(DEFAULT_PORT as u16),
            password,
        })
    }
}

/// Public representation of a server. The password never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub host: String,
    pub port: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ServerRow> for ServerView {
    fn from(row: &ServerRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            host: row.host.clone(),
            port: row.port,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Server fields as submitted by a client. Every field is optional so the
/// same type serves creates and partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub password: Option<String>,
}

impl Fields for ServerInput {
    fn field(&self, field: &str) -> Option<Value<'_>> {
        match field {
            "name" => self.name.as_deref().map(Value::Text),
            "description" => self.description.as_deref().map(Value::Text),
            "host" => self.host.as_deref().map(Value::Text),
            "port" => self.port.map(Value::Int),
            "password" => self.password.as_deref().map(Value::Text),
            _ => None,
        }
    }
}

impl ServerInput {
    /// Fill absent fields from `current`. The password stays absent so an
    /// update without one keeps the stored secret.
    pub fn merge(self, current: &ServerRow) -> Self {
        Self {
            name: self.name.or_else(|| Some(current.name.clone())),
            description: self
                .description
                .or_else(|| Some(current.description.clone())),
            host: self.host.or_else(|| Some(current.host.clone())),
            port: self.port.or(Some(current.port)),
            password: self.password,
        }
    }

    /// Normalize, validate and apply defaults.
    pub fn into_new(mut self) -> Result<NewServer, ValidationError> {
        if self.host.as_deref() == Some("localhost") {
            self.host = Some("127.0.0.1".into());
        }
        validation::validate(&self, SERVER_RULES)?;

        let (Some(name), Some(host)) = (self.name, self.host) else {
            // Both are `Rule::Required` above.
            return Err(ValidationError::new("name", "Missing data for required field."));
        };
        let port = self.port.unwrap_or(DEFAULT_PORT);

        Ok(NewServer {
            name,
            description: self.description.unwrap_or_default(),
            host,
            port: u16::try_from(port).unwrap_or(DEFAULT_PORT as u16),
            password: self.password,
        })
    }
}

/// A validated server ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServer {
    pub name: String,
    pub description: String,
    pub host: String,
    pub port: u16,
    /// Plaintext. `Some("")` clears a stored password on update.
    pub password: Option<String>,
}

impl NewServer {
    /// Connection parameters for probing before the record exists.
    pub fn target(&self) -> RedisTarget {
        RedisTarget {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone().filter(|p| !p.is_empty()),
        }
    }
}
