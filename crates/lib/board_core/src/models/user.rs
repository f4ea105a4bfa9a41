//! Board user accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{self, FieldRules, Fields, Rule, ValidationError, Value};

const NAME_RULES: FieldRules = FieldRules {
    field: "name",
    rules: &[Rule::Required, Rule::Length { min: 2, max: 64 }],
};

const EMAIL_RULES: FieldRules = FieldRules {
    field: "email",
    rules: &[Rule::Required, Rule::Email, Rule::Length { min: 2, max: 64 }],
};

/// Constraints for a brand-new account; a password is mandatory.
pub const USER_CREATE_RULES: &[FieldRules] = &[
    NAME_RULES,
    EMAIL_RULES,
    FieldRules {
        field: "password",
        rules: &[Rule::Required, Rule::Length { min: 2, max: 128 }],
    },
];

/// Constraints for a merged update; the password is only checked if given.
pub const USER_UPDATE_RULES: &[FieldRules] = &[
    NAME_RULES,
    EMAIL_RULES,
    FieldRules {
        field: "password",
        rules: &[Rule::Length { min: 2, max: 128 }],
    },
];

/// Database row for `users`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub wx_id: Option<String>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub login_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public representation of a user. The password hash is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub wx_id: Option<String>,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub login_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserRow> for UserView {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id,
            wx_id: row.wx_id.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            is_admin: row.is_admin,
            login_time: row.login_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// User fields as submitted by an administrator. `wx_id` is not accepted
/// here; it is only set by the bind flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

impl Fields for UserInput {
    fn field(&self, field: &str) -> Option<Value<'_>> {
        match field {
            "name" => self.name.as_deref().map(Value::Text),
            "email" => self.email.as_deref().map(Value::Text),
            "password" => self.password.as_deref().map(Value::Text),
            "is_admin" => self.is_admin.map(Value::Bool),
            _ => None,
        }
    }
}

impl UserInput {
    /// Fill absent fields from `current`. The password stays absent so the
    /// stored hash is only replaced when a new password is supplied.
    pub fn merge(self, current: &UserRow) -> Self {
        Self {
            name: self.name.or_else(|| Some(current.name.clone())),
            email: self.email.or_else(|| Some(current.email.clone())),
            password: self.password,
            is_admin: self.is_admin.or(Some(current.is_admin)),
        }
    }

    /// Validate against `rules` and apply defaults.
    pub fn into_new(self, rules: &[FieldRules]) -> Result<NewUser, ValidationError> {
        validation::validate(&self, rules)?;

        let Some(name) = self.name else {
            return Err(ValidationError::new("name", "Missing data for required field."));
        };
        let Some(email) = self.email else {
            return Err(ValidationError::new("email", "Missing data for required field."));
        };

        Ok(NewUser {
            name,
            email,
            password: self.password,
            is_admin: self.is_admin.unwrap_or(false),
        })
    }
}

/// A validated account ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Plaintext; hashed by the store.
    pub password: Option<String>,
    pub is_admin: bool,
}
