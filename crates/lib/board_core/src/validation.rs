//! Field validation driven by rule tables.
//!
//! Each input type describes its constraints as a static `&[FieldRules]`
//! table and exposes its values through [`Fields`]. [`validate`] walks the
//! table in order and reports the first violation, so validation never needs
//! a database and can be tested on its own.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static IPV4_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("valid regex"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("valid regex")
});

/// A single field constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The field must be present.
    Required,
    /// Text length in characters, inclusive on both ends.
    Length { min: usize, max: usize },
    /// Dotted-quad IPv4 shape.
    Ipv4,
    /// Email address shape.
    Email,
    /// Integer range, inclusive on both ends.
    Range { min: i64, max: i64 },
}

/// Constraints for one named field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

/// A borrowed field value handed to the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Text(&'a str),
    Int(i64),
    Bool(bool),
}

/// Types whose fields can be checked against a rule table.
pub trait Fields {
    /// Returns the value of `field`, or `None` when it is absent.
    fn field(&self, field: &str) -> Option<Value<'_>>;
}

/// A field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate `item` against `table`, returning the first violation.
///
/// Rules other than [`Rule::Required`] only apply to present values.
pub fn validate<T: Fields>(item: &T, table: &[FieldRules]) -> Result<(), ValidationError> {
    for entry in table {
        let value = item.field(entry.field);
        for rule in entry.rules {
            check(entry.field, value, *rule)?;
        }
    }
    Ok(())
}

fn check(field: &'static str, value: Option<Value<'_>>, rule: Rule) -> Result<(), ValidationError> {
    let Some(value) = value else {
        return match rule {
            Rule::Required => Err(ValidationError::new(
                field,
                "Missing data for required field.",
            )),
            _ => Ok(()),
        };
    };

    match (rule, value) {
        (Rule::Required, _) => Ok(()),
        (Rule::Length { min, max }, Value::Text(text)) => {
            let len = text.chars().count();
            if len < min || len > max {
                Err(ValidationError::new(
                    field,
                    format!("Length must be between {min} and {max}."),
                ))
            } else {
                Ok(())
            }
        }
        (Rule::Ipv4, Value::Text(text)) => {
            if IPV4_PATTERN.is_match(text) {
                Ok(())
            } else {
                Err(ValidationError::new(
                    field,
                    "String does not match expected pattern.",
                ))
            }
        }
        (Rule::Email, Value::Text(text)) => {
            if EMAIL_PATTERN.is_match(text) {
                Ok(())
            } else {
                Err(ValidationError::new(field, "Not a valid email address."))
            }
        }
        (Rule::Range { min, max }, Value::Int(n)) => {
            if n < min || n > max {
                Err(ValidationError::new(
                    field,
                    format!("Must be between {min} and {max}."),
                ))
            } else {
                Ok(())
            }
        }
        (_, Value::Int(_)) => Err(ValidationError::new(field, "Not a valid string.")),
        (_, Value::Text(_)) | (_, Value::Bool(_)) => {
            Err(ValidationError::new(field, "Not a valid integer."))
        }
    }
}

/// Whether `text` has the dotted-quad IPv4 shape.
pub fn looks_like_ipv4(text: &str) -> bool {
    IPV4_PATTERN.is_match(text)
}
