//! Payload self-validation.
//!
//! Payload types opt in by implementing [`Validate`], by hand or with
//! `#[derive(Validate)]`. Insert and Set-family operations run the check
//! before any backend call.

use std::fmt;

use thiserror::Error;

/// Self-check a payload runs before it is persisted.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Raw JSON documents have no schema to check against.
impl Validate for serde_json::Value {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// What kind of rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingRequiredField,
    BadFieldValue,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::MissingRequiredField => f.write_str("missing required field"),
            ValidationErrorKind::BadFieldValue => f.write_str("bad field value"),
        }
    }
}

/// A payload rejected by its own [`Validate`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} {field}{}", reason_suffix(.reason))]
pub struct ValidationError {
    field: String,
    kind: ValidationErrorKind,
    reason: Option<String>,
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl ValidationError {
    pub fn missing_required_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ValidationErrorKind::MissingRequiredField,
            reason: None,
        }
    }

    pub fn bad_field_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ValidationErrorKind::BadFieldValue,
            reason: Some(reason.into()),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> ValidationErrorKind {
        self.kind
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Presence test used by `#[validate(required)]`.
///
/// Strings count as present when they hold a non-whitespace character.
pub trait Required {
    fn is_present(&self) -> bool;
}

impl Required for String {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Required for &str {
    fn is_present(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<T> Required for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl<T> Required for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}
