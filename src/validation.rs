//! Payload validation for memo writes
//!
//! Mirrors the field-error contract the web client already understands:
//! a map from field name to a list of human-readable messages.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key used for errors that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation errors, serialized as `{"field": ["message", ...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages recorded for a field, if any
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// Errors consisting of one message on one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Cleaned memo payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoInput {
    pub content: String,
}

/// Validate a raw memo payload.
///
/// `None` means the request carried no usable JSON body.
pub fn validate_memo(
    payload: Option<&Value>,
    max_content_length: usize,
) -> std::result::Result<MemoInput, ValidationErrors> {
    let Some(Value::Object(fields)) = payload else {
        return Err(ValidationErrors::single(
            NON_FIELD_ERRORS,
            "Invalid JSON payload.",
        ));
    };

    let content = match fields.get("content") {
        None | Some(Value::Null) => {
            return Err(ValidationErrors::single(
                "content",
                "This field is required.",
            ))
        }
        Some(Value::String(s)) => s.trim(),
        Some(_) => {
            return Err(ValidationErrors::single("content", "Not a valid string."));
        }
    };

    if content.is_empty() {
        return Err(ValidationErrors::single(
            "content",
            "This field may not be blank.",
        ));
    }

    if content.chars().count() > max_content_length {
        return Err(ValidationErrors::single(
            "content",
            format!(
                "Ensure this field has no more than {} characters.",
                max_content_length
            ),
        ));
    }

    Ok(MemoInput {
        content: content.to_string(),
    })
}
