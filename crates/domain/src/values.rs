//! JSON helpers for persisted access documents.

use rdm_access_core::{AppError, AppResult, NonEmptyString};
use serde_json::{Map, Value};

/// Returns the value as an object or fails with a message naming `what`.
pub(crate) fn as_object<'a>(value: &'a Value, what: &str) -> AppResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| AppError::Validation(format!("{what} must be an object")))
}

/// Reads an identifier stored either as a string or as an integer.
pub(crate) fn as_id(value: &Value, what: &str) -> AppResult<NonEmptyString> {
    match value {
        Value::String(id) => NonEmptyString::new(id.as_str())
            .map_err(|_| AppError::Validation(format!("{what} must not be empty"))),
        Value::Number(id) if id.is_u64() || id.is_i64() => NonEmptyString::new(id.to_string()),
        _ => Err(AppError::Validation(format!(
            "{what} must be a string or an integer"
        ))),
    }
}
