use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// One failed rule, reported against the request field it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation failures grouped by field name.
/// Messages for a field keep the order in which they were reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Group failures by field, merging duplicates in order
    pub fn from_failures(failures: impl IntoIterator<Item = FieldError>) -> Self {
        let mut errors = Self::new();
        for failure in failures {
            errors.push(failure.field, failure.message);
        }
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one message
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Startup errors raised while wiring the dispatcher
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A handler for '{request}' is already registered")]
    DuplicateHandler { request: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_grouped_by_field_in_order() {
        let errors = ValidationErrors::from_failures(vec![
            FieldError::new("Name", "must not be empty"),
            FieldError::new("Price", "must be greater than 0"),
            FieldError::new("Name", "is too long"),
        ]);

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("Name"),
            Some(&["must not be empty".to_string(), "is too long".to_string()][..])
        );
    }

    #[test]
    fn test_serializes_as_field_map() {
        let errors = ValidationErrors::single("Id", "must not be empty");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "Id": ["must not be empty"] })
        );
    }
}
