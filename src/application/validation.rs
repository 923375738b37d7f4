//! Field-level error collection for form-backed operations.

use crate::domain::error::DomainError;

/// Messages attached to form fields, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(&'static str, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    /// Records a domain validation failure under its field, or under
    /// `__all__` when it has none.
    pub fn add_domain(&mut self, error: DomainError) {
        let field = error.field().unwrap_or(NON_FIELD);
        let message = match error {
            DomainError::Validation { message, .. } => message,
            other => other.to_string(),
        };
        self.add(field, message);
    }

    /// Collects the error of `result`, returning the success value if any.
    pub fn check<T>(&mut self, result: Result<T, DomainError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.add_domain(err);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| *name == field)
    }

    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    /// Errors that do not belong to a single field.
    pub fn non_field(&self) -> Vec<&str> {
        self.for_field(NON_FIELD)
    }

    /// Turns the collection into a `Result`, failing when anything was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub const NON_FIELD: &str = "__all__";

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.entries {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_grouped_by_field() {
        let mut errors = FieldErrors::new();
        errors.add("text", "This field is required.");
        errors.add_domain(DomainError::validation("group", "Unknown group."));
        errors.add(NON_FIELD, "Something else.");

        assert_eq!(errors.for_field("text"), vec!["This field is required."]);
        assert_eq!(errors.for_field("group"), vec!["Unknown group."]);
        assert_eq!(errors.non_field(), vec!["Something else."]);
        assert!(errors.has("text"));
        assert!(!errors.has("image"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn empty_collection_is_ok() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.check(Ok::<_, DomainError>(5)), Some(5));
        assert!(errors.into_result().is_ok());
    }
}
