//! Error taxonomy for catalog operations.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::BookId;
use crate::store::StoreError;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Failure of a repository or library call. A failed call never leaves the
/// collection partially changed.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Malformed or missing input; the caller should re-prompt.
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<FieldError>),

    /// The referenced book does not exist (stale caller state).
    #[error("book '{id}' not found")]
    NotFound { id: BookId },

    /// The operation does not apply to the book's current state.
    #[error("book '{id}': {message}")]
    Conflict { id: BookId, message: String },

    /// The storage collaborator refused or failed the change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(id: &BookId) -> Self {
        Self::NotFound { id: id.clone() }
    }

    pub fn conflict(id: &BookId, message: impl Into<String>) -> Self {
        Self::Conflict {
            id: id.clone(),
            message: message.into(),
        }
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let error = CatalogError::Validation(vec![
            FieldError::new("title", "is required"),
            FieldError::new("genre", "is required"),
        ]);

        assert_eq!(
            error.to_string(),
            "validation failed: title: is required; genre: is required"
        );
    }

    #[test]
    fn conflict_names_the_book() {
        let error = CatalogError::conflict(&BookId::from("7"), "already borrowed");
        assert_eq!(error.to_string(), "book '7': already borrowed");
    }
}
