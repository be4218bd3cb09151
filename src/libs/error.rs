//! Domain error kinds for the persistence layer.
//!
//! Callers match on these variants to render a precise message; none of them
//! require inspecting raw SQLite error text.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Username '{0}' already exists")]
    UsernameTaken(String),

    #[error("The last administrator cannot be removed or demoted")]
    LastAdmin,

    #[error("Invalid username or password")]
    AuthFailure,

    #[error("Migration v{version} failed: {message}")]
    Migration { version: u32, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// True when the error wraps a SQLite UNIQUE/constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Storage(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_field() {
        let err = StoreError::validation("value", "must be greater than zero");
        assert_eq!(err.to_string(), "value: must be greater than zero");
    }

    #[test]
    fn not_found_is_not_a_constraint_violation() {
        assert!(!StoreError::not_found("Empenho", 7).is_constraint_violation());
    }
}
