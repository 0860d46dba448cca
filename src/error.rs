//! Error types shared by the repository, filters and HTTP layer.

use thiserror::Error;

use crate::filters::FilterError;

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

impl RegistryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("uniqueness violated: {}", db_err.message()));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Validation(ValidationError::new(
                    "relation",
                    "referenced record does not exist",
                ));
            }
        }
        Self::Database(err)
    }
}
