use super::domain::UnknownVariant;
use super::identity::SessionError;
use super::storage::StorageError;

/// Failure taxonomy shared by every marketplace operation.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    /// Malformed or missing input; the caller can correct it.
    #[error("{0}")]
    Validation(String),
    /// A uniqueness rule was violated.
    #[error("{0}")]
    Conflict(String),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    /// Bad credentials, without saying which part was wrong.
    #[error("invalid email or password")]
    AuthFailure,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("not permitted to {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MarketplaceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<UnknownVariant> for MarketplaceError {
    fn from(value: UnknownVariant) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<rusqlite::Error> for MarketplaceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Sqlite(value))
    }
}
