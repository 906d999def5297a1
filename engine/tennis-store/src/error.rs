//! Error types for the store layer

use tennis_core::TennisError;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Resource not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Unique key already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Row could not be mapped back to a domain type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Injected by the in-memory store
    #[error("Simulated failure: {0}")]
    Simulated(String),
}

/// SQLSTATE of a unique-key violation
const UNIQUE_VIOLATION: &str = "23505";

impl StoreError {
    pub fn decode(message: impl ToString) -> Self {
        StoreError::Decode(message.to_string())
    }

    /// Map a failed insert; unique-key violations become [`StoreError::Conflict`]
    pub fn from_write(err: sqlx::Error) -> Self {
        let conflict = err
            .as_database_error()
            .filter(|db| db.code().as_deref() == Some(UNIQUE_VIOLATION))
            .map(|db| db.message().to_string());

        match conflict {
            Some(message) => StoreError::Conflict(message),
            None => StoreError::Database(err),
        }
    }
}

impl From<StoreError> for TennisError {
    fn from(err: StoreError) -> Self {
        TennisError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;

    #[derive(Debug)]
    struct PgFailure {
        code: &'static str,
    }

    impl std::fmt::Display for PgFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "statement failed with {}", self.code)
        }
    }

    impl StdError for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let err = sqlx::Error::Database(Box::new(PgFailure { code: "23505" }));
        assert!(matches!(StoreError::from_write(err), StoreError::Conflict(_)));

        let err = sqlx::Error::Database(Box::new(PgFailure { code: "23503" }));
        assert!(matches!(StoreError::from_write(err), StoreError::Database(_)));

        assert!(matches!(StoreError::from_write(sqlx::Error::RowNotFound), StoreError::Database(_)));
    }
}
