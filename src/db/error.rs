//! Store error types.

use thiserror::Error;

/// Failures reported by a [`RaceStore`](super::RaceStore) or one of its units of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached (pool exhausted, connection lost).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write violated a table constraint.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// Any other statement failure.
    #[error("query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StoreError::Constraint(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
