//! Error types for the PostgreSQL patient directory.

use pdqm_search::BackendError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL error code for undefined column (42703).
pub const PG_UNDEFINED_COLUMN: &str = "42703";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Errors specific to the PostgreSQL patient directory.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// A returned row did not have the expected shape.
    #[error("Row decode error: {message}")]
    Decode { message: String },

    /// Pool error.
    #[error("Pool error: {message}")]
    Pool { message: String },
}

impl PostgresError {
    /// Creates a new decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a new pool error.
    #[must_use]
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for BackendError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => match e {
                SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                    BackendError::connection(e.to_string())
                }
                ref db if has_pg_error_code(db, PG_UNDEFINED_TABLE)
                    || has_pg_error_code(db, PG_UNDEFINED_COLUMN) =>
                {
                    BackendError::query(format!("patient view is missing or incomplete: {e}"))
                }
                other => BackendError::query(other.to_string()),
            },
            PostgresError::Decode { message } => {
                BackendError::query(format!("Row decode error: {message}"))
            }
            PostgresError::Pool { message } => {
                BackendError::connection(format!("Pool error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
