//! # Storage Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──► classify ──┐                                           │
//! │                             ├──► DbError ──► ApiError (server)          │
//! │  CoreError (rule failure) ──┘     Domain(..)                            │
//! │                                                                         │
//! │  UNIQUE constraint failed: customers.email  → UniqueViolation{email}    │
//! │  CHECK constraint failed: stock >= 0        → CheckViolation            │
//! │  database is locked                          → Busy          (retry)    │
//! │  pool timed out                              → PoolExhausted (retry)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rule failure raised inside a commit (`InsufficientStock`, `Conflict`,
//! `TotalMismatch`) travels as `Domain` so callers can still match on the
//! exact [`CoreError`] after the transaction has rolled back.

use tally_core::{CoreError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the write (customer email).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A CHECK constraint rejected the write (negative stock or price).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The write lock stayed taken past the busy timeout. Nothing was written.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Opening the file or pool failed (path, permissions, disk full, pool closed).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// BEGIN or COMMIT itself failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No pooled connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether resubmitting the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::Busy(_)
                | DbError::PoolExhausted
                | DbError::ConnectionFailed(_)
                | DbError::TransactionFailed(_)
        )
    }

    /// Maps a SQLite error message onto a variant.
    fn from_sqlite_message(msg: &str) -> Self {
        if let Some(target) = msg.strip_prefix("UNIQUE constraint failed: ") {
            // "customers.email" → "email"
            let column = target.rsplit('.').next().unwrap_or(target);
            DbError::duplicate(column, "unknown")
        } else if msg.starts_with("CHECK constraint failed") {
            DbError::CheckViolation {
                message: msg.to_string(),
            }
        } else if msg.starts_with("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation {
                message: msg.to_string(),
            }
        } else if msg.contains("is locked") || msg.contains("database is busy") {
            DbError::Busy(msg.to_string())
        } else {
            DbError::QueryFailed(msg.to_string())
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
