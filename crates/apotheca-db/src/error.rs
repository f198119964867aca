//! # Database Error Types
//!
//! Error types for ledger store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← storage failures, categorized                  │
//! │       │        ▲                                                        │
//! │       │        └── DbError::Domain wraps CoreError (business rules)     │
//! │       ▼                                                                 │
//! │  Caller matches: domain errors are actionable, storage errors are       │
//! │  retryable as a whole (every operation is atomic)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use apotheca_core::CoreError;

/// Ledger store errors.
///
/// Storage variants wrap sqlx failures; `Domain` carries business-rule
/// violations through unchanged so callers can match on them.
#[derive(Debug, Error)]
pub enum DbError {
    /// Business-rule violation from the core (insufficient stock, deletion
    /// guard, validation, ...). Transparent so messages read as the domain
    /// error itself.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found where one row was required.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Database connection failed (file missing/unwritable, disk full).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Borrows the wrapped domain error, if this is one.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound  → DbError::NotFound
/// sqlx::Error::Database     → DbError::QueryFailed (constraint text kept)
/// sqlx::Error::PoolTimedOut → DbError::PoolExhausted
/// Other                     → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for ledger store operations.
pub type DbResult<T> = Result<T, DbError>;
