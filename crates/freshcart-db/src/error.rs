//! # Storage Error Types
//!
//! Error taxonomy for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  SQLite Error (sqlx::Error)                                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  StoreError (this module) ← classifies constraint/pool failures     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Calling business-logic layer decides user-facing behavior          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! - Absence is not an error: single-row fetches return `Ok(None)`.
//!   `NotFound` is reserved for targeted updates of rows that must exist.
//! - Decode failures (unknown enum tags) are surfaced, never defaulted.
//! - Constraint violations are hard failures; nothing here retries.
//! - `Unavailable` is fatal at store construction: abort startup rather
//!   than operate on a partial store.

use thiserror::Error;

use freshcart_core::{CoreError, DecodeError};

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A targeted update referenced a row that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A persisted value could not be parsed back into its domain type.
    ///
    /// ## When This Occurs
    /// - A status column holds a tag from a removed/renamed variant
    /// - Schema drift that a migration should have handled
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A business rule rejected the operation (transition guards,
    /// total-consistency checks, refund bounds).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Foreign key or unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a cart item referencing a nonexistent order
    /// - Duplicate primary key outside of upsert paths
    #[error("constraint violation: {message}")]
    ConstraintViolation { message: String },

    /// The underlying storage engine failed to open or migrate.
    /// Fatal at construction time.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Query execution failed for a reason outside the taxonomy above.
    #[error("query failed: {0}")]
    Query(String),

    /// All pooled connections are in use.
    #[error("connection pool exhausted")]
    PoolExhausted,
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database (FK/UNIQUE) → StoreError::ConstraintViolation
/// sqlx::Error::PoolTimedOut         → StoreError::PoolExhausted
/// sqlx::Error::PoolClosed           → StoreError::Unavailable
/// Other                             → StoreError::Query
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                // SQLite constraint messages:
                //   "UNIQUE constraint failed: <table>.<column>"
                //   "FOREIGN KEY constraint failed"
                if msg.contains("constraint failed") {
                    StoreError::ConstraintViolation { message: msg }
                } else {
                    StoreError::Query(msg)
                }
            }
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::Unavailable("pool is closed".to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unavailable(format!("migration failed: {err}"))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let err = StoreError::not_found("Order", "abc");
        assert_eq!(err.to_string(), "Order not found: abc");
    }

    #[test]
    fn decode_error_passes_through() {
        let err: StoreError = DecodeError::new("OrderStatus", "SHIPPED").into();
        assert_eq!(err.to_string(), "unrecognized OrderStatus tag: 'SHIPPED'");
    }
}
