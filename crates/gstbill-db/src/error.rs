//! # Persistence Errors
//!
//! One error type for both store backends, so the service can decide
//! whether to retry a commit without knowing which backend it runs on.
//!
//! ```text
//!  sqlx::Error ──┐                      ┌── is_retryable() ──► retry commit
//!                ├──► DbError ──────────┤
//!  MemoryStore ──┘  (classified)        └── otherwise ──► ServiceError
//!                                                         ──► ApiError (HTTP)
//! ```

use thiserror::Error;

/// Persistence errors shared by every `BillingStore` backend.
#[derive(Debug, Error)]
pub enum DbError {
    /// A lookup, UPDATE or DELETE matched no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique column already holds the value:
    /// - product SKU
    /// - invoice number (two commits raced for a sequence)
    /// - allowlist email
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A requested next invoice number would reissue one already used.
    #[error("Invoice sequence {requested} is taken: {prefix} has reached {highest}")]
    SequenceTaken { prefix: String, requested: i64, highest: i64 },

    /// A row points at a missing parent, e.g. a payment for an unknown invoice.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQL the database rejected for any other reason.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Another writer holds the database lock (SQLITE_BUSY / SQLITE_LOCKED).
    #[error("Database is busy: {0}")]
    Busy(String),

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

    /// True when repeating the same commit may succeed.
    ///
    /// ```text
    /// UniqueViolation on invoice_number ──► another commit took the number
    /// Busy / PoolExhausted              ──► transient lock contention
    /// anything else                     ──► surface immediately
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => field.contains("invoice_number"),
            DbError::Busy(_) | DbError::PoolExhausted => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Classifies sqlx failures.
///
/// Constraint errors are recognised by SQLite's message text
/// (`UNIQUE constraint failed: invoices.invoice_number`); lock contention by
/// the primary result code.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();
                // extended codes keep the primary code in the low byte
                let primary = code
                    .as_deref()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| (c & 0xff).to_string());

                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if matches!(primary.as_deref(), Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
                    || msg.contains("database is locked")
                {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

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

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::duplicate("invoices.invoice_number", "INV-00001").is_retryable());
        assert!(!DbError::duplicate("products.sku", "RICE-5").is_retryable());
        assert!(DbError::Busy("database is locked".into()).is_retryable());
        assert!(!DbError::not_found("Invoice", "x").is_retryable());
        assert!(!DbError::QueryFailed("syntax".into()).is_retryable());
        let taken = DbError::SequenceTaken {
            prefix: "INV".into(),
            requested: 1,
            highest: 2,
        };
        assert!(!taken.is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }
}
