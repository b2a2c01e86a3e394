//! Error types for the PostgreSQL round store.

use pricefeed_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(PG_UNDEFINED_TABLE)
    } else {
        false
    }
}

/// Errors specific to the PostgreSQL round store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A stored row could not be turned back into a record.
    #[error("Corrupt row for round {round_id}: {message}")]
    CorruptRow { round_id: i64, message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new corrupt-row error.
    #[must_use]
    pub fn corrupt_row(round_id: i64, message: impl Into<String>) -> Self {
        Self::CorruptRow {
            round_id,
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) if is_undefined_table(&e) => StorageError::internal(
                format!("oracle_rounds table missing, were migrations run? {e}"),
            ),
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
            err @ PostgresError::CorruptRow { .. } => StorageError::serialization(err.to_string()),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
