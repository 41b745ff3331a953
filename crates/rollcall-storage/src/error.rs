use thiserror::Error;

/// Storage-specific error types for the attendance store.
///
/// Controllers never show these to members: every public kiosk operation
/// converts them into `rollcall_core::Error::StoreUnavailable` at its
/// boundary and logs the detail.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The embedded schema could not be applied.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data validation failed before reaching the database
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad database path or settings.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Whether the error is a UNIQUE constraint violation (e.g. a tag bound twice).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<StorageError> for rollcall_core::Error {
    fn from(err: StorageError) -> Self {
        rollcall_core::Error::store(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
