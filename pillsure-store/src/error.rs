use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A uniqueness constraint rejected the write (duplicate email,
    /// double-booked slot, second review for the same doctor).
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Convert an insert error into `Conflict` when SQLite reports a
/// constraint violation, passing other errors through unchanged.
pub(crate) fn map_constraint(e: rusqlite::Error, message: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e
        && err.code == rusqlite::ErrorCode::ConstraintViolation
    {
        return StoreError::Conflict(message.to_string());
    }
    e.into()
}

pub type Result<T> = std::result::Result<T, StoreError>;
