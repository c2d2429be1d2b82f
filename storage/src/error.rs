//! Storage-side error type.

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed persisted phase label: {0}")]
    Phase(#[from] fiona_markets::ParsePhaseError),
}
