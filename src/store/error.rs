// src/store/error.rs
use thiserror::Error;

/// Failure reported by a reference store or project writer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<tokio_postgres::Error>),

    #[error("{0}")]
    Unavailable(String),
}
