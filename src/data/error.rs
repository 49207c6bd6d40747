//! Error type definition.

use thiserror::Error;

/// Error type for data.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Postgres access error")]
    PostgresError(#[from] postgres::Error),
    #[error("could not open JSON file: {0}")]
    JsonOpen(String),
    #[error("could not parse JSON file: {0}")]
    JsonParse(String),
    #[error("invalid chunk size {1} for collection {0}")]
    InvalidChunkSize(String, i64),
    #[error("invalid interval size: {0}")]
    InvalidIntervalSize(i64),
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("storage returned {1} result lists for {0} queries")]
    ResultCountMismatch(usize, usize),
    #[error("connection lock poisoned")]
    LockPoisoned,
}
