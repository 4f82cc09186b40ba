use thiserror::Error;

/// Closed error kind for every fallible operation the core exposes.
///
/// Maps 1:1 onto the five error kinds the CLI translates into exit codes:
/// `NotFound`/`InvalidInput` -> 1, everything else surfaces as 3 unless the
/// caller recognizes it earlier.
#[derive(Debug, Error)]
pub enum FoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, FoError>;
