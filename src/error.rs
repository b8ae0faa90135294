use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LendingError>;

#[derive(Error, Diagnostic, Debug)]
pub enum LendingError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(lendbook::validation))]
    ValidationError(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(lendbook::not_found))]
    NotFound(String),

    #[error("Persistence error: {0}")]
    #[diagnostic(code(lendbook::persistence))]
    PersistenceError(Box<dyn std::error::Error + Send + Sync>),

    #[error("CSV error: {0}")]
    #[diagnostic(code(lendbook::csv))]
    CsvError(#[from] csv::Error),
}

impl LendingError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<std::io::Error> for LendingError {
    fn from(err: std::io::Error) -> Self {
        Self::PersistenceError(Box::new(err))
    }
}

impl From<serde_json::Error> for LendingError {
    fn from(err: serde_json::Error) -> Self {
        Self::PersistenceError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LendingError {
    fn from(err: rocksdb::Error) -> Self {
        Self::PersistenceError(Box::new(err))
    }
}
