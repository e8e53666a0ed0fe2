//! Error types for the bookkeeping core

use thiserror::Error;

/// Result type for bookkeeping operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bookkeeping errors
///
/// Nothing here is fatal: every failure leaves the current snapshot as it was
/// and the user action can simply be retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing required field, empty item list, non-positive amount
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Party not found
    #[error("Party not found: {0}")]
    PartyNotFound(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Treasury entry not found
    #[error("Treasury entry not found: {0}")]
    TreasuryNotFound(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Record with the same key already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Credential check failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Durable storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Snapshot (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed or unreadable backup file
    #[error("Backup error: {0}")]
    Backup(String),

    /// Unreadable import file
    #[error("Import error: {0}")]
    Import(String),

    /// Operation deliberately not supported
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the error was raised before any mutation was attempted
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Import(err.to_string())
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<calamine::XlsxError> for Error {
    fn from(err: calamine::XlsxError) -> Self {
        Error::Import(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
