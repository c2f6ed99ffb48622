//! Error types for sqlkit

use thiserror::Error;

/// Result type alias for sqlkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening handles, rewriting SQL or running queries
#[derive(Error, Debug)]
pub enum Error {
    /// The handle has no live backend (never opened, or already closed)
    #[error("Database not open, open a handle before using it")]
    NotOpen,

    /// The liveness check against the backend failed
    #[error("Connectivity error: {0}")]
    Connectivity(#[source] Box<Error>),

    /// Connection string has no `scheme://` separator
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// No driver is registered under the scheme
    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    /// A driver is already registered under the scheme
    #[error("Driver already registered: {0}")]
    DuplicateDriver(String),

    /// A named placeholder has no value in the argument mapping
    #[error("Missing value for parameter [{0}]")]
    MissingParameter(String),

    /// MySQL driver error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// SQLite driver error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Type conversion error
    #[error("Type conversion error: expected {expected}, got {actual}")]
    TypeConversion {
        expected: &'static str,
        actual: String,
    },

    /// Column not found in row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
