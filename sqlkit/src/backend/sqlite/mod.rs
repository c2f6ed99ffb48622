//! SQLite backend for sqlkit, on top of `rusqlite`

mod connection;
mod transaction;
mod types;

pub use connection::{SqliteBackend, SqliteDriver};
pub use transaction::SqliteTransaction;

/// Registry scheme for this backend.
pub const SCHEME: &str = "sqlite";
