//! MySQL backend for sqlkit, on top of `mysql_async`

mod pool;
mod row;
mod transaction;
mod types;

pub use pool::{MySqlBackend, MySqlDriver};
pub use transaction::MySqlTransaction;

/// Registry scheme for this backend.
pub const SCHEME: &str = "mysql";
