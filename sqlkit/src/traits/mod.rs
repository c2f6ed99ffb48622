//! Core traits for sqlkit

mod connection;
mod executor;
mod from_value;
mod transaction;

pub use connection::{Backend, BackendTransaction, Connection, ExecuteResult, RowCallback};
pub use executor::Executor;
pub use from_value::FromValue;
pub use transaction::IsolationLevel;
