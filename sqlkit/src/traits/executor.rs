//! Executor trait: the query surface shared by handles and transactions

use crate::error::Result;
use crate::row::Record;
use crate::traits::ExecuteResult;
use crate::value::Value;
use async_trait::async_trait;

/// Anything queries can run against.
///
/// Implemented by [`Handle`](crate::Handle) and
/// [`Transaction`](crate::Transaction), so the same code works inside and
/// outside a transaction.
///
/// # Example
///
/// ```ignore
/// async fn active_users(db: &impl Executor) -> sqlkit::Result<i64> {
///     db.count("SELECT id FROM users WHERE active = ? ORDER BY id", vec![1.into()])
///         .await
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync {
    /// Fetch all rows as records.
    async fn query_rows(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>>;

    /// Stream rows to a callback one at a time.
    async fn query_rows_streaming<F>(&self, sql: &str, params: Vec<Value>, callback: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<()> + Send;

    /// Fetch at most one row, after single-row normalization of the SQL.
    async fn query_row(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>>;

    /// Execute a statement and return the affected-row summary.
    async fn exec(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult>;

    /// Count the rows the query would return, via a synthesized COUNT query.
    async fn count(&self, sql: &str, params: Vec<Value>) -> Result<i64>;
}
