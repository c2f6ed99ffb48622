//! Backend traits implemented by each database driver

use std::any::Any;

use crate::error::Result;
use crate::row::Record;
use crate::traits::IsolationLevel;
use crate::value::Value;
use async_trait::async_trait;

/// Result of a statement execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Number of rows affected by the statement
    pub rows_affected: u64,
    /// Last insert ID (for INSERT statements)
    pub last_insert_id: Option<u64>,
}

/// Per-row callback for streaming queries. Returning an error stops the
/// iteration and that error is returned to the caller.
pub type RowCallback<'a> = dyn FnMut(Record) -> Result<()> + Send + 'a;

/// Statement execution shared by live connections and open transactions.
///
/// SQL reaching these methods is final: rewriting and named-parameter
/// binding happen before the backend sees it, and `params` bind to `?`
/// placeholders in order.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Fetch every row of the result.
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>>;

    /// Feed rows to `callback` as they are read.
    async fn query_each(
        &self,
        sql: &str,
        params: Vec<Value>,
        callback: &mut RowCallback<'_>,
    ) -> Result<()>;

    /// Fetch the first row, if any.
    async fn query_first(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>>;

    /// Fetch the first column of the first row, if any.
    async fn query_scalar(&self, sql: &str, params: Vec<Value>) -> Result<Option<Value>>;

    /// Run a statement that returns no rows.
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult>;
}

/// An opened database, as produced by a driver.
///
/// The underlying client owns sockets and any pooling; implementations only
/// translate between sqlkit types and the client's.
#[async_trait]
pub trait Backend: Connection + 'static {
    /// Liveness check, run before every handle operation.
    async fn ping(&self) -> Result<()>;

    /// Open a transaction. `None` keeps the server's default isolation.
    async fn begin(&self, level: Option<IsolationLevel>) -> Result<Box<dyn BackendTransaction>>;

    /// Release the underlying client.
    async fn close(&self) -> Result<()>;

    /// The registry scheme this backend answers to.
    fn driver_name(&self) -> &'static str;

    /// Access to the concrete backend, for reaching the raw client.
    fn as_any(&self) -> &dyn Any;
}

/// An open transaction on a backend.
#[async_trait]
pub trait BackendTransaction: Connection {
    /// Commit the transaction, making all changes permanent.
    async fn commit(&self) -> Result<()>;

    /// Rollback the transaction, discarding all changes.
    async fn rollback(&self) -> Result<()>;
}
