//! Transaction context handed to `Handle::transaction` callbacks

use crate::error::Result;
use crate::handle::{run_count, run_query_row};
use crate::row::Record;
use crate::traits::{BackendTransaction, ExecuteResult, Executor};
use crate::value::Value;
use async_trait::async_trait;
use tracing::{debug, warn};

/// An open transaction.
///
/// Only reachable inside [`Handle::transaction`](crate::Handle::transaction),
/// which owns commit and rollback. Statements run here skip the liveness
/// check: the transaction already holds a connection.
///
/// # Example
///
/// ```ignore
/// handle.transaction(|tx| Box::pin(async move {
///     tx.exec("UPDATE accounts SET balance = balance - ? WHERE id = ?", vec![10.into(), 1.into()]).await?;
///     tx.exec("UPDATE accounts SET balance = balance + ? WHERE id = ?", vec![10.into(), 2.into()]).await?;
///     Ok(())
/// })).await?;
/// ```
pub struct Transaction {
    inner: Box<dyn BackendTransaction>,
}

impl Transaction {
    pub(crate) fn new(inner: Box<dyn BackendTransaction>) -> Self {
        Self { inner }
    }

    pub(crate) async fn commit(&self) -> Result<()> {
        self.inner.commit().await
    }

    /// Roll back, logging instead of returning a failure so the error that
    /// caused the rollback is the one the caller sees.
    pub(crate) async fn rollback_quietly(&self) {
        if let Err(e) = self.inner.rollback().await {
            warn!(error = %e, "transaction rollback failed");
        }
    }

    /// Fetch all rows as records.
    pub async fn query_rows(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        debug!(sql, args = ?params, "tx query_rows");
        self.inner.query(sql, params).await
    }

    /// Stream rows to a callback one at a time.
    pub async fn query_rows_streaming<F>(
        &self,
        sql: &str,
        params: Vec<Value>,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(Record) -> Result<()> + Send,
    {
        debug!(sql, args = ?params, "tx query_rows_streaming");
        self.inner.query_each(sql, params, &mut callback).await
    }

    /// Fetch at most one row.
    pub async fn query_row(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>> {
        run_query_row(&*self.inner, sql, params).await
    }

    /// Execute a statement.
    pub async fn exec(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        debug!(sql, args = ?params, "tx exec");
        self.inner.execute(sql, params).await
    }

    /// Count the rows a query would return.
    pub async fn count(&self, sql: &str, params: Vec<Value>) -> Result<i64> {
        run_count(&*self.inner, sql, params).await
    }
}

#[async_trait]
impl Executor for Transaction {
    async fn query_rows(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        Transaction::query_rows(self, sql, params).await
    }

    async fn query_rows_streaming<F>(&self, sql: &str, params: Vec<Value>, callback: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<()> + Send,
    {
        Transaction::query_rows_streaming(self, sql, params, callback).await
    }

    async fn query_row(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>> {
        Transaction::query_row(self, sql, params).await
    }

    async fn exec(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        Transaction::exec(self, sql, params).await
    }

    async fn count(&self, sql: &str, params: Vec<Value>) -> Result<i64> {
        Transaction::count(self, sql, params).await
    }
}
