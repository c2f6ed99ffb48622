//! MySQL transaction implementation

use crate::error::{Error, Result};
use crate::row::Record;
use crate::traits::{BackendTransaction, Connection, ExecuteResult, IsolationLevel, RowCallback};
use crate::value::Value;
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::Row as MySqlAsyncRow;
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use super::row::{first_column, record_from_row};
use super::types::to_mysql_params;

/// A MySQL transaction.
///
/// This wraps `mysql_async::Transaction`. Once committed or rolled back the
/// inner transaction is gone and further use fails.
pub struct MySqlTransaction {
    // mysql_async::Transaction needs &mut self for every operation while the
    // traits hand out &self; the lock is uncontended, one task drives a
    // transaction at a time.
    inner: Mutex<Option<mysql_async::Transaction<'static>>>,
}

type Guard<'a> = MutexGuard<'a, Option<mysql_async::Transaction<'static>>>;

fn consumed() -> Error {
    Error::Query("Transaction already consumed".to_string())
}

impl MySqlTransaction {
    pub(crate) fn new(tx: mysql_async::Transaction<'static>) -> Self {
        Self {
            inner: Mutex::new(Some(tx)),
        }
    }

    async fn lock(&self) -> Guard<'_> {
        self.inner.lock().await
    }

    async fn take_inner(&self) -> Result<mysql_async::Transaction<'static>> {
        self.lock().await.take().ok_or_else(consumed)
    }
}

#[async_trait]
impl Connection for MySqlTransaction {
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        let mut guard = self.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let rows: Vec<MySqlAsyncRow> = tx.exec(sql, to_mysql_params(&params)).await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn query_each(
        &self,
        sql: &str,
        params: Vec<Value>,
        callback: &mut RowCallback<'_>,
    ) -> Result<()> {
        let mut guard = self.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let mut result = tx.exec_iter(sql, to_mysql_params(&params)).await?;
        while let Some(row) = result.next().await? {
            if let Err(e) = callback(record_from_row(row)?) {
                if let Err(drain) = result.drop_result().await {
                    warn!(error = %drain, "failed to drain result after the callback stopped");
                }
                return Err(e);
            }
        }

        Ok(())
    }

    async fn query_first(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>> {
        let mut guard = self.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row: Option<MySqlAsyncRow> = tx.exec_first(sql, to_mysql_params(&params)).await?;

        row.map(record_from_row).transpose()
    }

    async fn query_scalar(&self, sql: &str, params: Vec<Value>) -> Result<Option<Value>> {
        let mut guard = self.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        let row: Option<MySqlAsyncRow> = tx.exec_first(sql, to_mysql_params(&params)).await?;

        row.as_ref().map(first_column).transpose()
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        let mut guard = self.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;

        tx.exec_drop(sql, to_mysql_params(&params)).await?;

        Ok(ExecuteResult {
            rows_affected: tx.affected_rows(),
            last_insert_id: tx.last_insert_id(),
        })
    }
}

#[async_trait]
impl BackendTransaction for MySqlTransaction {
    async fn commit(&self) -> Result<()> {
        let tx = self.take_inner().await?;
        tx.commit().await?;
        Ok(())
    }

    // After a failed commit the inner transaction is already gone;
    // mysql_async rolls it back when the connection is dropped.
    async fn rollback(&self) -> Result<()> {
        let tx = self.lock().await.take();
        match tx {
            Some(tx) => {
                tx.rollback().await?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Convert sqlkit IsolationLevel to mysql_async IsolationLevel.
pub(crate) fn to_mysql_isolation(level: IsolationLevel) -> mysql_async::IsolationLevel {
    match level {
        IsolationLevel::ReadUncommitted => mysql_async::IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted => mysql_async::IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead => mysql_async::IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable => mysql_async::IsolationLevel::Serializable,
    }
}
