//! SQLite transaction implementation

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::row::Record;
use crate::traits::{BackendTransaction, Connection, ExecuteResult, RowCallback};
use crate::value::Value;
use async_trait::async_trait;

use super::connection::SqliteBackend;

/// A SQLite transaction opened with `BEGIN` on the backend's connection.
///
/// Statements run through the shared connection, so they are part of the
/// transaction until `COMMIT` or `ROLLBACK` is issued. Dropping an unfinished
/// transaction (a cancelled future, an aborted task) rolls it back.
pub struct SqliteTransaction {
    backend: SqliteBackend,
    done: AtomicBool,
}

impl SqliteTransaction {
    pub(crate) fn new(backend: SqliteBackend) -> Self {
        Self {
            backend,
            done: AtomicBool::new(false),
        }
    }

    fn active(&self) -> Result<&SqliteBackend> {
        if self.done.load(Ordering::Acquire) {
            return Err(Error::Query("Transaction already consumed".to_string()));
        }
        Ok(&self.backend)
    }
}

#[async_trait]
impl Connection for SqliteTransaction {
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        self.active()?.query(sql, params).await
    }

    async fn query_each(
        &self,
        sql: &str,
        params: Vec<Value>,
        callback: &mut RowCallback<'_>,
    ) -> Result<()> {
        self.active()?.query_each(sql, params, callback).await
    }

    async fn query_first(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>> {
        self.active()?.query_first(sql, params).await
    }

    async fn query_scalar(&self, sql: &str, params: Vec<Value>) -> Result<Option<Value>> {
        self.active()?.query_scalar(sql, params).await
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        self.active()?.execute(sql, params).await
    }
}

#[async_trait]
impl BackendTransaction for SqliteTransaction {
    // A failed COMMIT (e.g. a deferred constraint) leaves the transaction
    // open, so it stays active for the rollback that follows.
    async fn commit(&self) -> Result<()> {
        self.active()?.batch("COMMIT").await?;
        self.done.store(true, Ordering::Release);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        if self.done.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.backend.batch("ROLLBACK").await
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.backend.rollback_blocking();
        }
    }
}
