//! SQLite backend and driver

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::registry::Driver;
use crate::row::Record;
use crate::traits::{
    Backend, BackendTransaction, Connection, ExecuteResult, IsolationLevel, RowCallback,
};
use crate::value::Value;
use async_trait::async_trait;
use rusqlite::params_from_iter;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::transaction::SqliteTransaction;
use super::types::{from_sqlite_value, record_from_row, to_sqlite_params};
use super::SCHEME;

/// Rows buffered between the reader thread and a streaming callback.
const STREAM_BUFFER: usize = 64;

type Shared = Arc<Mutex<Option<rusqlite::Connection>>>;

/// A SQLite backend over a single connection.
///
/// rusqlite is blocking, so every call runs on tokio's blocking pool. The
/// connection is shared by clones; a transaction opened on it sees (and is
/// seen by) statements issued through the handle until it finishes.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Shared,
}

impl SqliteBackend {
    /// Open a database file, or an in-memory database for `:memory:`.
    ///
    /// Foreign key enforcement is switched on.
    pub fn open(path: &str) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already-open rusqlite connection.
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Run `f` against the raw rusqlite connection on the blocking pool.
    pub async fn with_conn<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<R> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Connection("SQLite connection lock poisoned".to_string()))?;
            let conn = guard.as_mut().ok_or(Error::NotOpen)?;
            f(conn)
        })
        .await
        .map_err(|e| Error::Connection(format!("SQLite worker failed: {}", e)))?
    }

    pub(crate) async fn batch(&self, sql: &'static str) -> Result<()> {
        self.with_conn(move |conn| Ok(conn.execute_batch(sql)?)).await
    }

    /// Roll back an open transaction from synchronous code.
    ///
    /// Blocks until any statement still running on the blocking pool lets go
    /// of the connection. Does nothing when the connection is closed or
    /// already in autocommit mode.
    pub(crate) fn rollback_blocking(&self) {
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(conn) = guard.as_ref() else {
            return;
        };
        if conn.is_autocommit() {
            return;
        }
        match conn.execute_batch("ROLLBACK") {
            Ok(()) => debug!("rolled back abandoned sqlite transaction"),
            Err(e) => warn!(error = %e, "failed to roll back abandoned sqlite transaction"),
        }
    }
}

/// Driver registered under the `sqlite` scheme.
///
/// The rest-string is the database path: `sqlite:///var/data/app.db`,
/// `sqlite://app.db`, or `sqlite://:memory:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn create(&self, rest: &str) -> Result<Handle> {
        Ok(Handle::new(SqliteBackend::open(rest)?))
    }
}

fn column_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

#[async_trait]
impl Connection for SqliteBackend {
    async fn query(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns = column_names(&stmt);
            let mut rows = stmt.query(params_from_iter(to_sqlite_params(&params)))?;

            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(record_from_row(row, &columns)?);
            }
            Ok(records)
        })
        .await
    }

    async fn query_each(
        &self,
        sql: &str,
        params: Vec<Value>,
        callback: &mut RowCallback<'_>,
    ) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<Record>(STREAM_BUFFER);
        let sql = sql.to_string();

        let reader = self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns = column_names(&stmt);
            let mut rows = stmt.query(params_from_iter(to_sqlite_params(&params)))?;

            while let Some(row) = rows.next()? {
                if tx.blocking_send(record_from_row(row, &columns)?).is_err() {
                    // Receiver dropped: the callback stopped the stream
                    break;
                }
            }
            Ok(())
        });

        let consume = async move {
            let mut outcome = Ok(());
            while let Some(record) = rx.recv().await {
                if let Err(e) = callback(record) {
                    outcome = Err(e);
                    break;
                }
            }
            // Unblocks a reader waiting on a full buffer
            rx.close();
            outcome
        };

        let (read, consumed) = tokio::join!(reader, consume);

        consumed?;
        read
    }

    async fn query_first(&self, sql: &str, params: Vec<Value>) -> Result<Option<Record>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns = column_names(&stmt);
            let mut rows = stmt.query(params_from_iter(to_sqlite_params(&params)))?;

            match rows.next()? {
                Some(row) => Ok(Some(record_from_row(row, &columns)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn query_scalar(&self, sql: &str, params: Vec<Value>) -> Result<Option<Value>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(to_sqlite_params(&params)))?;

            match rows.next()? {
                Some(row) => Ok(Some(from_sqlite_value(row.get_ref(0)?)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<ExecuteResult> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let rows_affected = conn.execute(&sql, params_from_iter(to_sqlite_params(&params)))?;
            let rowid = conn.last_insert_rowid();
            Ok(ExecuteResult {
                rows_affected: rows_affected as u64,
                last_insert_id: u64::try_from(rowid).ok().filter(|id| *id > 0),
            })
        })
        .await
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await
    }

    /// SQLite transactions are always serializable; `level` is ignored.
    async fn begin(&self, level: Option<IsolationLevel>) -> Result<Box<dyn BackendTransaction>> {
        self.batch("BEGIN").await?;
        debug!(isolation = ?level, "sqlite transaction started");
        Ok(Box::new(SqliteTransaction::new(self.clone())))
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = conn
                .lock()
                .map_err(|_| Error::Connection("SQLite connection lock poisoned".to_string()))?
                .take();
            match taken {
                Some(conn) => conn.close().map_err(|(_, e)| Error::Sqlite(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| Error::Connection(format!("SQLite worker failed: {}", e)))?
    }

    fn driver_name(&self) -> &'static str {
        SCHEME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
