//! Query builder for sqlkit

use crate::error::{Error, Result};
use crate::rewrite::{self, NamedSql};
use crate::row::Record;
use crate::traits::{ExecuteResult, Executor};
use crate::value::{NamedArgs, Value};

/// A query builder that supports fluent parameter binding.
///
/// Arguments are either positional (`?` placeholders, bound in order with
/// [`bind`](Query::bind)) or named (`@name` placeholders, bound with
/// [`arg`](Query::arg)); a query uses one style or the other. Named queries
/// go through [`rewrite::parse_named_sql`] before they run.
///
/// # Example
///
/// ```ignore
/// use sqlkit::{Executor, Query};
///
/// async fn open_orders(db: &impl Executor, user: i64) -> sqlkit::Result<i64> {
///     Query::new("SELECT * FROM orders WHERE user_id = @user AND status = @status")
///         .arg("user", user)
///         .arg("status", "open")
///         .count(db)
///         .await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Query<'q> {
    sql: &'q str,
    params: Vec<Value>,
    named: NamedArgs,
}

impl<'q> Query<'q> {
    /// Create a new query with the given SQL.
    pub fn new(sql: &'q str) -> Self {
        Self {
            sql,
            params: Vec::new(),
            named: NamedArgs::new(),
        }
    }

    /// Bind a single positional value to the query.
    ///
    /// Values are bound in order, replacing `?` placeholders.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Bind multiple positional values to the query.
    ///
    /// This is useful for IN clauses.
    pub fn bind_all<T: Into<Value> + Clone>(mut self, values: &[T]) -> Self {
        self.params.extend(values.iter().cloned().map(Into::into));
        self
    }

    /// Bind a value to the `@name` placeholder.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Bind a whole set of named values, replacing same-named earlier ones.
    pub fn args(mut self, args: NamedArgs) -> Self {
        self.named.extend(args);
        self
    }

    /// Get the SQL string as written.
    pub fn sql(&self) -> &str {
        self.sql
    }

    /// Get the positional parameters bound so far.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Resolve the SQL and parameter list that will be sent to the database.
    ///
    /// Named arguments are rewritten to positional ones; mixing both styles
    /// is an error.
    pub fn build(self) -> Result<NamedSql> {
        if self.named.is_empty() {
            return Ok(NamedSql {
                sql: self.sql.to_string(),
                values: self.params,
            });
        }
        if !self.params.is_empty() {
            return Err(Error::Query(
                "Cannot mix positional and named arguments in one query".to_string(),
            ));
        }
        rewrite::parse_named_sql(self.sql, Some(&self.named))
    }

    /// Execute the query and return the result.
    pub async fn execute<E: Executor>(self, db: &E) -> Result<ExecuteResult> {
        let NamedSql { sql, values } = self.build()?;
        db.exec(&sql, values).await
    }

    /// Fetch all matching rows.
    pub async fn fetch_all<E: Executor>(self, db: &E) -> Result<Vec<Record>> {
        let NamedSql { sql, values } = self.build()?;
        db.query_rows(&sql, values).await
    }

    /// Stream matching rows to `callback`.
    pub async fn fetch_each<E, F>(self, db: &E, callback: F) -> Result<()>
    where
        E: Executor,
        F: FnMut(Record) -> Result<()> + Send,
    {
        let NamedSql { sql, values } = self.build()?;
        db.query_rows_streaming(&sql, values, callback).await
    }

    /// Fetch a single optional row.
    pub async fn fetch_optional<E: Executor>(self, db: &E) -> Result<Option<Record>> {
        let NamedSql { sql, values } = self.build()?;
        db.query_row(&sql, values).await
    }

    /// Fetch exactly one row.
    pub async fn fetch_one<E: Executor>(self, db: &E) -> Result<Record> {
        self.fetch_optional(db)
            .await?
            .ok_or_else(|| Error::Query("Expected one row, got none".to_string()))
    }

    /// Count the rows this query would return.
    pub async fn count<E: Executor>(self, db: &E) -> Result<i64> {
        let NamedSql { sql, values } = self.build()?;
        db.count(&sql, values).await
    }
}
