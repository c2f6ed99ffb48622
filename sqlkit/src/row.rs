//! Row records: one result row as a column-name-to-value map

use crate::error::{Error, Result};
use crate::traits::FromValue;
use crate::value::Value;
use serde::Serialize;
use std::collections::HashMap;

/// A single result row keyed by column name.
///
/// Column order is not preserved. When a query produces duplicate column
/// names the last one wins, so alias columns in joins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: HashMap<String, Value>,
}

impl Record {
    /// Create an empty record with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: HashMap::with_capacity(capacity),
        }
    }

    /// Set a column value, replacing any previous value for that column.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Get a value from the record by column name.
    ///
    /// Returns an error if the column doesn't exist.
    pub fn get_value(&self, column: &str) -> Result<&Value> {
        self.values
            .get(column)
            .ok_or_else(|| Error::ColumnNotFound(column.to_string()))
    }

    /// Get a typed value from the record by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        T::from_value(self.get_value(column)?.clone())
    }

    /// Iterate over the column names in this record.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the record and return the underlying map.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.values
    }
}

impl From<HashMap<String, Value>> for Record {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
