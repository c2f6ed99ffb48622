//! mysql_async rows to sqlkit records

use crate::error::{Error, Result};
use crate::row::Record;
use mysql_async::Row as MySqlAsyncRow;

use super::types::from_mysql_value;

/// Build a record from a mysql_async row, keyed by column name.
pub(crate) fn record_from_row(row: MySqlAsyncRow) -> Result<Record> {
    let columns = row.columns_ref();
    let mut record = Record::with_capacity(columns.len());

    for (i, column) in columns.iter().enumerate() {
        let column_name = column.name_str().to_string();
        let mysql_value = row
            .as_ref(i)
            .ok_or_else(|| Error::ColumnNotFound(column_name.clone()))?
            .clone();
        record.insert(column_name, from_mysql_value(mysql_value)?);
    }

    Ok(record)
}

/// First column of a row, for scalar queries.
pub(crate) fn first_column(row: &MySqlAsyncRow) -> Result<crate::Value> {
    let mysql_value = row
        .as_ref(0)
        .ok_or_else(|| Error::Query("Expected at least one column".to_string()))?
        .clone();
    from_mysql_value(mysql_value)
}
