//! Value conversion between sqlkit and rusqlite

use crate::error::{Error, Result};
use crate::row::Record;
use crate::value::Value;
use rusqlite::types::{Value as SqliteValue, ValueRef};

/// Convert a sqlkit Value to a rusqlite Value.
///
/// SQLite has no date or boolean storage class; dates go in as ISO-8601
/// text and booleans as 0/1, the forms its date functions and `WHERE flag`
/// checks expect.
pub fn to_sqlite_value(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(v) => SqliteValue::Integer(i64::from(*v)),
        Value::Int(v) => SqliteValue::Integer(*v),
        Value::UInt(v) => match i64::try_from(*v) {
            Ok(v) => SqliteValue::Integer(v),
            Err(_) => SqliteValue::Text(v.to_string()),
        },
        Value::Float(v) => SqliteValue::Real(*v),
        Value::Text(v) => SqliteValue::Text(v.clone()),
        Value::Bytes(v) => SqliteValue::Blob(v.clone()),
        Value::Date(v) => SqliteValue::Text(v.format("%F").to_string()),
        Value::DateTime(v) => SqliteValue::Text(v.format("%F %T%.f").to_string()),
        Value::Time(v) => SqliteValue::Text(v.format("%T%.f").to_string()),
    }
}

pub fn to_sqlite_params(params: &[Value]) -> Vec<SqliteValue> {
    params.iter().map(to_sqlite_value).collect()
}

/// Convert a borrowed rusqlite value to a sqlkit Value
pub fn from_sqlite_value(value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(v) => Ok(Value::Int(v)),
        ValueRef::Real(v) => Ok(Value::Float(v)),
        ValueRef::Text(v) => std::str::from_utf8(v)
            .map(|s| Value::Text(s.to_string()))
            .map_err(|e| Error::TypeConversion {
                expected: "text",
                actual: format!("invalid UTF-8: {}", e),
            }),
        ValueRef::Blob(v) => Ok(Value::Bytes(v.to_vec())),
    }
}

/// Build a record from the current row using pre-fetched column names.
pub(crate) fn record_from_row(row: &rusqlite::Row<'_>, columns: &[String]) -> Result<Record> {
    let mut record = Record::with_capacity(columns.len());
    for (i, name) in columns.iter().enumerate() {
        record.insert(name.clone(), from_sqlite_value(row.get_ref(i)?)?);
    }
    Ok(record)
}
