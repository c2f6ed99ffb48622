//! FromValue trait for reading typed values out of row records

use crate::error::{Error, Result};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Trait for types that can be constructed from a database value.
///
/// Drivers disagree on how they hand back numbers (MySQL's text protocol
/// returns integers as strings, SQLite stores booleans as integers), so the
/// numeric conversions accept any numeric variant and numeric text, with
/// range checks on narrowing.
pub trait FromValue: Sized {
    /// Convert a database value to this type.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> Error {
    Error::TypeConversion {
        expected,
        actual: value.type_name().to_string(),
    }
}

fn out_of_range(expected: &'static str, value: impl std::fmt::Display) -> Error {
    Error::TypeConversion {
        expected,
        actual: format!("{} out of range", value),
    }
}

fn parse_text<T: std::str::FromStr>(expected: &'static str, text: &str) -> Result<T> {
    text.trim().parse().map_err(|_| Error::TypeConversion {
        expected,
        actual: format!("text({:?})", text),
    })
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::UInt(v) => Ok(v != 0),
            Value::Text(ref s) => match s.as_str() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => Err(mismatch("bool", &value)),
            },
            _ => Err(mismatch("bool", &value)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(v) => Ok(v),
            Value::UInt(v) => v.try_into().map_err(|_| out_of_range("i64", v)),
            Value::Bool(v) => Ok(v.into()),
            Value::Text(ref s) => parse_text("i64", s),
            _ => Err(mismatch("i64", &value)),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::UInt(v) => Ok(v),
            Value::Int(v) => v.try_into().map_err(|_| out_of_range("u64", v)),
            Value::Bool(v) => Ok(v.into()),
            Value::Text(ref s) => parse_text("u64", s),
            _ => Err(mismatch("u64", &value)),
        }
    }
}

// Narrow integer types go through i64 with a range check
macro_rules! impl_from_value_narrow {
    ($($t:ty => $name:literal),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self> {
                    let wide = i64::from_value(value).map_err(|e| match e {
                        Error::TypeConversion { actual, .. } => Error::TypeConversion {
                            expected: $name,
                            actual,
                        },
                        other => other,
                    })?;
                    wide.try_into().map_err(|_| out_of_range($name, wide))
                }
            }
        )*
    };
}

impl_from_value_narrow!(
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32"
);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            Value::Text(ref s) => parse_text("f64", s),
            _ => Err(mismatch("f64", &value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Bytes(v) => String::from_utf8(v).map_err(|e| Error::TypeConversion {
                expected: "string",
                actual: format!("invalid UTF-8: {}", e),
            }),
            Value::Int(v) => Ok(v.to_string()),
            Value::UInt(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            Value::Bool(v) => Ok(v.to_string()),
            Value::Date(v) => Ok(v.to_string()),
            Value::DateTime(v) => Ok(v.to_string()),
            Value::Time(v) => Ok(v.to_string()),
            Value::Null => Err(mismatch("string", &value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            _ => Err(mismatch("bytes", &value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(v) => Ok(v),
            Value::DateTime(v) => Ok(v.date()),
            Value::Text(ref s) => parse_text("date", s),
            _ => Err(mismatch("date", &value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(v) => Ok(v),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| s.parse())
                .map_err(|_| Error::TypeConversion {
                    expected: "datetime",
                    actual: format!("text({:?})", s),
                }),
            _ => Err(mismatch("datetime", &value)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(v) => Ok(v),
            Value::Text(ref s) => parse_text("time", s),
            _ => Err(mismatch("time", &value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
