//! Value conversion between sqlkit and mysql_async

use crate::error::{Error, Result};
use crate::value::Value;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use mysql_async::Value as MySqlValue;

/// Convert a sqlkit Value to a mysql_async Value
pub fn to_mysql_value(value: &Value) -> MySqlValue {
    match value {
        Value::Null => MySqlValue::NULL,
        Value::Bool(v) => MySqlValue::from(*v),
        Value::Int(v) => MySqlValue::Int(*v),
        Value::UInt(v) => MySqlValue::UInt(*v),
        Value::Float(v) => MySqlValue::Double(*v),
        Value::Text(v) => MySqlValue::from(v.as_str()),
        Value::Bytes(v) => MySqlValue::from(v.as_slice()),
        Value::Date(v) => {
            MySqlValue::Date(v.year() as u16, v.month() as u8, v.day() as u8, 0, 0, 0, 0)
        }
        Value::DateTime(v) => MySqlValue::Date(
            v.year() as u16,
            v.month() as u8,
            v.day() as u8,
            v.hour() as u8,
            v.minute() as u8,
            v.second() as u8,
            v.and_utc().timestamp_subsec_micros(),
        ),
        Value::Time(v) => MySqlValue::Time(
            false,
            0,
            v.hour() as u8,
            v.minute() as u8,
            v.second() as u8,
            v.nanosecond() / 1000,
        ),
    }
}

pub fn to_mysql_params(params: &[Value]) -> Vec<MySqlValue> {
    params.iter().map(to_mysql_value).collect()
}

fn date(year: u16, month: u8, day: u8) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year.into(), month.into(), day.into()).ok_or_else(|| {
        Error::TypeConversion {
            expected: "date",
            actual: format!("{}-{}-{}", year, month, day),
        }
    })
}

/// Convert a mysql_async Value to a sqlkit Value
pub fn from_mysql_value(value: MySqlValue) -> Result<Value> {
    match value {
        MySqlValue::NULL => Ok(Value::Null),
        // Text-protocol results and string columns arrive as bytes
        MySqlValue::Bytes(v) => match String::from_utf8(v) {
            Ok(s) => Ok(Value::Text(s)),
            Err(e) => Ok(Value::Bytes(e.into_bytes())),
        },
        MySqlValue::Int(v) => Ok(Value::Int(v)),
        MySqlValue::UInt(v) => Ok(Value::from(v)),
        MySqlValue::Float(v) => Ok(Value::Float(v.into())),
        MySqlValue::Double(v) => Ok(Value::Float(v)),
        MySqlValue::Date(year, month, day, 0, 0, 0, 0) => Ok(Value::Date(date(year, month, day)?)),
        MySqlValue::Date(year, month, day, hour, min, sec, micro) => {
            let time = NaiveTime::from_hms_micro_opt(hour.into(), min.into(), sec.into(), micro)
                .ok_or_else(|| Error::TypeConversion {
                    expected: "time",
                    actual: format!("{}:{}:{}.{}", hour, min, sec, micro),
                })?;
            Ok(Value::DateTime(NaiveDateTime::new(
                date(year, month, day)?,
                time,
            )))
        }
        MySqlValue::Time(is_neg, days, hours, mins, secs, micro) => {
            // NaiveTime covers one day; durations outside it stay as text
            if is_neg || days > 0 || hours >= 24 {
                return Ok(Value::Text(format!(
                    "{}{}:{:02}:{:02}",
                    if is_neg { "-" } else { "" },
                    days * 24 + u32::from(hours),
                    mins,
                    secs
                )));
            }
            let time =
                NaiveTime::from_hms_micro_opt(hours.into(), mins.into(), secs.into(), micro)
                    .ok_or_else(|| Error::TypeConversion {
                        expected: "time",
                        actual: format!("{}:{}:{}.{}", hours, mins, secs, micro),
                    })?;
            Ok(Value::Time(time))
        }
    }
}
