//! Decoded column values.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::core::types::HostType;

/// One column value of a row, in its host representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The representation this value is in, `None` for NULL.
    pub fn host_type(&self) -> Option<HostType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => HostType::Bool,
            Value::I32(_) => HostType::I32,
            Value::I64(_) => HostType::I64,
            Value::U64(_) => HostType::U64,
            Value::F32(_) => HostType::F32,
            Value::F64(_) => HostType::F64,
            Value::Decimal(_) => HostType::Decimal,
            Value::Text(_) => HostType::Text,
            Value::Bytes(_) => HostType::Bytes,
            Value::Date(_) => HostType::Date,
            Value::Time(_) => HostType::Time,
            Value::Timestamp(_) => HostType::Timestamp,
        })
    }

    /// Integer view of any integral (or boolean) value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            Value::I32(v) => Some(f64::from(*v)),
            Value::I64(v) => Some(*v as f64),
            Value::U64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::I32(v) => Some(*v != 0),
            Value::I64(v) => Some(*v != 0),
            Value::U64(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// Plain text rendering, as it would appear between the quotes of a SQL
/// literal (before escaping). NULL renders as `NULL`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => {
                for b in v {
                    write!(f, "{:02X}", b)?;
                }
                Ok(())
            }
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::Time(v) => write!(f, "{}", v.format("%H:%M:%S%.f")),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::I64(i64::from(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from("Alice"), Value::Text("Alice".into()));
        assert_eq!(Value::from(7u32), Value::I64(7));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3i32)), Value::I32(3));
    }

    #[test]
    fn test_integer_views() {
        assert_eq!(Value::I32(1).as_i64(), Some(1));
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::Text("1".into()).as_i64(), None);
        assert_eq!(Value::I64(0).as_bool(), Some(false));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Bool(true).to_string(), "1");
        assert_eq!(Value::Bytes(vec![0x0a, 0xff]).to_string(), "0AFF");
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-02-29 13:05:09");
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_host_type() {
        assert_eq!(Value::Null.host_type(), None);
        assert_eq!(Value::from(1.5f64).host_type(), Some(HostType::F64));
    }
}
