//! Native values for query results and parameters.

use chrono::{DateTime, Utc};
use std::fmt;

/// A single column or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// TINYINT, SMALLINT, INTEGER.
    Integer(i64),
    /// BIGINT. Kept apart from `Integer` so callers never route it through f64.
    BigInt(i64),
    /// DECIMAL, NUMERIC, FLOAT, REAL, DOUBLE.
    Double(f64),
    /// BIT.
    Boolean(bool),
    /// Character data.
    Text(String),
    /// Binary data, length-exact.
    Binary(Vec<u8>),
    /// DATE, TIME, TIMESTAMP, interpreted as UTC.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) | Value::BigInt(v) => Some(*v),
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Integer(v) | Value::BigInt(v) => Some(*v as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) | Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Binary(bytes) => write!(f, "<BINARY: {} bytes>", bytes.len()),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
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
    use chrono::TimeZone;

    #[test]
    fn test_value_null() {
        let val = Value::Null;
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(val.to_i64(), None);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42).to_i64(), Some(42));
        assert_eq!(Value::from(9_007_199_254_740_993i64), Value::BigInt(9_007_199_254_740_993));
        assert_eq!(Value::Text(" 12 ".to_string()).to_i64(), Some(12));
        assert_eq!(Value::Text("1.5".to_string()).to_f64(), Some(1.5));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_value_display() {
        let ts = Utc.with_ymd_and_hms(2024, 2, 29, 13, 5, 9).unwrap();
        assert_eq!(Value::from(ts).to_string(), "2024-02-29 13:05:09");
        assert_eq!(Value::Binary(vec![1, 2, 3]).to_string(), "<BINARY: 3 bytes>");
        assert_eq!(Value::Integer(-7).to_string(), "-7");
    }
}
