//! Driver-side conversions of the in-memory driver.

use crate::error::{Diagnostics, Error};
use crate::protocol::constants::*;
use crate::protocol::decode::{encode_text, encoding_of};
use crate::protocol::types::{render_text, BindType, SqlType, Value};

/// Column size used when a column or parameter does not declare one.
pub fn default_column_size(sql_type: SqlType) -> usize {
    match sql_type {
        SqlType::TinyInt => 3,
        SqlType::SmallInt => 5,
        SqlType::Integer => 10,
        SqlType::BigInt => 19,
        SqlType::Decimal | SqlType::Numeric => 18,
        SqlType::Real => 7,
        SqlType::Float | SqlType::Double => 15,
        SqlType::Bit => 1,
        SqlType::Date => SQL_DATE_MIN_COLUMN_SIZE,
        SqlType::Time => SQL_TIME_MIN_COLUMN_SIZE,
        SqlType::Timestamp => 27,
        SqlType::Guid => 36,
        SqlType::Char
        | SqlType::Varchar
        | SqlType::WChar
        | SqlType::WVarchar
        | SqlType::Binary
        | SqlType::Varbinary => 255,
        SqlType::LongVarchar
        | SqlType::WLongVarchar
        | SqlType::LongVarbinary
        | SqlType::Other(_) => 0,
    }
}

/// `TYPE_NAME` reported by catalog functions.
pub fn type_name(sql_type: SqlType) -> String {
    match sql_type {
        SqlType::Char => "CHAR",
        SqlType::Varchar => "VARCHAR",
        SqlType::LongVarchar => "TEXT",
        SqlType::WChar => "NCHAR",
        SqlType::WVarchar => "NVARCHAR",
        SqlType::WLongVarchar => "NTEXT",
        SqlType::Binary => "BINARY",
        SqlType::Varbinary => "VARBINARY",
        SqlType::LongVarbinary => "IMAGE",
        SqlType::TinyInt => "TINYINT",
        SqlType::SmallInt => "SMALLINT",
        SqlType::Integer => "INTEGER",
        SqlType::BigInt => "BIGINT",
        SqlType::Decimal => "DECIMAL",
        SqlType::Numeric => "NUMERIC",
        SqlType::Float => "FLOAT",
        SqlType::Real => "REAL",
        SqlType::Double => "DOUBLE",
        SqlType::Bit => "BIT",
        SqlType::Date => "DATE",
        SqlType::Time => "TIME",
        SqlType::Timestamp => "TIMESTAMP",
        SqlType::Guid => "UNIQUEIDENTIFIER",
        SqlType::Other(code) => return format!("TYPE{}", code),
    }
    .to_string()
}

/// Full C representation of a variable-length value, for chunked reads.
pub fn value_bytes(value: &Value, bind: BindType) -> Vec<u8> {
    match (bind, value) {
        (BindType::Binary, Value::Binary(bytes)) => bytes.clone(),
        (BindType::Char | BindType::WChar, other) => {
            encode_text(&render_text(other).unwrap_or_default(), encoding_of(bind))
        }
        (_, other) => render_text(other).unwrap_or_default().into_bytes(),
    }
}

/// Diagnostics for a value the driver could not convert.
pub fn conversion_failure(error: &Error) -> Diagnostics {
    Diagnostics::single("22018", 0, format!("Invalid character value for cast: {}", error))
}

pub fn diagnostic(state: &str, message: impl Into<String>) -> Diagnostics {
    Diagnostics::single(state, 0, message)
}

/// Catalog pattern match: `%` matches any run, `_` one character,
/// case-insensitive. A missing pattern matches everything.
pub fn matches_pattern(pattern: Option<&str>, value: Option<&str>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let value: Vec<char> = value.unwrap_or("").to_lowercase().chars().collect();

    // matched[j]: pattern[..i] matches value[..j]
    let mut matched = vec![false; value.len() + 1];
    matched[0] = true;
    for p in &pattern {
        let mut next = vec![false; value.len() + 1];
        match p {
            '%' => {
                let mut any = false;
                for j in 0..=value.len() {
                    any |= matched[j];
                    next[j] = any;
                }
            }
            '_' => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1];
                }
            }
            c => {
                for j in 1..=value.len() {
                    next[j] = matched[j - 1] && value[j - 1] == *c;
                }
            }
        }
        matched = next;
    }
    matched[value.len()]
}

/// Whether a table type is in a `SQLTables` type list such as
/// `'TABLE','VIEW'`.
pub fn matches_type_list(list: Option<&str>, table_type: &str) -> bool {
    match list {
        None => true,
        Some(list) if list.trim().is_empty() || list.trim() == "%" => true,
        Some(list) => list
            .split(',')
            .map(|t| t.trim().trim_matches('\''))
            .any(|t| t.eq_ignore_ascii_case(table_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        assert!(matches_pattern(None, Some("x")));
        assert!(matches_pattern(Some("%"), None));
        assert!(matches_pattern(Some("us%"), Some("USERS")));
        assert!(matches_pattern(Some("u_ers"), Some("users")));
        assert!(!matches_pattern(Some("u_ers"), Some("uers")));
        assert!(matches_pattern(Some("%rs"), Some("orders")));
        assert!(!matches_pattern(Some("orders"), Some("order")));
    }

    #[test]
    fn test_type_list() {
        assert!(matches_type_list(Some("'TABLE','VIEW'"), "VIEW"));
        assert!(!matches_type_list(Some("TABLE"), "VIEW"));
        assert!(matches_type_list(None, "SYSTEM TABLE"));
    }

    #[test]
    fn test_value_bytes() {
        assert_eq!(value_bytes(&Value::from("ab"), BindType::Char), b"ab".to_vec());
        assert_eq!(value_bytes(&Value::from("ab"), BindType::WChar).len(), 4);
        assert_eq!(value_bytes(&Value::Binary(vec![1, 2]), BindType::Binary), vec![1, 2]);
    }
}
