//! Backend SQL data types.
//!
//! Nullability, size and precision are column properties, not type
//! properties; they live on [`ColumnDescriptor`](super::ColumnDescriptor).

use crate::protocol::constants::*;

/// Backend-declared SQL data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// CHAR(n) - fixed-length narrow string.
    Char,
    /// VARCHAR(n) - variable-length narrow string.
    Varchar,
    /// LONG VARCHAR / TEXT - unbounded narrow string.
    LongVarchar,
    /// NCHAR(n) - fixed-length wide string.
    WChar,
    /// NVARCHAR(n) - variable-length wide string.
    WVarchar,
    /// NTEXT - unbounded wide string.
    WLongVarchar,
    /// BINARY(n).
    Binary,
    /// VARBINARY(n).
    Varbinary,
    /// LONG VARBINARY / BLOB.
    LongVarbinary,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    /// DECIMAL(p, s).
    Decimal,
    /// NUMERIC(p, s).
    Numeric,
    Float,
    Real,
    Double,
    Bit,
    Date,
    Time,
    Timestamp,
    Guid,
    /// Driver-specific or unknown type code.
    Other(i16),
}

/// Broad conversion family of a [`SqlType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Integral,
    BigInteger,
    Numeric,
    Boolean,
    Temporal,
    Binary,
    Character,
}

impl SqlType {
    /// Map a raw type code onto a type. Unknown codes become `Other`.
    pub fn from_code(code: i16) -> Self {
        match code {
            SQL_CHAR => SqlType::Char,
            SQL_VARCHAR => SqlType::Varchar,
            SQL_LONGVARCHAR => SqlType::LongVarchar,
            SQL_WCHAR => SqlType::WChar,
            SQL_WVARCHAR => SqlType::WVarchar,
            SQL_WLONGVARCHAR => SqlType::WLongVarchar,
            SQL_BINARY => SqlType::Binary,
            SQL_VARBINARY => SqlType::Varbinary,
            SQL_LONGVARBINARY => SqlType::LongVarbinary,
            SQL_TINYINT => SqlType::TinyInt,
            SQL_SMALLINT => SqlType::SmallInt,
            SQL_INTEGER => SqlType::Integer,
            SQL_BIGINT => SqlType::BigInt,
            SQL_DECIMAL => SqlType::Decimal,
            SQL_NUMERIC => SqlType::Numeric,
            SQL_FLOAT => SqlType::Float,
            SQL_REAL => SqlType::Real,
            SQL_DOUBLE => SqlType::Double,
            SQL_BIT => SqlType::Bit,
            SQL_TYPE_DATE | SQL_DATETIME => SqlType::Date,
            SQL_TYPE_TIME | SQL_TIME => SqlType::Time,
            SQL_TYPE_TIMESTAMP | SQL_TIMESTAMP => SqlType::Timestamp,
            SQL_GUID => SqlType::Guid,
            other => SqlType::Other(other),
        }
    }

    /// Raw type code.
    pub fn code(&self) -> i16 {
        match self {
            SqlType::Char => SQL_CHAR,
            SqlType::Varchar => SQL_VARCHAR,
            SqlType::LongVarchar => SQL_LONGVARCHAR,
            SqlType::WChar => SQL_WCHAR,
            SqlType::WVarchar => SQL_WVARCHAR,
            SqlType::WLongVarchar => SQL_WLONGVARCHAR,
            SqlType::Binary => SQL_BINARY,
            SqlType::Varbinary => SQL_VARBINARY,
            SqlType::LongVarbinary => SQL_LONGVARBINARY,
            SqlType::TinyInt => SQL_TINYINT,
            SqlType::SmallInt => SQL_SMALLINT,
            SqlType::Integer => SQL_INTEGER,
            SqlType::BigInt => SQL_BIGINT,
            SqlType::Decimal => SQL_DECIMAL,
            SqlType::Numeric => SQL_NUMERIC,
            SqlType::Float => SQL_FLOAT,
            SqlType::Real => SQL_REAL,
            SqlType::Double => SQL_DOUBLE,
            SqlType::Bit => SQL_BIT,
            SqlType::Date => SQL_TYPE_DATE,
            SqlType::Time => SQL_TYPE_TIME,
            SqlType::Timestamp => SQL_TYPE_TIMESTAMP,
            SqlType::Guid => SQL_GUID,
            SqlType::Other(code) => *code,
        }
    }

    /// Conversion family. Unknown types are treated as character data.
    pub fn family(&self) -> TypeFamily {
        match self {
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer => TypeFamily::Integral,
            SqlType::BigInt => TypeFamily::BigInteger,
            SqlType::Decimal
            | SqlType::Numeric
            | SqlType::Float
            | SqlType::Real
            | SqlType::Double => TypeFamily::Numeric,
            SqlType::Bit => TypeFamily::Boolean,
            SqlType::Date | SqlType::Time | SqlType::Timestamp => TypeFamily::Temporal,
            SqlType::Binary | SqlType::Varbinary | SqlType::LongVarbinary => TypeFamily::Binary,
            SqlType::Char
            | SqlType::Varchar
            | SqlType::LongVarchar
            | SqlType::WChar
            | SqlType::WVarchar
            | SqlType::WLongVarchar
            | SqlType::Guid
            | SqlType::Other(_) => TypeFamily::Character,
        }
    }

    /// Whether the type is stored as UTF-16 by the backend.
    pub fn is_wide(&self) -> bool {
        matches!(
            self,
            SqlType::WChar | SqlType::WVarchar | SqlType::WLongVarchar
        )
    }

    /// Whether the type is an unbounded (LOB-like) type.
    pub fn is_long(&self) -> bool {
        matches!(
            self,
            SqlType::LongVarchar | SqlType::WLongVarchar | SqlType::LongVarbinary
        )
    }

    /// Clamp a reported column size up to the documented minimum.
    ///
    /// Some drivers report a DATE/TIME size smaller than the text form needs.
    pub fn clamp_column_size(&self, size: usize) -> usize {
        match self {
            SqlType::Date => size.max(SQL_DATE_MIN_COLUMN_SIZE),
            SqlType::Time => size.max(SQL_TIME_MIN_COLUMN_SIZE),
            SqlType::Timestamp => size.max(SQL_TIMESTAMP_MIN_COLUMN_SIZE),
            _ => size,
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Char => write!(f, "CHAR"),
            SqlType::Varchar => write!(f, "VARCHAR"),
            SqlType::LongVarchar => write!(f, "LONGVARCHAR"),
            SqlType::WChar => write!(f, "WCHAR"),
            SqlType::WVarchar => write!(f, "WVARCHAR"),
            SqlType::WLongVarchar => write!(f, "WLONGVARCHAR"),
            SqlType::Binary => write!(f, "BINARY"),
            SqlType::Varbinary => write!(f, "VARBINARY"),
            SqlType::LongVarbinary => write!(f, "LONGVARBINARY"),
            SqlType::TinyInt => write!(f, "TINYINT"),
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Decimal => write!(f, "DECIMAL"),
            SqlType::Numeric => write!(f, "NUMERIC"),
            SqlType::Float => write!(f, "FLOAT"),
            SqlType::Real => write!(f, "REAL"),
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::Bit => write!(f, "BIT"),
            SqlType::Date => write!(f, "DATE"),
            SqlType::Time => write!(f, "TIME"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
            SqlType::Guid => write!(f, "GUID"),
            SqlType::Other(code) => write!(f, "TYPE({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_roundtrips_known_codes() {
        for code in [
            SQL_CHAR,
            SQL_VARCHAR,
            SQL_LONGVARCHAR,
            SQL_WCHAR,
            SQL_WVARCHAR,
            SQL_WLONGVARCHAR,
            SQL_BINARY,
            SQL_VARBINARY,
            SQL_LONGVARBINARY,
            SQL_TINYINT,
            SQL_SMALLINT,
            SQL_INTEGER,
            SQL_BIGINT,
            SQL_DECIMAL,
            SQL_NUMERIC,
            SQL_FLOAT,
            SQL_REAL,
            SQL_DOUBLE,
            SQL_BIT,
            SQL_TYPE_DATE,
            SQL_TYPE_TIME,
            SQL_TYPE_TIMESTAMP,
            SQL_GUID,
        ] {
            assert_eq!(SqlType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_legacy_datetime_codes() {
        assert_eq!(SqlType::from_code(SQL_DATETIME), SqlType::Date);
        assert_eq!(SqlType::from_code(SQL_TIME), SqlType::Time);
        assert_eq!(SqlType::from_code(SQL_TIMESTAMP), SqlType::Timestamp);
    }

    #[test]
    fn test_unknown_code_is_character() {
        let t = SqlType::from_code(-150);
        assert_eq!(t, SqlType::Other(-150));
        assert_eq!(t.family(), TypeFamily::Character);
        assert_eq!(format!("{}", t), "TYPE(-150)");
    }

    #[test]
    fn test_clamp_column_size() {
        assert_eq!(SqlType::Date.clamp_column_size(4), 10);
        assert_eq!(SqlType::Time.clamp_column_size(0), 8);
        assert_eq!(SqlType::Timestamp.clamp_column_size(16), 19);
        assert_eq!(SqlType::Timestamp.clamp_column_size(27), 27);
        assert_eq!(SqlType::Varchar.clamp_column_size(3), 3);
    }
}
