//! Native bind types.
//!
//! A bind type is the in-memory representation requested from the driver for a
//! column or parameter, independent of its backend-declared type.

use crate::config::CharEncoding;
use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// C-level type a buffer is physically interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindType {
    /// Narrow (8-bit) character data, NUL terminated.
    Char,
    /// Wide (16-bit) character data, NUL terminated.
    WChar,
    /// Signed 64-bit integer.
    SBigInt,
    /// 64-bit float.
    Double,
    /// Single byte boolean.
    Bit,
    /// Opaque bytes, not terminated.
    Binary,
    /// DATE_STRUCT.
    Date,
    /// TIME_STRUCT.
    Time,
    /// TIMESTAMP_STRUCT.
    Timestamp,
}

impl BindType {
    /// Character bind type for the session encoding.
    pub fn text(encoding: CharEncoding) -> Self {
        match encoding {
            CharEncoding::Narrow => BindType::Char,
            CharEncoding::Wide => BindType::WChar,
        }
    }

    pub fn from_c_code(code: i16) -> Result<Self> {
        match code {
            SQL_C_CHAR => Ok(BindType::Char),
            SQL_C_WCHAR => Ok(BindType::WChar),
            SQL_C_SBIGINT => Ok(BindType::SBigInt),
            SQL_C_DOUBLE => Ok(BindType::Double),
            SQL_C_BIT => Ok(BindType::Bit),
            SQL_C_BINARY => Ok(BindType::Binary),
            SQL_C_TYPE_DATE => Ok(BindType::Date),
            SQL_C_TYPE_TIME => Ok(BindType::Time),
            SQL_C_TYPE_TIMESTAMP => Ok(BindType::Timestamp),
            _ => Err(Error::UnsupportedType { code }),
        }
    }

    pub fn c_code(&self) -> i16 {
        match self {
            BindType::Char => SQL_C_CHAR,
            BindType::WChar => SQL_C_WCHAR,
            BindType::SBigInt => SQL_C_SBIGINT,
            BindType::Double => SQL_C_DOUBLE,
            BindType::Bit => SQL_C_BIT,
            BindType::Binary => SQL_C_BINARY,
            BindType::Date => SQL_C_TYPE_DATE,
            BindType::Time => SQL_C_TYPE_TIME,
            BindType::Timestamp => SQL_C_TYPE_TIMESTAMP,
        }
    }

    /// Byte size of fixed-width bind types, `None` for variable-length ones.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            BindType::SBigInt | BindType::Double => Some(8),
            BindType::Bit => Some(1),
            BindType::Date => Some(DATE_STRUCT_SIZE),
            BindType::Time => Some(TIME_STRUCT_SIZE),
            BindType::Timestamp => Some(TIMESTAMP_STRUCT_SIZE),
            BindType::Char | BindType::WChar | BindType::Binary => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.fixed_size().is_none()
    }

    pub fn is_character(&self) -> bool {
        matches!(self, BindType::Char | BindType::WChar)
    }

    /// Bytes of the NUL terminator the driver appends to this type.
    pub fn terminator_len(&self) -> usize {
        match self {
            BindType::Char => 1,
            BindType::WChar => 2,
            _ => 0,
        }
    }

    /// Size in bytes of one code unit.
    pub fn unit_width(&self) -> usize {
        match self {
            BindType::WChar => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for BindType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BindType::Char => "SQL_C_CHAR",
            BindType::WChar => "SQL_C_WCHAR",
            BindType::SBigInt => "SQL_C_SBIGINT",
            BindType::Double => "SQL_C_DOUBLE",
            BindType::Bit => "SQL_C_BIT",
            BindType::Binary => "SQL_C_BINARY",
            BindType::Date => "SQL_C_TYPE_DATE",
            BindType::Time => "SQL_C_TYPE_TIME",
            BindType::Timestamp => "SQL_C_TYPE_TIMESTAMP",
        };
        write!(f, "{}", name)
    }
}
