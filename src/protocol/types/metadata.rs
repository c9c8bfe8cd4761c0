//! Raw column description as reported by the driver.
//!
//! This struct preserves what `SQLDescribeCol` returned, before any bind
//! decision. For the bound form, use `ColumnDescriptor`.

use crate::protocol::constants::SQL_NULLABLE_UNKNOWN;

/// Raw result of describing one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedColumn {
    /// Column name.
    pub name: String,
    /// SQL data type code.
    pub data_type: i16,
    /// Column size (precision for numerics, characters for text).
    pub column_size: usize,
    /// Decimal digits (scale).
    pub decimal_digits: i16,
    /// Raw nullability code.
    pub nullable: i16,
}

impl DescribedColumn {
    /// Create a description with minimal info.
    pub fn new(name: impl Into<String>, data_type: i16) -> Self {
        Self {
            name: name.into(),
            data_type,
            column_size: 0,
            decimal_digits: 0,
            nullable: SQL_NULLABLE_UNKNOWN,
        }
    }

    pub fn with_size(mut self, column_size: usize) -> Self {
        self.column_size = column_size;
        self
    }

    pub fn with_decimal_digits(mut self, digits: i16) -> Self {
        self.decimal_digits = digits;
        self
    }

    pub fn with_nullable(mut self, nullable: i16) -> Self {
        self.nullable = nullable;
        self
    }
}
