//! Column descriptors for bound result sets.

use crate::protocol::constants::*;

use super::bind_type::BindType;
use super::metadata::DescribedColumn;
use super::sql_type::SqlType;

/// Whether a column accepts NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

impl Nullability {
    pub fn from_code(code: i16) -> Self {
        match code {
            SQL_NO_NULLS => Nullability::NoNulls,
            SQL_NULLABLE => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }

    pub fn code(&self) -> i16 {
        match self {
            Nullability::NoNulls => SQL_NO_NULLS,
            Nullability::Nullable => SQL_NULLABLE,
            Nullability::Unknown => SQL_NULLABLE_UNKNOWN,
        }
    }
}

/// A described and bound result column.
///
/// Created once per execution. Re-executing a statement produces a fresh
/// list; descriptors are never patched in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// 1-based ordinal.
    pub index: u16,
    pub name: String,
    /// Declared backend type.
    pub sql_type: SqlType,
    /// Raw type code as reported by the driver.
    pub type_code: i16,
    /// Declared size, after clamping to the type's minimum.
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
    /// Native type the buffer is interpreted as.
    pub bind_type: BindType,
    /// Bytes per row in the bound buffer.
    pub stride: usize,
    /// Whether values may exceed the stride and need chunked reads.
    pub long_data: bool,
}

impl ColumnDescriptor {
    /// Build a descriptor from a driver description and a bind decision.
    pub fn new(
        index: u16,
        described: &DescribedColumn,
        bind_type: BindType,
        stride: usize,
        long_data: bool,
    ) -> Self {
        let sql_type = SqlType::from_code(described.data_type);
        Self {
            index,
            name: described.name.clone(),
            sql_type,
            type_code: described.data_type,
            column_size: sql_type.clamp_column_size(described.column_size),
            decimal_digits: described.decimal_digits,
            nullable: Nullability::from_code(described.nullable),
            bind_type,
            stride,
            long_data,
        }
    }

    /// The binding registered with the driver for this column.
    pub fn binding(&self) -> ColumnBinding {
        ColumnBinding {
            column: self.index,
            bind_type: self.bind_type,
            stride: self.stride,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable != Nullability::NoNulls
    }
}

/// Buffer registration for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBinding {
    /// 1-based column ordinal.
    pub column: u16,
    pub bind_type: BindType,
    pub stride: usize,
}

/// Find a column by name (case-insensitive).
pub fn find_column(columns: &[ColumnDescriptor], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_from_description() {
        let described = DescribedColumn::new("created", SQL_TYPE_TIMESTAMP)
            .with_size(16)
            .with_decimal_digits(3)
            .with_nullable(SQL_NO_NULLS);
        let col = ColumnDescriptor::new(2, &described, BindType::Timestamp, 16, false);

        assert_eq!(col.index, 2);
        assert_eq!(col.sql_type, SqlType::Timestamp);
        assert_eq!(col.column_size, 19);
        assert_eq!(col.nullable, Nullability::NoNulls);
        assert!(!col.is_nullable());
        assert_eq!(
            col.binding(),
            ColumnBinding {
                column: 2,
                bind_type: BindType::Timestamp,
                stride: 16
            }
        );
    }

    #[test]
    fn test_find_column_case_insensitive() {
        let cols: Vec<ColumnDescriptor> = ["ID", "Name"]
            .iter()
            .enumerate()
            .map(|(i, n)| {
                ColumnDescriptor::new(
                    i as u16 + 1,
                    &DescribedColumn::new(*n, SQL_VARCHAR).with_size(10),
                    BindType::Char,
                    41,
                    false,
                )
            })
            .collect();
        assert_eq!(find_column(&cols, "name"), Some(1));
        assert_eq!(find_column(&cols, "id"), Some(0));
        assert_eq!(find_column(&cols, "missing"), None);
    }

    #[test]
    fn test_nullability_codes() {
        assert_eq!(Nullability::from_code(SQL_NULLABLE), Nullability::Nullable);
        assert_eq!(Nullability::from_code(7), Nullability::Unknown);
        assert_eq!(Nullability::Unknown.code(), SQL_NULLABLE_UNKNOWN);
    }
}
