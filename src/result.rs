//! Caller-visible results.

use crate::protocol::types::{find_column, ColumnDescriptor, Row, Value};

/// Result of a query, a catalog call, a procedure call or one cursor page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    /// Rows in fetch order.
    pub rows: Vec<Row>,
    /// Column descriptors; every row has one value per column.
    pub columns: Vec<ColumnDescriptor>,
    /// Rows affected by DML, or -1 when not applicable.
    pub row_count: i64,
    /// Echoed parameters, with OUT and INOUT values filled in.
    pub parameters: Vec<Value>,
}

impl ResultSet {
    /// Result of a statement without a result set.
    pub fn affected(row_count: i64, parameters: Vec<Value>) -> Self {
        Self {
            rows: Vec::new(),
            columns: Vec::new(),
            row_count,
            parameters,
        }
    }

    /// Get the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column (case-insensitive).
    pub fn find_column(&self, name: &str) -> Option<usize> {
        find_column(&self.columns, name)
    }

    /// Value of a named column in a row, for either row shape.
    pub fn get_by_name(&self, row: usize, name: &str) -> Option<&Value> {
        let index = self.find_column(name)?;
        self.rows.get(row)?.get(index)
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
