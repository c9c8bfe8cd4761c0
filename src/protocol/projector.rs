//! Result projector.
//!
//! Turns stored rows into caller-visible rows, positional or keyed by column
//! name. Pure: nothing here touches a driver.

use crate::config::RowShape;
use crate::error::{Error, Result};
use crate::protocol::types::{cell_to_value, ColumnDescriptor, Row, StoredRow, Value};
use crate::result::ResultSet;

/// Convert every cell of a stored row, in column order.
pub fn project_values(row: StoredRow, columns: &[ColumnDescriptor]) -> Result<Vec<Value>> {
    if row.len() != columns.len() {
        return Err(Error::protocol_mismatch(format!(
            "stored row has {} cells for {} columns",
            row.len(),
            columns.len()
        )));
    }
    row.cells()
        .iter()
        .zip(columns)
        .map(|(cell, column)| cell_to_value(cell, column.sql_type))
        .collect()
}

/// Project one stored row into the requested shape.
///
/// Named rows keep one entry per distinct name; when a name repeats, the
/// later column's value replaces the earlier one at its first position.
pub fn project_row(row: StoredRow, columns: &[ColumnDescriptor], shape: RowShape) -> Result<Row> {
    let values = project_values(row, columns)?;
    Ok(match shape {
        RowShape::Positional => Row::Positional(values),
        RowShape::Named => {
            let mut entries: Vec<(String, Value)> = Vec::with_capacity(values.len());
            for (column, value) in columns.iter().zip(values) {
                match entries.iter_mut().find(|(name, _)| *name == column.name) {
                    Some(entry) => entry.1 = value,
                    None => entries.push((column.name.clone(), value)),
                }
            }
            Row::Named(entries)
        }
    })
}

/// Build a result set from stored rows.
pub fn project(
    rows: Vec<StoredRow>,
    columns: Vec<ColumnDescriptor>,
    shape: RowShape,
    row_count: i64,
    parameters: Vec<Value>,
) -> Result<ResultSet> {
    let rows = rows
        .into_iter()
        .map(|row| project_row(row, &columns, shape))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResultSet {
        rows,
        columns,
        row_count,
        parameters,
    })
}
