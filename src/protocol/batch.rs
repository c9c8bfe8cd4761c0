//! Row batches: bound column buffers for array fetch.
//!
//! Each column owns one contiguous buffer of `stride * capacity` bytes and a
//! parallel array of length/indicator cells. The batch also owns the row
//! status array a fetch call fills. Dropping the batch releases everything.

use crate::error::{Error, Result};
use crate::protocol::buffer::{alloc_zeroed, Indicator};
use crate::protocol::constants::*;
use crate::protocol::types::{BindType, ColumnBinding};

/// Per-row outcome of a batch fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Success,
    /// Fetched, but the driver reported a warning (usually truncation).
    SuccessWithInfo,
    Error,
    /// Slot unused: fewer rows remained than the batch holds.
    NoRow,
}

impl RowStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            SQL_ROW_SUCCESS => RowStatus::Success,
            SQL_ROW_SUCCESS_WITH_INFO => RowStatus::SuccessWithInfo,
            SQL_ROW_ERROR => RowStatus::Error,
            _ => RowStatus::NoRow,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            RowStatus::Success => SQL_ROW_SUCCESS,
            RowStatus::SuccessWithInfo => SQL_ROW_SUCCESS_WITH_INFO,
            RowStatus::Error => SQL_ROW_ERROR,
            RowStatus::NoRow => SQL_ROW_NOROW,
        }
    }

    /// Whether the slot holds a row to copy out.
    pub fn is_present(&self) -> bool {
        matches!(self, RowStatus::Success | RowStatus::SuccessWithInfo)
    }
}

/// Bound buffer for one column.
#[derive(Debug)]
pub struct ColumnBuffer {
    column: u16,
    bind_type: BindType,
    stride: usize,
    data: Vec<u8>,
    indicators: Vec<isize>,
}

impl ColumnBuffer {
    fn allocate(binding: &ColumnBinding, capacity: usize) -> Result<Self> {
        let len = binding
            .stride
            .checked_mul(capacity)
            .ok_or_else(|| Error::allocation(usize::MAX, "column buffer"))?;
        let data = alloc_zeroed(len, "column buffer")?;
        let mut indicators = Vec::new();
        indicators
            .try_reserve_exact(capacity)
            .map_err(|_| {
                Error::allocation(
                    capacity * std::mem::size_of::<isize>(),
                    "indicator array",
                )
            })?;
        indicators.resize(capacity, SQL_NULL_DATA);
        Ok(Self {
            column: binding.column,
            bind_type: binding.bind_type,
            stride: binding.stride,
            data,
            indicators,
        })
    }

    /// 1-based column ordinal.
    pub fn column(&self) -> u16 {
        self.column
    }

    pub fn bind_type(&self) -> BindType {
        self.bind_type
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Slot for one row.
    pub fn slot(&self, row: usize) -> &[u8] {
        &self.data[row * self.stride..(row + 1) * self.stride]
    }

    pub fn slot_mut(&mut self, row: usize) -> &mut [u8] {
        &mut self.data[row * self.stride..(row + 1) * self.stride]
    }

    pub fn indicator(&self, row: usize) -> Indicator {
        Indicator::from_raw(self.indicators[row])
    }

    pub fn set_indicator(&mut self, row: usize, indicator: Indicator) {
        self.indicators[row] = indicator.to_raw();
    }

    fn bytes_allocated(&self) -> usize {
        self.data.len() + self.indicators.len() * std::mem::size_of::<isize>()
    }
}

/// Buffers for one batch of rows.
#[derive(Debug)]
pub struct RowBatch {
    columns: Vec<ColumnBuffer>,
    row_status: Vec<RowStatus>,
    rows_fetched: usize,
    capacity: usize,
}

impl RowBatch {
    /// Allocate buffers for `capacity` rows of the given bindings.
    pub fn allocate(bindings: &[ColumnBinding], capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        let columns = bindings
            .iter()
            .map(|b| ColumnBuffer::allocate(b, capacity))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns,
            row_status: vec![RowStatus::NoRow; capacity],
            rows_fetched: 0,
            capacity,
        })
    }

    /// Rows per batch.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn columns(&self) -> &[ColumnBuffer] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnBuffer> {
        self.columns.get(index)
    }

    pub fn columns_mut(&mut self) -> &mut [ColumnBuffer] {
        &mut self.columns
    }

    pub fn row_status(&self) -> &[RowStatus] {
        &self.row_status
    }

    pub fn set_row_status(&mut self, row: usize, status: RowStatus) {
        self.row_status[row] = status;
    }

    /// Rows the driver reported for the last fetch.
    pub fn rows_fetched(&self) -> usize {
        self.rows_fetched
    }

    pub fn set_rows_fetched(&mut self, rows: usize) {
        self.rows_fetched = rows;
    }

    /// Prepare for the next fetch: every slot unused, every indicator NULL.
    pub fn reset(&mut self) {
        self.rows_fetched = 0;
        self.row_status.fill(RowStatus::NoRow);
        for column in &mut self.columns {
            column.indicators.fill(SQL_NULL_DATA);
        }
    }

    /// Whether the last slot of the batch went unused.
    pub fn last_slot_empty(&self) -> bool {
        self.row_status
            .last()
            .map_or(true, |status| *status == RowStatus::NoRow)
    }

    pub fn bytes_allocated(&self) -> usize {
        self.columns.iter().map(ColumnBuffer::bytes_allocated).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Vec<ColumnBinding> {
        vec![
            ColumnBinding {
                column: 1,
                bind_type: BindType::SBigInt,
                stride: 8,
            },
            ColumnBinding {
                column: 2,
                bind_type: BindType::Char,
                stride: 41,
            },
        ]
    }

    #[test]
    fn test_allocate_sizes() {
        let batch = RowBatch::allocate(&bindings(), 3).unwrap();
        assert_eq!(batch.capacity(), 3);
        assert_eq!(batch.columns().len(), 2);
        assert_eq!(batch.column(1).unwrap().slot(2).len(), 41);
        assert_eq!(
            batch.bytes_allocated(),
            (8 + 41) * 3 + 2 * 3 * std::mem::size_of::<isize>()
        );
        assert!(batch.row_status().iter().all(|s| *s == RowStatus::NoRow));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let batch = RowBatch::allocate(&bindings(), 0).unwrap();
        assert_eq!(batch.capacity(), 1);
    }

    #[test]
    fn test_slots_are_disjoint() {
        let mut batch = RowBatch::allocate(&bindings(), 2).unwrap();
        let col = &mut batch.columns_mut()[0];
        col.slot_mut(1).copy_from_slice(&7i64.to_ne_bytes());
        col.set_indicator(1, Indicator::Length(8));
        assert_eq!(col.slot(0), &[0u8; 8]);
        assert_eq!(col.slot(1), &7i64.to_ne_bytes());
        assert_eq!(col.indicator(0), Indicator::Null);
        assert_eq!(col.indicator(1), Indicator::Length(8));
    }

    #[test]
    fn test_reset_clears_statuses() {
        let mut batch = RowBatch::allocate(&bindings(), 2).unwrap();
        batch.set_row_status(0, RowStatus::Success);
        batch.set_row_status(1, RowStatus::Success);
        batch.set_rows_fetched(2);
        batch.columns_mut()[1].set_indicator(0, Indicator::Length(3));
        assert!(!batch.last_slot_empty());

        batch.reset();
        assert_eq!(batch.rows_fetched(), 0);
        assert!(batch.last_slot_empty());
        assert_eq!(batch.column(1).unwrap().indicator(0), Indicator::Null);
    }

    #[test]
    fn test_row_status_codes() {
        for status in [
            RowStatus::Success,
            RowStatus::SuccessWithInfo,
            RowStatus::Error,
            RowStatus::NoRow,
        ] {
            assert_eq!(RowStatus::from_code(status.code()), status);
        }
        assert!(RowStatus::SuccessWithInfo.is_present());
        assert!(!RowStatus::Error.is_present());
    }
}
