//! Rows copied out of a row batch.
//!
//! A [`StoredRow`] owns all of its data, so the batch it came from can be
//! overwritten by the next fetch.

use bytes::Bytes;

use crate::protocol::decode::DateTimeFields;

/// One materialized cell, discriminated by the bind type it was read as.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Double(f64),
    Bit(bool),
    Text(String),
    Bytes(Bytes),
    DateTime(DateTimeFields),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Snapshot of one fetched row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredRow {
    cells: Vec<Cell>,
}

impl StoredRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
