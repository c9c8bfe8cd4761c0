//! Fetch engine.
//!
//! Drives batch fetches over a bound [`RowBatch`] and copies every present
//! row into an owned [`StoredRow`] before the batch is reused.
//!
//! ```text
//! Ready -> Fetching -> BatchAvailable -> Fetching -> ... -> Exhausted
//!                   \-> Error
//! ```
//!
//! End of result is reached when the driver reports no data, or when the last
//! slot of a batch is unused. Once exhausted the engine never calls the driver
//! again and every further fetch yields an empty batch.

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::error::{DiagnosticRecord, Diagnostics, Error, Result};
use crate::protocol::batch::{ColumnBuffer, RowBatch, RowStatus};
use crate::protocol::binder::{bind_columns, describe_columns};
use crate::protocol::buffer::{alloc_zeroed, Indicator};
use crate::protocol::constants::{
    SQLSTATE_FRACTIONAL_TRUNCATION, SQLSTATE_NUMERIC_OUT_OF_RANGE, SQLSTATE_STRING_TRUNCATED,
};
use crate::protocol::decode::text_room;
use crate::protocol::env::StatementContext;
use crate::protocol::handle::{FetchOutcome, GetDataOutcome, StatementHandle};
use crate::protocol::types::{
    read_cell, BindContext, BindType, Cell, ColumnDescriptor, StoredRow,
};

/// Fetch engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Ready,
    Fetching,
    BatchAvailable,
    Exhausted,
    Error,
}

/// Batch fetch loop over one bound result set.
#[derive(Debug)]
pub struct FetchEngine {
    columns: Vec<ColumnDescriptor>,
    batch: Option<RowBatch>,
    state: FetchState,
    chunk_size: usize,
    fetch_calls: usize,
    rows_delivered: usize,
}

impl FetchEngine {
    pub fn new(columns: Vec<ColumnDescriptor>, batch: RowBatch, chunk_size: usize) -> Self {
        Self {
            columns,
            batch: Some(batch),
            state: FetchState::Ready,
            chunk_size,
            fetch_calls: 0,
            rows_delivered: 0,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == FetchState::Exhausted
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<ColumnDescriptor> {
        self.columns
    }

    /// Rows per batch, or 0 once buffers have been released.
    pub fn batch_size(&self) -> usize {
        self.batch.as_ref().map_or(0, RowBatch::capacity)
    }

    /// Driver fetch calls issued so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls
    }

    pub fn rows_delivered(&self) -> usize {
        self.rows_delivered
    }

    /// Whether bound buffers are still held.
    pub fn holds_buffers(&self) -> bool {
        self.batch.is_some()
    }

    /// Drop the bound buffers.
    pub fn release(&mut self) {
        if self.batch.take().is_some() {
            trace!("released row batch");
        }
    }

    /// Fetch one batch. Either every present row of the batch is returned, or
    /// an error and no rows.
    pub fn fetch_batch<S: StatementHandle>(
        &mut self,
        ctx: &mut StatementContext<S>,
    ) -> Result<Vec<StoredRow>> {
        if self.state == FetchState::Exhausted {
            return Ok(Vec::new());
        }
        match self.fetch_batch_inner(ctx) {
            Ok(rows) => Ok(rows),
            Err(e) => {
                self.state = FetchState::Error;
                Err(e)
            }
        }
    }

    /// Drain the result. Rows gathered before an error are discarded.
    pub fn fetch_all<S: StatementHandle>(
        &mut self,
        ctx: &mut StatementContext<S>,
    ) -> Result<Vec<StoredRow>> {
        let mut rows = Vec::new();
        while !self.is_exhausted() {
            rows.extend(self.fetch_batch(ctx)?);
        }
        Ok(rows)
    }

    fn fetch_batch_inner<S: StatementHandle>(
        &mut self,
        ctx: &mut StatementContext<S>,
    ) -> Result<Vec<StoredRow>> {
        let batch = self.batch.as_mut().ok_or(Error::ResourceInvalid {
            resource: "row batch",
        })?;
        batch.reset();
        self.state = FetchState::Fetching;
        self.fetch_calls += 1;

        let outcome = ctx.call("SQLFetch", |s| s.fetch(batch))?;
        if outcome == FetchOutcome::NoData {
            trace!(fetch_calls = self.fetch_calls, "no more data");
            self.finish();
            return Ok(Vec::new());
        }

        let rows = copy_out(ctx, batch, &self.columns, self.chunk_size, self.rows_delivered)?;
        let ended = batch.last_slot_empty();
        self.rows_delivered += rows.len();
        trace!(
            rows = rows.len(),
            capacity = batch.capacity(),
            ended,
            "fetched batch"
        );

        if ended {
            self.finish();
        } else {
            self.state = FetchState::BatchAvailable;
        }
        Ok(rows)
    }

    fn finish(&mut self) {
        self.state = FetchState::Exhausted;
        self.release();
        debug!(
            rows = self.rows_delivered,
            fetch_calls = self.fetch_calls,
            "result exhausted"
        );
    }
}

fn copy_out<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    batch: &RowBatch,
    columns: &[ColumnDescriptor],
    chunk_size: usize,
    first_row: usize,
) -> Result<Vec<StoredRow>> {
    let mut rows = Vec::with_capacity(batch.rows_fetched());

    // Warnings must be read before any long-data call replaces them.
    let warnings = if batch.row_status().contains(&RowStatus::SuccessWithInfo) {
        ctx.inspect(|s| s.diagnostics())?
    } else {
        Diagnostics::default()
    };

    for (slot, status) in batch.row_status().iter().enumerate() {
        match status {
            RowStatus::NoRow => continue,
            RowStatus::Error => {
                let diagnostics = ctx.inspect(|s| s.diagnostics())?;
                return Err(Error::driver("SQLFetch", diagnostics));
            }
            RowStatus::Success | RowStatus::SuccessWithInfo => {}
        }

        let mut cells = Vec::with_capacity(columns.len());
        let mut explained = false;
        for (buffer, column) in batch.columns().iter().zip(columns) {
            let (cell, truncated) = copy_cell(ctx, buffer, column, slot, chunk_size)?;
            explained |= truncated;
            cells.push(cell);
        }

        if *status == RowStatus::SuccessWithInfo {
            if let Some(column) = lost_data(&warnings, slot, columns, explained) {
                return Err(Error::DataTruncated {
                    column,
                    row: first_row + rows.len(),
                });
            }
        }

        rows.push(StoredRow::new(cells));
    }

    Ok(rows)
}

/// Name the column of a row that lost data, if any did.
///
/// String truncation (01004) is recovered by long-data reads. Fractional
/// truncation (01S07) and out-of-range values (22003) are not. A warning
/// with no record and no truncated variable-length cell behind it is taken
/// to be a fixed-size value that lost data.
fn lost_data(
    warnings: &Diagnostics,
    slot: usize,
    columns: &[ColumnDescriptor],
    explained: bool,
) -> Option<String> {
    let column_name = |index: Option<u16>| {
        index
            .and_then(|i| columns.iter().find(|c| c.index == i))
            .or_else(|| columns.iter().find(|c| !c.bind_type.is_variable()))
            .or(columns.first())
            .map(|c| c.name.clone())
            .unwrap_or_default()
    };

    let about_row = |r: &&DiagnosticRecord| r.row.map_or(true, |row| row == slot + 1);
    let mut records = warnings.records().iter().filter(about_row).peekable();
    if records.peek().is_none() {
        return (!explained).then(|| column_name(None));
    }

    let mut string_truncation = false;
    for record in records {
        match record.state.as_str() {
            SQLSTATE_FRACTIONAL_TRUNCATION | SQLSTATE_NUMERIC_OUT_OF_RANGE => {
                return Some(column_name(record.column));
            }
            SQLSTATE_STRING_TRUNCATED => string_truncation = true,
            _ => {}
        }
    }
    (!explained && !string_truncation).then(|| column_name(None))
}

/// Copy one cell. The flag reports whether the slot held only part of it.
fn copy_cell<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    buffer: &ColumnBuffer,
    column: &ColumnDescriptor,
    row: usize,
    chunk_size: usize,
) -> Result<(Cell, bool)> {
    let bind = buffer.bind_type();
    let indicator = buffer.indicator(row);
    if indicator.is_null() {
        return Ok((Cell::Null, false));
    }

    let slot = buffer.slot(row);
    if !bind.is_variable() {
        return Ok((read_cell(bind, slot)?, false));
    }

    let room = text_room(slot.len(), bind);
    match indicator {
        Indicator::Length(n) if n <= room => Ok((read_cell(bind, &slot[..n])?, false)),
        _ => {
            let data = read_long_data(ctx, row, column.index, bind, &slot[..room], chunk_size)?;
            let cell = if bind == BindType::Binary {
                Cell::Bytes(data.freeze())
            } else {
                read_cell(bind, &data)?
            };
            Ok((cell, true))
        }
    }
}

/// Complete a truncated value with chunked reads, starting after `head`.
fn read_long_data<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    row: usize,
    column: u16,
    bind: BindType,
    head: &[u8],
    chunk_size: usize,
) -> Result<BytesMut> {
    let mut data = BytesMut::with_capacity(head.len() + chunk_size);
    data.extend_from_slice(head);
    let mut chunk = alloc_zeroed(chunk_size, "long data chunk")?;
    let room = text_room(chunk.len(), bind);
    let mut chunks = 0usize;

    loop {
        let offset = data.len();
        let outcome = ctx.call("SQLGetData", |s| {
            s.get_data(row, column, bind, offset, &mut chunk)
        })?;
        let got = match outcome {
            GetDataOutcome::NoData | GetDataOutcome::Data(Indicator::Null) => break,
            GetDataOutcome::Data(Indicator::Length(remaining)) => {
                let got = remaining.min(room);
                data.extend_from_slice(&chunk[..got]);
                chunks += 1;
                if remaining <= room {
                    break;
                }
                got
            }
            GetDataOutcome::Data(Indicator::NoTotal) => {
                data.extend_from_slice(&chunk[..room]);
                chunks += 1;
                room
            }
        };
        if got == 0 {
            break;
        }
    }

    trace!(column, row, bytes = data.len(), chunks, "read long data");
    Ok(data)
}

/// A fully drained result set.
#[derive(Debug)]
pub struct Materialized {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<StoredRow>,
}

/// Describe, bind and drain the statement's current result set, then close
/// its cursor. Statements without a result set yield no columns.
pub fn drain_result<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    bind: &BindContext,
    batch_size: usize,
) -> Result<Materialized> {
    let columns = describe_columns(ctx, bind)?;
    drain_columns(ctx, columns, bind.chunk_size, batch_size)
}

/// Bind already described columns and drain the result set, then close its
/// cursor.
pub fn drain_columns<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    columns: Vec<ColumnDescriptor>,
    chunk_size: usize,
    batch_size: usize,
) -> Result<Materialized> {
    if columns.is_empty() {
        return Ok(Materialized {
            columns,
            rows: Vec::new(),
        });
    }

    let batch = bind_columns(ctx, &columns, batch_size)?;
    let mut engine = FetchEngine::new(columns, batch, chunk_size);
    let rows = engine.fetch_all(ctx)?;
    ctx.call("SQLCloseCursor", |s| s.close_cursor())?;
    engine.release();

    Ok(Materialized {
        columns: engine.into_columns(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{DescribedColumn, SqlType};

    fn columns() -> Vec<ColumnDescriptor> {
        let id = DescribedColumn::new("ID", SqlType::Integer.code());
        let body = DescribedColumn::new("BODY", SqlType::LongVarchar.code()).with_size(5000);
        vec![
            ColumnDescriptor::new(1, &id, BindType::SBigInt, 8, false),
            ColumnDescriptor::new(2, &body, BindType::Char, 1025, true),
        ]
    }

    #[test]
    fn test_string_truncation_is_recovered() {
        let warnings = Diagnostics::new(vec![
            DiagnosticRecord::new(SQLSTATE_STRING_TRUNCATED, 0, "String data").at(1, 2),
        ]);
        assert_eq!(lost_data(&warnings, 0, &columns(), true), None);
    }

    #[test]
    fn test_fractional_truncation_beside_long_text() {
        let warnings = Diagnostics::new(vec![
            DiagnosticRecord::new(SQLSTATE_FRACTIONAL_TRUNCATION, 0, "Fractional").at(2, 1),
            DiagnosticRecord::new(SQLSTATE_STRING_TRUNCATED, 0, "String data").at(2, 2),
        ]);
        assert_eq!(lost_data(&warnings, 0, &columns(), true), None);
        assert_eq!(
            lost_data(&warnings, 1, &columns(), true),
            Some("ID".to_string())
        );
    }

    #[test]
    fn test_unexplained_warning() {
        let none = Diagnostics::default();
        assert_eq!(lost_data(&none, 0, &columns(), false), Some("ID".to_string()));
        assert_eq!(lost_data(&none, 0, &columns(), true), None);

        let unpositioned = Diagnostics::single(SQLSTATE_NUMERIC_OUT_OF_RANGE, 0, "Out of range");
        assert_eq!(
            lost_data(&unpositioned, 3, &columns(), true),
            Some("ID".to_string())
        );
    }
}
