//! Driver seam.
//!
//! The call-level interface is reached through two traits: a live session and
//! the statements allocated on it. Buffers are handed to the driver at call
//! time, so no raw pointer registration outlives a borrow.
//!
//! Failures are reported as [`Diagnostics`]; the engine wraps them into
//! [`Error::Driver`](crate::Error::Driver) together with the failing call.

use std::time::Duration;

use crate::error::Diagnostics;
use crate::protocol::batch::RowBatch;
use crate::protocol::buffer::Indicator;
use crate::protocol::types::{BindType, ColumnBinding, DescribedColumn, ParameterSet};

/// Result of a driver call.
pub type DriverResult<T> = std::result::Result<T, Diagnostics>;

/// Features that change bind decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// Whether approximate and exact numerics can be bound as `SQL_C_DOUBLE`.
    pub supports_double_bind: bool,
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self {
            supports_double_bind: true,
        }
    }
}

/// Outcome of a batch fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Rows were written into the batch; the count is the number of slots used.
    Rows(usize),
    /// The result set has no more rows.
    NoData,
}

/// Outcome of a chunked `get_data` read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetDataOutcome {
    /// Bytes were written; the indicator gives the bytes remaining from the
    /// requested offset (or `NoTotal`).
    Data(Indicator),
    /// Nothing remains at or after the offset.
    NoData,
}

/// An opened, live session.
pub trait SessionHandle: Send + 'static {
    type Statement: StatementHandle;

    fn capabilities(&self) -> DriverCapabilities;

    /// Allocate a statement. Called with the environment lock held.
    fn alloc_statement(&mut self) -> DriverResult<Self::Statement>;

    fn set_connection_timeout(&mut self, timeout: Duration) -> DriverResult<()>;

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()>;

    /// Commit (`true`) or roll back (`false`) the current transaction.
    fn end_transaction(&mut self, commit: bool) -> DriverResult<()>;

    fn disconnect(&mut self) -> DriverResult<()>;
}

/// A statement allocated on a session.
pub trait StatementHandle: Send + 'static {
    fn set_cursor_name(&mut self, name: &str) -> DriverResult<()>;

    fn set_query_timeout(&mut self, timeout: Duration) -> DriverResult<()>;

    fn prepare(&mut self, sql: &str) -> DriverResult<()>;

    /// Number of parameter markers in the prepared statement.
    fn num_params(&mut self) -> DriverResult<u16>;

    /// Execute the prepared statement. Output parameters are written back
    /// into `params`.
    fn execute(&mut self, params: &mut ParameterSet) -> DriverResult<()>;

    fn num_result_cols(&mut self) -> DriverResult<u16>;

    /// Describe a result column (1-based).
    fn describe_col(&mut self, column: u16) -> DriverResult<DescribedColumn>;

    /// Register column bindings for the following fetches.
    fn bind_columns(&mut self, bindings: &[ColumnBinding]) -> DriverResult<()>;

    fn set_row_array_size(&mut self, rows: usize) -> DriverResult<()>;

    /// Fetch the next rows into `batch`, filling statuses and indicators.
    fn fetch(&mut self, batch: &mut RowBatch) -> DriverResult<FetchOutcome>;

    /// Read part of a variable-length value of the current batch, starting
    /// at byte `offset`. Character data is terminated within `buf`.
    fn get_data(
        &mut self,
        row: usize,
        column: u16,
        bind_type: BindType,
        offset: usize,
        buf: &mut [u8],
    ) -> DriverResult<GetDataOutcome>;

    /// Rows affected by the last DML statement.
    fn row_count(&mut self) -> DriverResult<i64>;

    fn close_cursor(&mut self) -> DriverResult<()>;

    /// Diagnostics for the last call that reported per-row errors.
    fn diagnostics(&mut self) -> Diagnostics;

    fn tables(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        table_type: Option<&str>,
    ) -> DriverResult<()>;

    fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> DriverResult<()>;

    fn procedures(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: Option<&str>,
    ) -> DriverResult<()>;

    fn procedure_columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: Option<&str>,
        column: Option<&str>,
    ) -> DriverResult<()>;

    /// Free the statement. Called with the environment lock held.
    fn free(&mut self) -> DriverResult<()>;
}
