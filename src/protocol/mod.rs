//! Marshaling engine between caller values and a call-level database driver.

pub mod batch;
pub mod binder;
pub mod buffer;
pub mod catalog;
pub mod constants;
pub mod decode;
pub mod env;
pub mod fetch;
pub mod handle;
pub mod marshal;
pub mod projector;
pub mod types;

pub use batch::{ColumnBuffer, RowBatch, RowStatus};
pub use buffer::{Indicator, ReadBuffer, WriteBuffer};
pub use catalog::ProcedureParameter;
pub use env::{EnvironmentLock, Liveness, StatementContext};
pub use fetch::{FetchEngine, FetchState};
pub use handle::{
    DriverCapabilities, DriverResult, FetchOutcome, GetDataOutcome, SessionHandle,
    StatementHandle,
};
pub use types::{
    BindType, Cell, ColumnBinding, ColumnDescriptor, DescribedColumn, Nullability,
    ParamDirection, ParameterDescriptor, ParameterSet, Row, SqlType, StoredRow, Value,
};
