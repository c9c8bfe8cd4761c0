//! Data types shared by the binder, fetch engine, marshaler and projector.

mod bind_type;
mod column;
mod conversion;
mod metadata;
mod parameter;
mod row;
mod sql_type;
mod stored;
mod value;

pub use bind_type::BindType;
pub use column::{find_column, ColumnBinding, ColumnDescriptor, Nullability};
pub use conversion::{
    cell_to_value, encoded_len, numeric_text_stride, plan_column, read_cell, read_value,
    render_text, text_stride, write_value, BindContext, BindPlan, WriteOutcome,
};
pub use metadata::DescribedColumn;
pub use parameter::{ParamDirection, ParamPhase, ParameterDescriptor, ParameterSet, ResolvedShape};
pub use row::Row;
pub use sql_type::{SqlType, TypeFamily};
pub use stored::{Cell, StoredRow};
pub use value::Value;
