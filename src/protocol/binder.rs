//! Column binder.
//!
//! Describes every result column, picks a bind type and stride for it, and
//! registers a freshly allocated [`RowBatch`] with the statement.

use tracing::debug;

use crate::error::Result;
use crate::protocol::batch::RowBatch;
use crate::protocol::env::StatementContext;
use crate::protocol::handle::StatementHandle;
use crate::protocol::types::{
    plan_column, BindContext, ColumnBinding, ColumnDescriptor, SqlType,
};

/// Describe the current result set. Returns an empty list for statements
/// that produce no result set.
pub fn describe_columns<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    bind: &BindContext,
) -> Result<Vec<ColumnDescriptor>> {
    let count = ctx.call("SQLNumResultCols", |s| s.num_result_cols())?;
    let mut columns = Vec::with_capacity(count as usize);

    for index in 1..=count {
        let described = ctx.call("SQLDescribeCol", |s| s.describe_col(index))?;
        let sql_type = SqlType::from_code(described.data_type);
        let size = sql_type.clamp_column_size(described.column_size);
        let plan = plan_column(sql_type, size, bind);
        let descriptor =
            ColumnDescriptor::new(index, &described, plan.bind_type, plan.stride, plan.long_data);
        debug!(
            column = index,
            name = %descriptor.name,
            sql_type = %descriptor.sql_type,
            bind_type = %descriptor.bind_type,
            stride = descriptor.stride,
            "described column"
        );
        columns.push(descriptor);
    }

    Ok(columns)
}

/// Allocate a batch for `batch_size` rows and bind it to the statement.
pub fn bind_columns<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    columns: &[ColumnDescriptor],
    batch_size: usize,
) -> Result<RowBatch> {
    let bindings: Vec<ColumnBinding> = columns.iter().map(ColumnDescriptor::binding).collect();
    let batch = RowBatch::allocate(&bindings, batch_size)?;
    let rows = batch.capacity();
    ctx.call("SQLSetStmtAttr", |s| s.set_row_array_size(rows))?;
    ctx.call("SQLBindCol", |s| s.bind_columns(&bindings))?;
    debug!(
        columns = bindings.len(),
        rows,
        bytes = batch.bytes_allocated(),
        "bound row batch"
    );
    Ok(batch)
}
