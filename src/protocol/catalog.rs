//! Catalog functions.
//!
//! Table, column and procedure metadata come back from the driver as ordinary
//! result sets and are drained through the fetch engine like any query.

use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::env::StatementContext;
use crate::protocol::fetch::{drain_result, Materialized};
use crate::protocol::handle::StatementHandle;
use crate::protocol::types::{
    BindContext, Cell, Nullability, ParamDirection, SqlType, StoredRow,
};

/// Batch size used when draining catalog result sets.
pub const CATALOG_FETCH_SIZE: usize = 64;

// Result columns of SQLProcedureColumns (0-based)
const PROC_COLUMN_NAME: usize = 3;
const PROC_COLUMN_TYPE: usize = 4;
const PROC_DATA_TYPE: usize = 5;
const PROC_COLUMN_SIZE: usize = 7;
const PROC_DECIMAL_DIGITS: usize = 9;
const PROC_NULLABLE: usize = 11;

/// A procedure parameter as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureParameter {
    pub name: String,
    pub direction: ParamDirection,
    pub sql_type: SqlType,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: Nullability,
}

/// `SQLTables` as a drained result set.
pub fn list_tables<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    bind: &BindContext,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
    table_type: Option<&str>,
) -> Result<Materialized> {
    ctx.call("SQLTables", |s| s.tables(catalog, schema, table, table_type))?;
    drain_result(ctx, bind, CATALOG_FETCH_SIZE)
}

/// `SQLColumns` as a drained result set.
pub fn list_columns<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    bind: &BindContext,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
    column: Option<&str>,
) -> Result<Materialized> {
    ctx.call("SQLColumns", |s| s.columns(catalog, schema, table, column))?;
    drain_result(ctx, bind, CATALOG_FETCH_SIZE)
}

/// Whether the catalog knows a procedure by this name.
pub fn find_procedure<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    bind: &BindContext,
    catalog: Option<&str>,
    schema: Option<&str>,
    name: &str,
) -> Result<bool> {
    ctx.call("SQLProcedures", |s| s.procedures(catalog, schema, Some(name)))?;
    let found = drain_result(ctx, bind, CATALOG_FETCH_SIZE)?;
    Ok(!found.rows.is_empty())
}

/// Parameters of a procedure in ordinal order. Result-set columns and return
/// values are not parameters and are skipped.
pub fn procedure_parameters<S: StatementHandle>(
    ctx: &mut StatementContext<S>,
    bind: &BindContext,
    catalog: Option<&str>,
    schema: Option<&str>,
    name: &str,
) -> Result<Vec<ProcedureParameter>> {
    ctx.call("SQLProcedureColumns", |s| {
        s.procedure_columns(catalog, schema, Some(name), None)
    })?;
    let described = drain_result(ctx, bind, CATALOG_FETCH_SIZE)?;

    let mut params = Vec::with_capacity(described.rows.len());
    for row in &described.rows {
        if let Some(param) = parse_parameter(row)? {
            params.push(param);
        }
    }
    debug!(procedure = name, params = params.len(), "described procedure");
    Ok(params)
}

fn parse_parameter(row: &StoredRow) -> Result<Option<ProcedureParameter>> {
    let column_type = int_at(row, PROC_COLUMN_TYPE)?.unwrap_or(0);
    let Some(direction) = ParamDirection::from_code(column_type as i16) else {
        return Ok(None);
    };
    let data_type = int_at(row, PROC_DATA_TYPE)?.unwrap_or(0);

    Ok(Some(ProcedureParameter {
        name: text_at(row, PROC_COLUMN_NAME)?.unwrap_or_default(),
        direction,
        sql_type: SqlType::from_code(data_type as i16),
        column_size: int_at(row, PROC_COLUMN_SIZE)?.unwrap_or(0).max(0) as usize,
        decimal_digits: int_at(row, PROC_DECIMAL_DIGITS)?.unwrap_or(0) as i16,
        nullable: Nullability::from_code(
            int_at(row, PROC_NULLABLE)?.unwrap_or(i64::from(Nullability::Unknown.code())) as i16,
        ),
    }))
}

fn cell_at(row: &StoredRow, index: usize) -> Result<&Cell> {
    row.get(index).ok_or_else(|| {
        Error::protocol_mismatch(format!(
            "catalog row has {} columns, expected at least {}",
            row.len(),
            index + 1
        ))
    })
}

fn int_at(row: &StoredRow, index: usize) -> Result<Option<i64>> {
    match cell_at(row, index)? {
        Cell::Null => Ok(None),
        Cell::Integer(v) => Ok(Some(*v)),
        Cell::Double(v) => Ok(Some(*v as i64)),
        Cell::Text(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::type_conversion(format!("catalog value {:?} is not an integer", s))),
        other => Err(Error::type_conversion(format!(
            "unexpected catalog cell {:?}",
            other
        ))),
    }
}

fn text_at(row: &StoredRow, index: usize) -> Result<Option<String>> {
    match cell_at(row, index)? {
        Cell::Null => Ok(None),
        Cell::Text(s) => Ok(Some(s.clone())),
        Cell::Integer(v) => Ok(Some(v.to_string())),
        other => Err(Error::type_conversion(format!(
            "unexpected catalog cell {:?}",
            other
        ))),
    }
}

/// Escape-clause call text, e.g. `{ CALL sales.report(?, ?) }`.
pub fn call_text(catalog: Option<&str>, schema: Option<&str>, name: &str, params: usize) -> String {
    let qualified: Vec<&str> = [catalog, schema, Some(name)]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
    let markers = vec!["?"; params].join(", ");
    format!("{{ CALL {}({}) }}", qualified.join("."), markers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: Vec<Cell>) -> StoredRow {
        StoredRow::new(cells)
    }

    fn param_row(name: &str, column_type: i64, data_type: i64, size: Cell) -> StoredRow {
        row(vec![
            Cell::Null,
            Cell::Text("dbo".to_string()),
            Cell::Text("proc".to_string()),
            Cell::Text(name.to_string()),
            Cell::Integer(column_type),
            Cell::Integer(data_type),
            Cell::Text("VARCHAR".to_string()),
            size,
            Cell::Null,
            Cell::Integer(2),
            Cell::Integer(10),
            Cell::Integer(1),
            Cell::Null,
        ])
    }

    #[test]
    fn test_parse_parameter() {
        let p = parse_parameter(&param_row("@x", 2, 12, Cell::Integer(40)))
            .unwrap()
            .unwrap();
        assert_eq!(p.name, "@x");
        assert_eq!(p.direction, ParamDirection::InOut);
        assert_eq!(p.sql_type, SqlType::Varchar);
        assert_eq!(p.column_size, 40);
        assert_eq!(p.decimal_digits, 2);
        assert_eq!(p.nullable, Nullability::Nullable);
    }

    #[test]
    fn test_result_columns_are_skipped() {
        assert!(parse_parameter(&param_row("col", 3, 4, Cell::Null))
            .unwrap()
            .is_none());
        assert!(parse_parameter(&param_row("ret", 5, 4, Cell::Null))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_null_size_is_zero() {
        let p = parse_parameter(&param_row("b", 4, -3, Cell::Null))
            .unwrap()
            .unwrap();
        assert_eq!(p.direction, ParamDirection::Out);
        assert_eq!(p.column_size, 0);
    }

    #[test]
    fn test_short_row_is_rejected() {
        let err = parse_parameter(&row(vec![Cell::Null])).unwrap_err();
        assert!(matches!(err, Error::ProtocolMismatch { .. }));
    }

    #[test]
    fn test_call_text() {
        assert_eq!(
            call_text(Some("db"), Some("dbo"), "report", 2),
            "{ CALL db.dbo.report(?, ?) }"
        );
        assert_eq!(call_text(None, Some(""), "ping", 0), "{ CALL ping() }");
    }
}
