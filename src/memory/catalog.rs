//! Catalog result sets of the in-memory driver, shaped like `SQLTables`,
//! `SQLColumns`, `SQLProcedures` and `SQLProcedureColumns`.

use crate::protocol::constants::{SQL_NO_NULLS, SQL_NULLABLE, SQL_RESULT_COL, SQL_RETURN_VALUE};
use crate::protocol::types::{SqlType, Value};

use super::convert::{matches_pattern, matches_type_list, type_name};
use super::database::{DatabaseState, MemoryColumn, MemoryProcedure};
use super::statement::ResultData;

const NAME_SIZE: usize = 128;
const SQL_PT_PROCEDURE: i64 = 1;

fn name_column(name: &str) -> MemoryColumn {
    MemoryColumn::new(name, SqlType::Varchar).with_size(NAME_SIZE)
}

fn small_column(name: &str) -> MemoryColumn {
    MemoryColumn::new(name, SqlType::SmallInt)
}

fn int_column(name: &str) -> MemoryColumn {
    MemoryColumn::new(name, SqlType::Integer)
}

fn text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn int(value: impl Into<i64>) -> Value {
    Value::Integer(value.into())
}

pub(crate) fn tables(
    state: &DatabaseState,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
    table_type: Option<&str>,
) -> ResultData {
    let columns = vec![
        name_column("TABLE_CAT"),
        name_column("TABLE_SCHEM"),
        name_column("TABLE_NAME").not_null(),
        name_column("TABLE_TYPE").not_null(),
        name_column("REMARKS"),
    ];
    let rows = state
        .tables
        .iter()
        .filter(|t| {
            matches_pattern(catalog, t.catalog.as_deref())
                && matches_pattern(schema, t.schema.as_deref())
                && matches_pattern(table, Some(&t.name))
                && matches_type_list(table_type, &t.table_type)
        })
        .map(|t| {
            vec![
                text(&t.catalog),
                text(&t.schema),
                Value::Text(t.name.clone()),
                Value::Text(t.table_type.clone()),
                Value::Null,
            ]
        })
        .collect();
    ResultData::new(columns, rows)
}

pub(crate) fn columns(
    state: &DatabaseState,
    catalog: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
    column: Option<&str>,
) -> ResultData {
    let columns = vec![
        name_column("TABLE_CAT"),
        name_column("TABLE_SCHEM"),
        name_column("TABLE_NAME").not_null(),
        name_column("COLUMN_NAME").not_null(),
        small_column("DATA_TYPE").not_null(),
        name_column("TYPE_NAME").not_null(),
        int_column("COLUMN_SIZE"),
        int_column("BUFFER_LENGTH"),
        small_column("DECIMAL_DIGITS"),
        small_column("NUM_PREC_RADIX"),
        small_column("NULLABLE").not_null(),
        name_column("REMARKS"),
    ];

    let mut rows = Vec::new();
    for t in &state.tables {
        if !(matches_pattern(catalog, t.catalog.as_deref())
            && matches_pattern(schema, t.schema.as_deref())
            && matches_pattern(table, Some(&t.name)))
        {
            continue;
        }
        for c in t.columns.iter().filter(|c| matches_pattern(column, Some(&c.name))) {
            rows.push(vec![
                text(&t.catalog),
                text(&t.schema),
                Value::Text(t.name.clone()),
                Value::Text(c.name.clone()),
                int(c.sql_type.code()),
                Value::Text(type_name(c.sql_type)),
                int(c.column_size as i64),
                int(c.column_size as i64),
                int(c.decimal_digits),
                radix(c.sql_type),
                int(nullable_code(c.nullable)),
                Value::Null,
            ]);
        }
    }
    ResultData::new(columns, rows)
}

pub(crate) fn procedures(
    state: &DatabaseState,
    catalog: Option<&str>,
    schema: Option<&str>,
    procedure: Option<&str>,
) -> ResultData {
    let columns = vec![
        name_column("PROCEDURE_CAT"),
        name_column("PROCEDURE_SCHEM"),
        name_column("PROCEDURE_NAME").not_null(),
        int_column("NUM_INPUT_PARAMS"),
        int_column("NUM_OUTPUT_PARAMS"),
        int_column("NUM_RESULT_SETS"),
        name_column("REMARKS"),
        small_column("PROCEDURE_TYPE"),
    ];
    let rows = state
        .procedures
        .iter()
        .filter(|p| procedure_matches(p, catalog, schema, procedure))
        .map(|p| {
            let inputs = p.params.iter().filter(|m| !m.direction.is_output()).count();
            let outputs = p.params.len() - inputs;
            vec![
                text(&p.catalog),
                text(&p.schema),
                Value::Text(p.name.clone()),
                int(inputs as i64),
                int(outputs as i64),
                int(i64::from(p.result_table.is_some())),
                Value::Null,
                int(SQL_PT_PROCEDURE),
            ]
        })
        .collect();
    ResultData::new(columns, rows)
}

pub(crate) fn procedure_columns(
    state: &DatabaseState,
    catalog: Option<&str>,
    schema: Option<&str>,
    procedure: Option<&str>,
    column: Option<&str>,
) -> ResultData {
    let columns = vec![
        name_column("PROCEDURE_CAT"),
        name_column("PROCEDURE_SCHEM"),
        name_column("PROCEDURE_NAME").not_null(),
        name_column("COLUMN_NAME").not_null(),
        small_column("COLUMN_TYPE").not_null(),
        small_column("DATA_TYPE").not_null(),
        name_column("TYPE_NAME").not_null(),
        int_column("COLUMN_SIZE"),
        int_column("BUFFER_LENGTH"),
        small_column("DECIMAL_DIGITS"),
        small_column("NUM_PREC_RADIX"),
        small_column("NULLABLE").not_null(),
        name_column("REMARKS"),
    ];

    let mut rows = Vec::new();
    for p in state
        .procedures
        .iter()
        .filter(|p| procedure_matches(p, catalog, schema, procedure))
    {
        let row = |name: &str, column_type: i16, sql_type: SqlType, size: usize, digits: i16| {
            vec![
                text(&p.catalog),
                text(&p.schema),
                Value::Text(p.name.clone()),
                Value::Text(name.to_string()),
                int(column_type),
                int(sql_type.code()),
                Value::Text(type_name(sql_type)),
                int(size as i64),
                int(size as i64),
                int(digits),
                radix(sql_type),
                int(SQL_NULLABLE),
                Value::Null,
            ]
        };

        if let Some(return_type) = p.return_type {
            if matches_pattern(column, Some("@RETURN_VALUE")) {
                rows.push(row("@RETURN_VALUE", SQL_RETURN_VALUE, return_type, 10, 0));
            }
        }
        for m in p.params.iter().filter(|m| matches_pattern(column, Some(&m.name))) {
            rows.push(row(
                &m.name,
                m.direction.code(),
                m.sql_type,
                m.column_size,
                m.decimal_digits,
            ));
        }
        let result_columns = p
            .result_table
            .as_deref()
            .and_then(|name| state.table(name))
            .map(|t| t.columns.as_slice())
            .unwrap_or_default();
        for c in result_columns
            .iter()
            .filter(|c| matches_pattern(column, Some(&c.name)))
        {
            rows.push(row(
                &c.name,
                SQL_RESULT_COL,
                c.sql_type,
                c.column_size,
                c.decimal_digits,
            ));
        }
    }
    ResultData::new(columns, rows)
}

fn procedure_matches(
    p: &MemoryProcedure,
    catalog: Option<&str>,
    schema: Option<&str>,
    procedure: Option<&str>,
) -> bool {
    matches_pattern(catalog, p.catalog.as_deref())
        && matches_pattern(schema, p.schema.as_deref())
        && matches_pattern(procedure, Some(&p.name))
}

fn radix(sql_type: SqlType) -> Value {
    match sql_type {
        SqlType::Float | SqlType::Real | SqlType::Double => int(2),
        SqlType::TinyInt
        | SqlType::SmallInt
        | SqlType::Integer
        | SqlType::BigInt
        | SqlType::Decimal
        | SqlType::Numeric => int(10),
        _ => Value::Null,
    }
}

fn nullable_code(nullable: bool) -> i16 {
    if nullable {
        SQL_NULLABLE
    } else {
        SQL_NO_NULLS
    }
}
