//! Integration tests for stored procedure calls against the in-memory driver.

use odbc_bridge_rs::memory::{
    MemoryColumn, MemoryDatabase, MemoryParam, MemoryProcedure, MemorySession, MemoryTable,
};
use odbc_bridge_rs::{
    Connection, Error, ErrorKind, ParamDirection, RowShape, SessionOptions, SqlType, Value,
};

fn database() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_procedure(
        MemoryProcedure::new("add_tax", |args| {
            let amount = args[0].to_f64().unwrap_or(0.0);
            let rate = args[1].to_f64().unwrap_or(0.0);
            let counter = args[3].to_i64().unwrap_or(0);
            vec![
                Value::Null,
                Value::Null,
                Value::Double(amount * (1.0 + rate)),
                Value::Integer(counter + 1),
            ]
        })
        .with_schema("billing")
        .with_return_value(SqlType::Integer)
        .with_param(MemoryParam::new("@amount", ParamDirection::In, SqlType::Double))
        .with_param(MemoryParam::new("@rate", ParamDirection::In, SqlType::Double))
        .with_param(MemoryParam::new("@total", ParamDirection::Out, SqlType::Double))
        .with_param(MemoryParam::new(
            "@counter",
            ParamDirection::InOut,
            SqlType::Integer,
        )),
    );
    db.create_procedure(
        MemoryProcedure::new("greet", |args| {
            let name = args[0].as_str().unwrap_or("").to_string();
            vec![Value::Null, Value::Text(format!("hello, {}", name))]
        })
        .with_param(MemoryParam::new("@name", ParamDirection::In, SqlType::Varchar).with_size(20))
        .with_param(
            MemoryParam::new("@greeting", ParamDirection::Out, SqlType::Varchar).with_size(40),
        ),
    );
    db
}

fn connect(db: &MemoryDatabase, options: SessionOptions) -> Connection<MemorySession> {
    Connection::new(db.connect(), options).expect("connection")
}

#[tokio::test]
async fn test_out_and_inout_parameters() {
    let db = database();
    let conn = connect(&db, SessionOptions::new());

    let results = conn
        .call_procedure(
            None,
            Some("billing"),
            "add_tax",
            vec![
                Value::Double(100.0),
                Value::Double(0.25),
                Value::Null,
                Value::Integer(41),
            ],
        )
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(
        results.parameters,
        vec![
            Value::Double(100.0),
            Value::Double(0.25),
            Value::Double(125.0),
            Value::Integer(42),
        ]
    );
    assert_eq!(db.stats().open_statements(), 0);
}

#[tokio::test]
async fn test_output_text_longer_than_input() {
    let db = database();
    let conn = connect(&db, SessionOptions::new());

    let results = conn
        .call_procedure(None, None, "greet", vec![Value::from("ada"), Value::from("")])
        .await
        .unwrap();
    assert_eq!(results.parameters[0], Value::from("ada"));
    assert_eq!(results.parameters[1], Value::from("hello, ada"));
}

#[tokio::test]
async fn test_procedure_not_found() {
    let db = database();
    let conn = connect(&db, SessionOptions::new());

    let err = conn
        .call_procedure(Some("db"), Some("billing"), "missing", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcedureNotFound { ref name } if name == "db.billing.missing"));
    assert_eq!(err.kind(), ErrorKind::ProtocolMismatch);
    assert_eq!(db.stats().executions, 0);
}

#[tokio::test]
async fn test_parameter_count_mismatch() {
    let db = database();
    let conn = connect(&db, SessionOptions::new());

    let err = conn
        .call_procedure(None, None, "greet", vec![Value::from("ada")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProtocolMismatch { .. }));
    assert_eq!(db.stats().executions, 0);
    assert_eq!(db.stats().open_statements(), 0);
}

#[tokio::test]
async fn test_procedure_result_set() {
    let db = database();
    db.create_table(
        MemoryTable::new("orders")
            .with_column(MemoryColumn::new("ORDER_ID", SqlType::BigInt))
            .with_column(MemoryColumn::new("STATUS", SqlType::Varchar).with_size(10))
            .with_row(vec![Value::BigInt(9_000_000_001), Value::from("open")])
            .with_row(vec![Value::BigInt(9_000_000_002), Value::from("shipped")]),
    );
    db.create_procedure(
        MemoryProcedure::new("open_orders", |_| vec![Value::Null])
            .with_param(MemoryParam::new("@customer", ParamDirection::In, SqlType::Integer))
            .with_result_table("orders"),
    );
    let conn = connect(&db, SessionOptions::new().with_row_shape(RowShape::Named));

    // Result columns are listed by the catalog but are not parameters.
    let results = conn
        .call_procedure(None, None, "open_orders", vec![Value::Integer(7)])
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.row_count, -1);
    assert_eq!(results.parameters, vec![Value::Integer(7)]);
    assert_eq!(
        results.rows[1].get_by_name("ORDER_ID"),
        Some(&Value::BigInt(9_000_000_002))
    );
}

#[tokio::test]
async fn test_procedure_in_catalog_qualifier() {
    let db = MemoryDatabase::new();
    db.create_procedure(
        MemoryProcedure::new("ping", |_| Vec::new()).with_catalog("ops"),
    );
    let conn = connect(&db, SessionOptions::new());

    let results = conn
        .call_procedure(Some("ops"), None, "ping", Vec::new())
        .await
        .unwrap();
    assert!(results.parameters.is_empty());
    assert!(results.is_empty());
}
