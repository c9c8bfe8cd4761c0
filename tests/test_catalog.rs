//! Integration tests for catalog listings.

use odbc_bridge_rs::memory::{MemoryColumn, MemoryDatabase, MemorySession, MemoryTable};
use odbc_bridge_rs::{Connection, RowShape, SessionOptions, SqlType, Value};

fn database() -> MemoryDatabase {
    let db = MemoryDatabase::new();
    db.create_table(
        MemoryTable::new("customers")
            .with_schema("sales")
            .with_column(MemoryColumn::new("CUSTOMER_ID", SqlType::Integer).not_null())
            .with_column(MemoryColumn::new("NAME", SqlType::WVarchar).with_size(100))
            .with_column(
                MemoryColumn::new("CREDIT", SqlType::Decimal)
                    .with_size(12)
                    .with_decimal_digits(2),
            ),
    );
    db.create_table(
        MemoryTable::new("orders")
            .with_schema("sales")
            .with_column(MemoryColumn::new("ORDER_ID", SqlType::BigInt).not_null()),
    );
    db.create_table(
        MemoryTable::new("open_orders")
            .with_schema("sales")
            .with_type("VIEW")
            .with_column(MemoryColumn::new("ORDER_ID", SqlType::BigInt)),
    );
    db.create_table(MemoryTable::new("audit").with_schema("ops"));
    db
}

fn connect(db: &MemoryDatabase) -> Connection<MemorySession> {
    let options = SessionOptions::new().with_row_shape(RowShape::Named);
    Connection::new(db.connect(), options).expect("connection")
}

fn names(results: &odbc_bridge_rs::ResultSet, column: &str) -> Vec<String> {
    results
        .iter()
        .filter_map(|row| row.get_by_name(column))
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_list_tables_by_schema() {
    let db = database();
    let conn = connect(&db);

    let results = conn
        .list_tables(None, Some("sales"), None, None)
        .await
        .unwrap();
    assert_eq!(
        names(&results, "TABLE_NAME"),
        vec!["customers", "orders", "open_orders"]
    );
    assert_eq!(
        results.column_names(),
        vec!["TABLE_CAT", "TABLE_SCHEM", "TABLE_NAME", "TABLE_TYPE", "REMARKS"]
    );
    assert_eq!(results.rows[0].get_by_name("TABLE_CAT"), Some(&Value::Null));
}

#[tokio::test]
async fn test_list_tables_by_pattern_and_type() {
    let db = database();
    let conn = connect(&db);

    let results = conn
        .list_tables(None, None, Some("%orders"), Some("'TABLE'"))
        .await
        .unwrap();
    assert_eq!(names(&results, "TABLE_NAME"), vec!["orders"]);

    let views = conn
        .list_tables(None, None, None, Some("VIEW"))
        .await
        .unwrap();
    assert_eq!(names(&views, "TABLE_NAME"), vec!["open_orders"]);

    let none = conn
        .list_tables(None, Some("missing"), None, None)
        .await
        .unwrap();
    assert!(none.is_empty());
    assert_eq!(none.columns.len(), 5);
}

#[tokio::test]
async fn test_list_columns() {
    let db = database();
    let conn = connect(&db);

    let results = conn
        .list_columns(None, Some("sales"), Some("customers"), None)
        .await
        .unwrap();
    assert_eq!(
        names(&results, "COLUMN_NAME"),
        vec!["CUSTOMER_ID", "NAME", "CREDIT"]
    );

    let credit = &results.rows[2];
    assert_eq!(
        credit.get_by_name("DATA_TYPE"),
        Some(&Value::Integer(i64::from(SqlType::Decimal.code())))
    );
    assert_eq!(credit.get_by_name("COLUMN_SIZE"), Some(&Value::Integer(12)));
    assert_eq!(credit.get_by_name("DECIMAL_DIGITS"), Some(&Value::Integer(2)));
    assert_eq!(credit.get_by_name("NULLABLE"), Some(&Value::Integer(1)));
    assert_eq!(
        results.rows[0].get_by_name("NULLABLE"),
        Some(&Value::Integer(0))
    );
}

#[tokio::test]
async fn test_list_columns_by_column_pattern() {
    let db = database();
    let conn = connect(&db);

    let results = conn
        .list_columns(None, None, None, Some("ORDER_ID"))
        .await
        .unwrap();
    assert_eq!(names(&results, "TABLE_NAME"), vec!["orders", "open_orders"]);
    assert_eq!(db.stats().open_statements(), 0);
}
