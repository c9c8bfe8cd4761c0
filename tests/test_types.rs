//! Integration tests for value round trips through parameters and columns.

use chrono::NaiveDate;
use odbc_bridge_rs::memory::{MemoryColumn, MemoryDatabase, MemorySession, MemoryTable};
use odbc_bridge_rs::{CharEncoding, Connection, Row, SessionOptions, SqlType, Value};

fn echo(markers: usize) -> (MemoryDatabase, String) {
    let db = MemoryDatabase::new();
    let sql = format!("SELECT {}", vec!["?"; markers].join(", "));
    db.register_echo(&sql);
    (db, sql)
}

fn connect(db: &MemoryDatabase, options: SessionOptions) -> Connection<MemorySession> {
    Connection::new(db.connect(), options).expect("connection")
}

fn sample() -> Vec<Value> {
    let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_nano_opt(13, 5, 9, 123_456_789)
        .unwrap()
        .and_utc();
    vec![
        Value::Integer(42),
        Value::BigInt(9_007_199_254_740_993),
        Value::Double(-2.5),
        Value::Boolean(true),
        Value::from("héllo wörld"),
        Value::Binary(vec![0, 1, 2, 254, 255]),
        Value::Timestamp(ts),
        Value::Null,
    ]
}

#[tokio::test]
async fn test_round_trip_narrow() {
    let values = sample();
    let (db, sql) = echo(values.len());
    let conn = connect(&db, SessionOptions::new());

    let results = conn.query(&sql, values.clone()).await.unwrap();
    assert_eq!(results.rows, vec![Row::Positional(values.clone())]);
    assert_eq!(results.parameters, values);
    assert_eq!(results.columns[0].sql_type, SqlType::Integer);
    assert_eq!(results.columns[1].sql_type, SqlType::BigInt);
}

#[tokio::test]
async fn test_round_trip_wide() {
    let values = sample();
    let (db, sql) = echo(values.len());
    let conn = connect(&db, SessionOptions::new().with_encoding(CharEncoding::Wide));

    let results = conn.query(&sql, values.clone()).await.unwrap();
    assert_eq!(results.rows, vec![Row::Positional(values)]);
}

#[tokio::test]
async fn test_bigint_keeps_full_precision() {
    let (db, sql) = echo(1);
    let conn = connect(&db, SessionOptions::new());

    let big = Value::BigInt(i64::MAX - 1);
    let results = conn.query(&sql, vec![big.clone()]).await.unwrap();
    assert_eq!(results.rows[0].get(0), Some(&big));
}

#[tokio::test]
async fn test_date_and_time_columns() {
    let db = MemoryDatabase::new();
    let day = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
    db.create_table(
        MemoryTable::new("events")
            .with_column(MemoryColumn::new("DAY", SqlType::Date).with_size(0))
            .with_column(MemoryColumn::new("AT", SqlType::Timestamp))
            .with_row(vec![
                Value::Timestamp(day.and_hms_opt(0, 0, 0).unwrap().and_utc()),
                Value::from("2000-01-01 08:30:00"),
            ]),
    );
    db.register_select("SELECT * FROM events", "events");
    let conn = connect(&db, SessionOptions::new());

    let results = conn.query("SELECT * FROM events", Vec::new()).await.unwrap();
    assert_eq!(
        results.rows[0].get(0),
        Some(&Value::Timestamp(day.and_hms_opt(0, 0, 0).unwrap().and_utc()))
    );
    let at = NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
        .and_utc();
    assert_eq!(results.rows[0].get(1), Some(&Value::Timestamp(at)));
}

#[tokio::test]
async fn test_dml_reports_row_count() {
    let db = MemoryDatabase::new();
    db.create_table(
        MemoryTable::new("t")
            .with_column(MemoryColumn::new("ID", SqlType::Integer))
            .with_column(MemoryColumn::new("NAME", SqlType::Varchar).with_size(10)),
    );
    db.register_insert("INSERT INTO t VALUES (?, ?)", "t");
    db.register_affect("UPDATE t SET NAME = NULL", 3);
    let conn = connect(&db, SessionOptions::new());

    let params = vec![Value::Integer(1), Value::from("one")];
    let inserted = conn
        .query("INSERT INTO t VALUES (?, ?)", params.clone())
        .await
        .unwrap();
    assert_eq!(inserted.row_count, 1);
    assert!(inserted.columns.is_empty());
    assert_eq!(inserted.parameters, params);
    assert_eq!(db.rows("t"), vec![params]);

    let updated = conn
        .query("UPDATE t SET NAME = NULL", Vec::new())
        .await
        .unwrap();
    assert_eq!(updated.row_count, 3);
}
