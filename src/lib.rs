//! Data marshaling engine for call-level database interfaces.
//!
//! Executes SQL through a driver reached via the [`SessionHandle`] and
//! [`StatementHandle`] traits, binds parameters and result columns into
//! owned buffers, fetches rows in batches (including chunked reads of long
//! values), and projects them into [`Value`]s. Stored procedures get their
//! OUT and INOUT parameters described from the catalog and read back.
//!
//! # Example
//!
//! ```no_run
//! use odbc_bridge_rs::memory::{MemoryColumn, MemoryDatabase, MemoryTable};
//! use odbc_bridge_rs::{Connection, Result, SessionOptions, SqlType, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = MemoryDatabase::new();
//!     db.create_table(
//!         MemoryTable::new("users")
//!             .with_column(MemoryColumn::new("ID", SqlType::Integer))
//!             .with_column(MemoryColumn::new("NAME", SqlType::Varchar).with_size(40)),
//!     );
//!     db.insert("users", vec![Value::Integer(1), Value::from("ada")]);
//!     db.register_select("SELECT * FROM users", "users");
//!
//!     let conn = Connection::new(db.connect(), SessionOptions::new())?;
//!     let results = conn.query("SELECT * FROM users", Vec::new()).await?;
//!     for row in &results {
//!         println!("{:?}", row);
//!     }
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod protocol;
pub mod result;
pub mod task;

// Re-export main types
pub use config::{CharEncoding, QueryOptions, RowShape, SessionOptions};
pub use connection::{Connection, Execution};
pub use cursor::{Cursor, CursorStreamExt};
pub use error::{DiagnosticRecord, Diagnostics, Error, ErrorKind, Result};
pub use protocol::env::EnvironmentLock;
pub use protocol::handle::{DriverCapabilities, SessionHandle, StatementHandle};
pub use protocol::types::{
    BindType, ColumnDescriptor, Nullability, ParamDirection, Row, SqlType, Value,
};
pub use result::ResultSet;
pub use task::Task;
