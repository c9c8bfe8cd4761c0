//! In-memory driver.
//!
//! A [`SessionHandle`](crate::SessionHandle) implementation backed by tables
//! held in process memory. It follows the call-level contract closely enough
//! to exercise the engine end to end: array fetch with row status arrays,
//! truncation with chunked reads, catalog result sets, output parameters and
//! transactions. Faults can be injected per database.
//!
//! ```no_run
//! use odbc_bridge_rs::memory::MemoryDatabase;
//! use odbc_bridge_rs::Connection;
//!
//! let db = MemoryDatabase::new();
//! let conn = Connection::new(db.connect(), Default::default());
//! # let _ = conn;
//! ```

mod catalog;
mod convert;
mod database;
mod session;
mod statement;

pub use database::{
    DriverStats, MemoryColumn, MemoryDatabase, MemoryParam, MemoryProcedure, MemoryTable,
    ProcedureBody, Script,
};
pub use session::MemorySession;
pub use statement::MemoryStatement;
