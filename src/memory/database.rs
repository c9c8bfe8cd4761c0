//! Shared in-memory database state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Diagnostics;
use crate::protocol::constants::SQLSTATE_GENERAL_ERROR;
use crate::protocol::types::{ParamDirection, SqlType, Value};

use super::convert::default_column_size;
use super::session::MemorySession;

/// A column of an in-memory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryColumn {
    pub name: String,
    pub sql_type: SqlType,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: bool,
}

impl MemoryColumn {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            column_size: default_column_size(sql_type),
            decimal_digits: 0,
            nullable: true,
        }
    }

    pub fn with_size(mut self, column_size: usize) -> Self {
        self.column_size = column_size;
        self
    }

    pub fn with_decimal_digits(mut self, digits: i16) -> Self {
        self.decimal_digits = digits;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// An in-memory table.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub table_type: String,
    pub columns: Vec<MemoryColumn>,
    pub rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
            table_type: "TABLE".to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Table type as reported by the catalog, e.g. `VIEW`.
    pub fn with_type(mut self, table_type: impl Into<String>) -> Self {
        self.table_type = table_type.into();
        self
    }

    pub fn with_column(mut self, column: MemoryColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }
}

/// A declared procedure parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryParam {
    pub name: String,
    pub direction: ParamDirection,
    pub sql_type: SqlType,
    pub column_size: usize,
    pub decimal_digits: i16,
}

impl MemoryParam {
    pub fn new(name: impl Into<String>, direction: ParamDirection, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            direction,
            sql_type,
            column_size: default_column_size(sql_type),
            decimal_digits: 0,
        }
    }

    pub fn with_size(mut self, column_size: usize) -> Self {
        self.column_size = column_size;
        self
    }

    pub fn with_decimal_digits(mut self, digits: i16) -> Self {
        self.decimal_digits = digits;
        self
    }
}

/// Procedure body: receives every parameter value in order and returns the
/// values to write back. Only OUT and INOUT positions of the returned list
/// are used.
pub type ProcedureBody = Arc<dyn Fn(&[Value]) -> Vec<Value> + Send + Sync>;

/// An in-memory stored procedure.
#[derive(Clone)]
pub struct MemoryProcedure {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub params: Vec<MemoryParam>,
    /// Table whose rows the procedure returns as a result set.
    pub result_table: Option<String>,
    /// Declared return value type, listed by the catalog but never bound.
    pub return_type: Option<SqlType>,
    pub body: ProcedureBody,
}

impl MemoryProcedure {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
            params: Vec::new(),
            result_table: None,
            return_type: None,
            body: Arc::new(body),
        }
    }

    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_param(mut self, param: MemoryParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_result_table(mut self, table: impl Into<String>) -> Self {
        self.result_table = Some(table.into());
        self
    }

    pub fn with_return_value(mut self, sql_type: SqlType) -> Self {
        self.return_type = Some(sql_type);
        self
    }
}

impl fmt::Debug for MemoryProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProcedure")
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("result_table", &self.result_table)
            .finish_non_exhaustive()
    }
}

/// What a registered statement does when executed.
#[derive(Debug, Clone)]
pub enum Script {
    /// Return every row of a table.
    Select(String),
    /// Append the parameters as one row of a table.
    Insert(String),
    /// Report this many affected rows.
    Affect(i64),
    /// Fail execution with these diagnostics.
    Fail(Diagnostics),
    /// Return one row holding the parameters, as columns `p1`, `p2`, ...
    Echo,
}

/// Counters for driver calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub fetch_calls: usize,
    pub get_data_calls: usize,
    pub executions: usize,
    pub statements_allocated: usize,
    pub statements_freed: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub disconnects: usize,
}

impl DriverStats {
    /// Statements allocated and not yet freed.
    pub fn open_statements(&self) -> usize {
        self.statements_allocated - self.statements_freed
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Faults {
    pub fail_fetch: Option<(usize, Diagnostics)>,
    pub fail_describe: bool,
    pub error_row: Option<usize>,
    pub unknown_lengths: bool,
    pub double_bind: bool,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            fail_fetch: None,
            fail_describe: false,
            error_row: None,
            unknown_lengths: false,
            double_bind: true,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct DatabaseState {
    pub tables: Vec<MemoryTable>,
    pub scripts: HashMap<String, Script>,
    pub procedures: Vec<MemoryProcedure>,
    pub faults: Faults,
    pub stats: DriverStats,
}

impl DatabaseState {
    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut MemoryTable> {
        self.tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// An in-memory database reached through [`MemorySession`]s.
///
/// SQL text is not parsed. Statements are registered up front with the
/// behaviour they have when executed; procedure calls in escape syntax
/// (`{ CALL schema.name(?, ?) }`) resolve against registered procedures.
///
/// # Example
///
/// ```
/// use odbc_bridge_rs::memory::{MemoryColumn, MemoryDatabase, MemoryTable};
/// use odbc_bridge_rs::{SqlType, Value};
///
/// let db = MemoryDatabase::new();
/// db.create_table(
///     MemoryTable::new("t")
///         .with_column(MemoryColumn::new("ID", SqlType::Integer))
///         .with_row(vec![Value::Integer(1)]),
/// );
/// db.register_select("SELECT ID FROM t", "t");
/// assert_eq!(db.rows("t").len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<DatabaseState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session.
    pub fn connect(&self) -> MemorySession {
        MemorySession::new(self.clone())
    }

    pub(crate) fn state(&self) -> parking_lot::MutexGuard<'_, DatabaseState> {
        self.state.lock()
    }

    /// Add a table, replacing one with the same name.
    pub fn create_table(&self, table: MemoryTable) {
        let mut state = self.state.lock();
        state
            .tables
            .retain(|t| !t.name.eq_ignore_ascii_case(&table.name));
        state.tables.push(table);
    }

    /// Append a row. Returns false if the table does not exist.
    pub fn insert(&self, table: &str, row: Vec<Value>) -> bool {
        match self.state.lock().table_mut(table) {
            Some(t) => {
                t.rows.push(row);
                true
            }
            None => false,
        }
    }

    /// Current rows of a table.
    pub fn rows(&self, table: &str) -> Vec<Vec<Value>> {
        self.state
            .lock()
            .table(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn register(&self, sql: &str, script: Script) {
        self.state
            .lock()
            .scripts
            .insert(sql.trim().to_string(), script);
    }

    pub fn register_select(&self, sql: &str, table: &str) {
        self.register(sql, Script::Select(table.to_string()));
    }

    pub fn register_insert(&self, sql: &str, table: &str) {
        self.register(sql, Script::Insert(table.to_string()));
    }

    pub fn register_affect(&self, sql: &str, rows: i64) {
        self.register(sql, Script::Affect(rows));
    }

    pub fn register_failure(&self, sql: &str, diagnostics: Diagnostics) {
        self.register(sql, Script::Fail(diagnostics));
    }

    pub fn register_echo(&self, sql: &str) {
        self.register(sql, Script::Echo);
    }

    pub fn create_procedure(&self, procedure: MemoryProcedure) {
        self.state.lock().procedures.push(procedure);
    }

    /// Fail the `n`-th fetch call (counted over the database, 1-based).
    pub fn fail_fetch(&self, n: usize) {
        self.fail_fetch_with(
            n,
            Diagnostics::single(SQLSTATE_GENERAL_ERROR, 0, "injected fetch failure"),
        );
    }

    pub fn fail_fetch_with(&self, n: usize, diagnostics: Diagnostics) {
        self.state.lock().faults.fail_fetch = Some((n, diagnostics));
    }

    /// Make every column description fail.
    pub fn fail_describe(&self, enabled: bool) {
        self.state.lock().faults.fail_describe = enabled;
    }

    /// Report the row at this position of any result set as an error row.
    pub fn fail_row(&self, row: usize) {
        self.state.lock().faults.error_row = Some(row);
    }

    /// Report "no total" instead of lengths for truncated values.
    pub fn set_unknown_lengths(&self, enabled: bool) {
        self.state.lock().faults.unknown_lengths = enabled;
    }

    /// Whether the driver accepts numerics bound as doubles.
    pub fn set_double_bind(&self, enabled: bool) {
        self.state.lock().faults.double_bind = enabled;
    }

    pub fn reset_faults(&self) {
        self.state.lock().faults = Faults::default();
    }

    pub fn stats(&self) -> DriverStats {
        self.state.lock().stats
    }
}
