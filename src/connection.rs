//! High-level connection API.
//!
//! A [`Connection`] wraps one live driver session. Every operation is one
//! background unit of work returning a [`Task`]; several operations may run at
//! once, each on its own statement handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::{QueryOptions, SessionOptions};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::protocol::binder::{bind_columns, describe_columns};
use crate::protocol::catalog::{
    call_text, find_procedure, list_columns, list_tables, procedure_parameters,
};
use crate::protocol::env::{EnvironmentLock, StatementContext};
use crate::protocol::fetch::{drain_columns, drain_result, FetchEngine, Materialized};
use crate::protocol::handle::{DriverCapabilities, DriverResult, SessionHandle, StatementHandle};
use crate::protocol::marshal::{bind_values, check_parameter_count, read_back, resolve_parameters};
use crate::protocol::projector::project;
use crate::protocol::types::{BindContext, ParameterSet, Value};
use crate::result::ResultSet;
use crate::task::Task;

/// Outcome of [`Connection::execute`].
#[derive(Debug)]
pub enum Execution<S: StatementHandle> {
    /// The statement was drained, or produced no result set.
    Results(ResultSet),
    /// Cursor mode: rows are fetched page by page.
    Cursor(Cursor<S>),
}

impl<S: StatementHandle> Execution<S> {
    pub fn into_results(self) -> Option<ResultSet> {
        match self {
            Execution::Results(results) => Some(results),
            Execution::Cursor(_) => None,
        }
    }

    pub fn into_cursor(self) -> Option<Cursor<S>> {
        match self {
            Execution::Cursor(cursor) => Some(cursor),
            Execution::Results(_) => None,
        }
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self, Execution::Cursor(_))
    }
}

struct Inner<H: SessionHandle> {
    session: Mutex<H>,
    lock: Arc<EnvironmentLock>,
    options: SessionOptions,
    capabilities: DriverCapabilities,
    closed: Arc<AtomicBool>,
}

/// A database connection over a live driver session.
///
/// Cloning is cheap; clones share the session.
pub struct Connection<H: SessionHandle> {
    inner: Arc<Inner<H>>,
}

impl<H: SessionHandle> Clone for Connection<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: SessionHandle> Connection<H> {
    /// Wrap an opened session, sharing the process-wide environment lock.
    pub fn new(session: H, options: SessionOptions) -> Result<Self> {
        Self::with_lock(session, options, EnvironmentLock::global())
    }

    /// Wrap an opened session with an explicit environment lock.
    pub fn with_lock(
        mut session: H,
        options: SessionOptions,
        lock: Arc<EnvironmentLock>,
    ) -> Result<Self> {
        if let Some(timeout) = options.connection_timeout {
            session
                .set_connection_timeout(timeout)
                .map_err(|d| Error::driver("SQLSetConnectAttr", d))?;
        }
        let capabilities = session.capabilities();
        debug!(?capabilities, row_shape = ?options.row_shape, "connection ready");

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                lock,
                options,
                capabilities,
                closed: Arc::new(AtomicBool::new(false)),
            }),
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    pub fn capabilities(&self) -> DriverCapabilities {
        self.inner.capabilities
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Execute a statement.
    ///
    /// Without cursor options the whole result is fetched before the task
    /// completes. With a cursor name or fetch size the statement stays open
    /// and an [`Execution::Cursor`] is returned.
    pub fn execute(
        &self,
        sql: &str,
        params: Vec<Value>,
        options: QueryOptions,
    ) -> Task<Execution<H::Statement>> {
        let inner = Arc::clone(&self.inner);
        let sql = sql.to_string();
        Task::spawn_blocking(move || inner.execute(&sql, params, &options))
    }

    /// Execute a statement and fetch its whole result.
    pub fn query(&self, sql: &str, params: Vec<Value>) -> Task<ResultSet> {
        let inner = Arc::clone(&self.inner);
        let sql = sql.to_string();
        Task::spawn_blocking(move || {
            match inner.execute(&sql, params, &QueryOptions::default())? {
                Execution::Results(results) => Ok(results),
                Execution::Cursor(_) => Err(Error::protocol_mismatch(
                    "eager execution returned a cursor",
                )),
            }
        })
    }

    /// Call a stored procedure.
    ///
    /// Parameters are described from the catalog first. The returned
    /// [`ResultSet::parameters`] holds the caller's values for IN positions
    /// and the backend's values for OUT and INOUT positions.
    pub fn call_procedure(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
        params: Vec<Value>,
    ) -> Task<ResultSet> {
        let inner = Arc::clone(&self.inner);
        let catalog = catalog.map(str::to_string);
        let schema = schema.map(str::to_string);
        let name = name.to_string();
        Task::spawn_blocking(move || {
            inner.call_procedure(catalog.as_deref(), schema.as_deref(), &name, params)
        })
    }

    /// List tables matching the given patterns.
    pub fn list_tables(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        table_type: Option<&str>,
    ) -> Task<ResultSet> {
        let inner = Arc::clone(&self.inner);
        let args = [catalog, schema, table, table_type].map(|a| a.map(str::to_string));
        Task::spawn_blocking(move || {
            let [catalog, schema, table, table_type] = &args;
            inner.catalog_query(|ctx, bind| {
                list_tables(
                    ctx,
                    bind,
                    catalog.as_deref(),
                    schema.as_deref(),
                    table.as_deref(),
                    table_type.as_deref(),
                )
            })
        })
    }

    /// List columns matching the given patterns.
    pub fn list_columns(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Task<ResultSet> {
        let inner = Arc::clone(&self.inner);
        let args = [catalog, schema, table, column].map(|a| a.map(str::to_string));
        Task::spawn_blocking(move || {
            let [catalog, schema, table, column] = &args;
            inner.catalog_query(|ctx, bind| {
                list_columns(
                    ctx,
                    bind,
                    catalog.as_deref(),
                    schema.as_deref(),
                    table.as_deref(),
                    column.as_deref(),
                )
            })
        })
    }

    /// Start a transaction by turning autocommit off.
    pub fn begin_transaction(&self) -> Task<()> {
        let inner = Arc::clone(&self.inner);
        Task::spawn_blocking(move || {
            inner.with_session("SQLSetConnectAttr", |s| s.set_autocommit(false))?;
            debug!("transaction started");
            Ok(())
        })
    }

    /// Commit the current transaction and restore autocommit.
    pub fn commit(&self) -> Task<()> {
        let inner = Arc::clone(&self.inner);
        Task::spawn_blocking(move || inner.end_transaction(true))
    }

    /// Roll back the current transaction and restore autocommit.
    pub fn rollback(&self) -> Task<()> {
        let inner = Arc::clone(&self.inner);
        Task::spawn_blocking(move || inner.end_transaction(false))
    }

    /// Close the connection. Later operations on it, and on its open
    /// cursors, fail with [`Error::ResourceInvalid`]. Closing twice is a
    /// no-op.
    pub fn close(&self) -> Task<()> {
        let inner = Arc::clone(&self.inner);
        Task::spawn_blocking(move || inner.close())
    }
}

impl<H: SessionHandle> Inner<H> {
    fn bind_context(&self) -> BindContext {
        BindContext::new(&self.options, self.capabilities)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ResourceInvalid {
                resource: "connection",
            });
        }
        Ok(())
    }

    fn allocate(&self) -> Result<StatementContext<H::Statement>> {
        self.ensure_open()?;
        let mut session = self.session.lock();
        StatementContext::allocate(&mut *session, Arc::clone(&self.lock), Arc::clone(&self.closed))
    }

    fn with_session<T>(
        &self,
        function: &'static str,
        f: impl FnOnce(&mut H) -> DriverResult<T>,
    ) -> Result<T> {
        self.ensure_open()?;
        let mut session = self.session.lock();
        f(&mut *session).map_err(|d| Error::driver(function, d))
    }

    /// Prepare, check the parameter count and execute.
    fn run_prepared(
        &self,
        ctx: &mut StatementContext<H::Statement>,
        sql: &str,
        params: &mut ParameterSet,
    ) -> Result<()> {
        ctx.call("SQLPrepare", |s| s.prepare(sql))?;
        let expected = ctx.call("SQLNumParams", |s| s.num_params())?;
        check_parameter_count(usize::from(expected), params.len())?;
        ctx.call("SQLExecute", |s| s.execute(params))?;
        debug!(sql, params = params.len(), "executed statement");
        Ok(())
    }

    fn execute(
        &self,
        sql: &str,
        params: Vec<Value>,
        options: &QueryOptions,
    ) -> Result<Execution<H::Statement>> {
        let bind = self.bind_context();
        let mut ctx = self.allocate()?;

        if let Some(name) = &options.cursor_name {
            ctx.call("SQLSetCursorName", |s| s.set_cursor_name(name))?;
        }
        if let Some(timeout) = self.options.query_timeout {
            ctx.call("SQLSetStmtAttr", |s| s.set_query_timeout(timeout))?;
        }

        let mut set = bind_values(&params, self.options.encoding)?;
        self.run_prepared(&mut ctx, sql, &mut set)?;
        drop(set);

        let columns = describe_columns(&mut ctx, &bind)?;
        if columns.is_empty() {
            let row_count = ctx.call("SQLRowCount", |s| s.row_count())?;
            return Ok(Execution::Results(ResultSet::affected(row_count, params)));
        }

        if options.is_cursor_mode() {
            let batch = bind_columns(&mut ctx, &columns, options.effective_fetch_size())?;
            let engine = FetchEngine::new(columns, batch, bind.chunk_size);
            return Ok(Execution::Cursor(Cursor::new(
                ctx,
                engine,
                self.options.row_shape,
            )));
        }

        let Materialized { columns, rows } =
            drain_columns(&mut ctx, columns, bind.chunk_size, self.options.fetch_size)?;
        let results = project(rows, columns, self.options.row_shape, -1, params)?;
        Ok(Execution::Results(results))
    }

    fn call_procedure(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
        params: Vec<Value>,
    ) -> Result<ResultSet> {
        let bind = self.bind_context();
        let mut ctx = self.allocate()?;

        if !find_procedure(&mut ctx, &bind, catalog, schema, name)? {
            return Err(Error::ProcedureNotFound {
                name: qualified_name(catalog, schema, name),
            });
        }
        let described = procedure_parameters(&mut ctx, &bind, catalog, schema, name)?;
        check_parameter_count(described.len(), params.len())?;

        let supplied = bind_values(&params, self.options.encoding)?;
        let mut set = resolve_parameters(supplied, &described, &params, &bind)?;
        debug!(
            procedure = name,
            params = set.len(),
            bytes = set.bytes_allocated(),
            "resolved procedure parameters"
        );

        let sql = call_text(catalog, schema, name, set.len());
        self.run_prepared(&mut ctx, &sql, &mut set)?;

        let Materialized { columns, rows } = drain_result(&mut ctx, &bind, self.options.fetch_size)?;
        let row_count = if columns.is_empty() {
            ctx.call("SQLRowCount", |s| s.row_count())?
        } else {
            -1
        };
        let parameters = read_back(&set, params)?;
        project(rows, columns, self.options.row_shape, row_count, parameters)
    }

    fn catalog_query(
        &self,
        f: impl FnOnce(&mut StatementContext<H::Statement>, &BindContext) -> Result<Materialized>,
    ) -> Result<ResultSet> {
        let bind = self.bind_context();
        let mut ctx = self.allocate()?;
        let Materialized { columns, rows } = f(&mut ctx, &bind)?;
        project(rows, columns, self.options.row_shape, -1, Vec::new())
    }

    fn end_transaction(&self, commit: bool) -> Result<()> {
        self.with_session("SQLEndTran", |s| s.end_transaction(commit))?;
        self.with_session("SQLSetConnectAttr", |s| s.set_autocommit(true))?;
        debug!(commit, "transaction ended");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut session = self.session.lock();
        let _guard = self.lock.lock();
        session
            .disconnect()
            .map_err(|d| Error::driver("SQLDisconnect", d))?;
        debug!("connection closed");
        Ok(())
    }
}

impl<H: SessionHandle> Drop for Inner<H> {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _guard = self.lock.lock();
        if let Err(d) = self.session.get_mut().disconnect() {
            warn!(diagnostics = %d, "failed to disconnect session");
        }
    }
}

fn qualified_name(catalog: Option<&str>, schema: Option<&str>, name: &str) -> String {
    [catalog, schema, Some(name)]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name(Some("db"), None, "p"), "db.p");
        assert_eq!(qualified_name(None, Some(""), "p"), "p");
    }
}
