//! In-memory statement.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{DiagnosticRecord, Diagnostics};
use crate::protocol::batch::{RowBatch, RowStatus};
use crate::protocol::buffer::Indicator;
use crate::protocol::constants::*;
use crate::protocol::decode::text_room;
use crate::protocol::handle::{DriverResult, FetchOutcome, GetDataOutcome, StatementHandle};
use crate::protocol::types::{
    write_value, BindType, ColumnBinding, DescribedColumn, ParameterSet, TypeFamily, Value,
};

use super::catalog;
use super::convert::{conversion_failure, diagnostic, value_bytes};
use super::database::{MemoryColumn, MemoryDatabase, MemoryProcedure, Script};
use super::session::SessionState;

/// An open result set.
#[derive(Debug, Clone)]
pub(crate) struct ResultData {
    columns: Vec<MemoryColumn>,
    rows: Vec<Vec<Value>>,
    /// Next row to fetch.
    position: usize,
    /// First row of the current batch.
    batch_start: usize,
}

impl ResultData {
    pub fn new(columns: Vec<MemoryColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: 0,
            batch_start: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Prepared {
    Script(Script),
    Call {
        schema: Option<String>,
        name: String,
    },
}

/// A statement on a [`MemorySession`](super::MemorySession).
#[derive(Debug)]
pub struct MemoryStatement {
    db: MemoryDatabase,
    session: Arc<Mutex<SessionState>>,
    prepared: Option<(Prepared, u16)>,
    result: Option<ResultData>,
    bindings: Vec<ColumnBinding>,
    row_array_size: usize,
    row_count: i64,
    cursor_name: Option<String>,
    query_timeout: Option<Duration>,
    diagnostics: Diagnostics,
    freed: bool,
}

impl MemoryStatement {
    pub(crate) fn new(db: MemoryDatabase, session: Arc<Mutex<SessionState>>) -> Self {
        Self {
            db,
            session,
            prepared: None,
            result: None,
            bindings: Vec::new(),
            row_array_size: 1,
            row_count: -1,
            cursor_name: None,
            query_timeout: None,
            diagnostics: Diagnostics::default(),
            freed: false,
        }
    }

    pub fn cursor_name(&self) -> Option<&str> {
        self.cursor_name.as_deref()
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    fn ensure_live(&self) -> DriverResult<()> {
        if self.freed {
            return Err(diagnostic("HY010", "Statement handle already freed"));
        }
        self.session.lock().ensure_connected()
    }

    fn open_result(&mut self, result: ResultData) {
        self.result = Some(result);
        self.row_count = -1;
    }

    fn result(&self) -> DriverResult<&ResultData> {
        self.result
            .as_ref()
            .ok_or_else(|| diagnostic(SQLSTATE_INVALID_CURSOR_STATE, "Invalid cursor state"))
    }

    fn run_script(&mut self, script: Script, values: Vec<Value>) -> DriverResult<()> {
        match script {
            Script::Select(table) => {
                let data = {
                    let db = self.db.state();
                    let t = db.table(&table).ok_or_else(|| missing_table(&table))?;
                    ResultData::new(t.columns.clone(), t.rows.clone())
                };
                self.open_result(data);
            }
            Script::Insert(table) => {
                let autocommit = self.session.lock().autocommit;
                let mut db = self.db.state();
                let t = db.table_mut(&table).ok_or_else(|| missing_table(&table))?;
                if t.columns.len() != values.len() {
                    return Err(diagnostic(
                        "21S01",
                        "Insert value list does not match column list",
                    ));
                }
                if autocommit {
                    t.rows.push(values);
                } else {
                    drop(db);
                    self.session.lock().pending.push((table, values));
                }
                self.row_count = 1;
            }
            Script::Affect(rows) => self.row_count = rows,
            Script::Fail(diagnostics) => return Err(diagnostics),
            Script::Echo => {
                let columns = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| echo_column(i, v))
                    .collect();
                self.open_result(ResultData::new(columns, vec![values]));
            }
        }
        Ok(())
    }

    fn run_call(
        &mut self,
        schema: Option<&str>,
        name: &str,
        params: &mut ParameterSet,
        values: Vec<Value>,
    ) -> DriverResult<()> {
        let (procedure, result) = {
            let db = self.db.state();
            let procedure: MemoryProcedure = db
                .procedures
                .iter()
                .find(|p| {
                    p.name.eq_ignore_ascii_case(name)
                        && schema.map_or(true, |q| {
                            [&p.schema, &p.catalog]
                                .into_iter()
                                .flatten()
                                .any(|part| part.eq_ignore_ascii_case(q))
                        })
                })
                .cloned()
                .ok_or_else(|| {
                    diagnostic("42000", format!("Could not find stored procedure '{}'", name))
                })?;
            let result = procedure
                .result_table
                .as_deref()
                .and_then(|t| db.table(t))
                .map(|t| ResultData::new(t.columns.clone(), t.rows.clone()));
            (procedure, result)
        };

        if procedure.params.len() != values.len() {
            return Err(diagnostic(
                SQLSTATE_COUNT_FIELD_INCORRECT,
                "COUNT field incorrect or syntax error",
            ));
        }

        let outputs = (procedure.body)(&values);
        let mut truncated = false;
        for (i, (declared, param)) in procedure.params.iter().zip(params.iter_mut()).enumerate() {
            if !declared.direction.is_output() {
                continue;
            }
            let value = outputs.get(i).cloned().unwrap_or(Value::Null);
            truncated |= param.store(&value).map_err(|e| conversion_failure(&e))?;
        }
        if truncated {
            self.diagnostics = diagnostic(
                SQLSTATE_STRING_TRUNCATED,
                "String data, right truncated",
            );
        }

        match result {
            Some(data) => self.open_result(data),
            None => self.row_count = -1,
        }
        Ok(())
    }
}

fn missing_table(table: &str) -> Diagnostics {
    diagnostic("42S02", format!("Invalid object name '{}'", table))
}

fn echo_column(index: usize, value: &Value) -> MemoryColumn {
    use crate::protocol::types::SqlType;

    let name = format!("p{}", index + 1);
    match value {
        Value::Null => MemoryColumn::new(name, SqlType::Varchar).with_size(1),
        Value::Integer(_) => MemoryColumn::new(name, SqlType::Integer),
        Value::BigInt(_) => MemoryColumn::new(name, SqlType::BigInt),
        Value::Double(_) => MemoryColumn::new(name, SqlType::Double),
        Value::Boolean(_) => MemoryColumn::new(name, SqlType::Bit),
        Value::Text(s) => {
            MemoryColumn::new(name, SqlType::Varchar).with_size(s.chars().count().max(1))
        }
        Value::Binary(b) => MemoryColumn::new(name, SqlType::Varbinary).with_size(b.len().max(1)),
        Value::Timestamp(_) => MemoryColumn::new(name, SqlType::Timestamp).with_decimal_digits(9),
    }
}

/// Parse `{ CALL [catalog.][schema.]name(?, ...) }`.
fn parse_call(sql: &str) -> Option<(Option<String>, String)> {
    let inner = sql.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    let (keyword, rest) = inner.split_once(char::is_whitespace)?;
    if !keyword.eq_ignore_ascii_case("call") {
        return None;
    }
    let target = rest.split('(').next()?.trim();
    let mut parts: Vec<&str> = target.split('.').collect();
    let name = parts.pop()?.to_string();
    let schema = parts.pop().map(str::to_string);
    Some((schema, name))
}

impl StatementHandle for MemoryStatement {
    fn set_cursor_name(&mut self, name: &str) -> DriverResult<()> {
        self.ensure_live()?;
        if name.is_empty() {
            return Err(diagnostic("34000", "Invalid cursor name"));
        }
        self.cursor_name = Some(name.to_string());
        Ok(())
    }

    fn set_query_timeout(&mut self, timeout: Duration) -> DriverResult<()> {
        self.ensure_live()?;
        self.query_timeout = Some(timeout);
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> DriverResult<()> {
        self.ensure_live()?;
        self.result = None;
        let markers = sql.matches('?').count() as u16;

        let prepared = if let Some((schema, name)) = parse_call(sql) {
            Prepared::Call { schema, name }
        } else {
            let script = self.db.state().scripts.get(sql.trim()).cloned();
            match script {
                Some(script) => Prepared::Script(script),
                None => {
                    return Err(diagnostic(
                        SQLSTATE_SYNTAX_ERROR,
                        format!("Syntax error or access violation: {}", sql.trim()),
                    ))
                }
            }
        };
        self.prepared = Some((prepared, markers));
        Ok(())
    }

    fn num_params(&mut self) -> DriverResult<u16> {
        self.ensure_live()?;
        self.prepared
            .as_ref()
            .map(|(_, markers)| *markers)
            .ok_or_else(|| diagnostic(SQLSTATE_FUNCTION_SEQUENCE, "Function sequence error"))
    }

    fn execute(&mut self, params: &mut ParameterSet) -> DriverResult<()> {
        self.ensure_live()?;
        let (prepared, markers) = self
            .prepared
            .clone()
            .ok_or_else(|| diagnostic(SQLSTATE_FUNCTION_SEQUENCE, "Function sequence error"))?;
        if params.len() != usize::from(markers) {
            return Err(diagnostic(
                SQLSTATE_COUNT_FIELD_INCORRECT,
                "COUNT field incorrect or syntax error",
            ));
        }

        let values = params
            .iter()
            .map(|p| p.value())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| conversion_failure(&e))?;

        self.result = None;
        self.row_count = -1;
        self.diagnostics = Diagnostics::default();
        self.db.state().stats.executions += 1;

        match prepared {
            Prepared::Script(script) => self.run_script(script, values),
            Prepared::Call { schema, name } => {
                self.run_call(schema.as_deref(), &name, params, values)
            }
        }
    }

    fn num_result_cols(&mut self) -> DriverResult<u16> {
        self.ensure_live()?;
        Ok(self.result.as_ref().map_or(0, |r| r.columns.len() as u16))
    }

    fn describe_col(&mut self, column: u16) -> DriverResult<DescribedColumn> {
        self.ensure_live()?;
        if self.db.state().faults.fail_describe {
            return Err(diagnostic(SQLSTATE_GENERAL_ERROR, "Describe failed"));
        }
        let result = self.result()?;
        let c = usize::from(column)
            .checked_sub(1)
            .and_then(|i| result.columns.get(i))
            .ok_or_else(|| diagnostic(SQLSTATE_INVALID_DESCRIPTOR_INDEX, "Invalid descriptor index"))?;
        Ok(DescribedColumn::new(c.name.clone(), c.sql_type.code())
            .with_size(c.column_size)
            .with_decimal_digits(c.decimal_digits)
            .with_nullable(if c.nullable { SQL_NULLABLE } else { SQL_NO_NULLS }))
    }

    fn bind_columns(&mut self, bindings: &[ColumnBinding]) -> DriverResult<()> {
        self.ensure_live()?;
        let result = self.result()?;
        let double_bind = self.db.state().faults.double_bind;
        for binding in bindings {
            let column = usize::from(binding.column)
                .checked_sub(1)
                .and_then(|i| result.columns.get(i))
                .ok_or_else(|| {
                    diagnostic(SQLSTATE_INVALID_DESCRIPTOR_INDEX, "Invalid descriptor index")
                })?;
            if !double_bind
                && binding.bind_type == BindType::Double
                && column.sql_type.family() == TypeFamily::Numeric
            {
                return Err(diagnostic(
                    SQLSTATE_RESTRICTED_DATA_TYPE,
                    "Restricted data type attribute violation",
                ));
            }
        }
        self.bindings = bindings.to_vec();
        Ok(())
    }

    fn set_row_array_size(&mut self, rows: usize) -> DriverResult<()> {
        self.ensure_live()?;
        self.row_array_size = rows.max(1);
        Ok(())
    }

    fn fetch(&mut self, batch: &mut RowBatch) -> DriverResult<FetchOutcome> {
        self.ensure_live()?;
        self.result()?;

        let faults = {
            let mut db = self.db.state();
            db.stats.fetch_calls += 1;
            let calls = db.stats.fetch_calls;
            if let Some((n, diagnostics)) = &db.faults.fail_fetch {
                if *n == calls {
                    return Err(diagnostics.clone());
                }
            }
            db.faults.clone()
        };

        let bound_as_registered = batch.capacity() == self.row_array_size
            && batch.columns().len() == self.bindings.len()
            && batch.columns().iter().zip(&self.bindings).all(|(buffer, binding)| {
                buffer.column() == binding.column
                    && buffer.bind_type() == binding.bind_type
                    && buffer.stride() == binding.stride
            });
        if !bound_as_registered {
            return Err(diagnostic(
                SQLSTATE_FUNCTION_SEQUENCE,
                "Batch does not match the bound columns",
            ));
        }

        let Some(result) = self.result.as_mut() else {
            return Err(diagnostic(SQLSTATE_INVALID_CURSOR_STATE, "Invalid cursor state"));
        };
        if result.position >= result.rows.len() {
            return Ok(FetchOutcome::NoData);
        }

        let count = (result.rows.len() - result.position).min(batch.capacity());
        result.batch_start = result.position;
        let mut row_errors = false;
        let mut warnings = Vec::new();

        for slot in 0..batch.capacity() {
            if slot >= count {
                batch.set_row_status(slot, RowStatus::NoRow);
                continue;
            }
            let absolute = result.position + slot;
            if faults.error_row == Some(absolute) {
                batch.set_row_status(slot, RowStatus::Error);
                row_errors = true;
                continue;
            }

            let row = &result.rows[absolute];
            let mut status = RowStatus::Success;
            for buffer in batch.columns_mut() {
                let value = row
                    .get(usize::from(buffer.column()) - 1)
                    .unwrap_or(&Value::Null);
                let bind = buffer.bind_type();
                let outcome =
                    write_value(value, bind, buffer.slot_mut(slot)).map_err(|e| conversion_failure(&e))?;
                let indicator = if outcome.truncated && faults.unknown_lengths && bind.is_variable() {
                    Indicator::NoTotal
                } else {
                    outcome.indicator
                };
                buffer.set_indicator(slot, indicator);
                if outcome.truncated {
                    status = RowStatus::SuccessWithInfo;
                    let record = if bind.is_variable() {
                        DiagnosticRecord::new(SQLSTATE_STRING_TRUNCATED, 0, "String data, right truncated")
                    } else {
                        DiagnosticRecord::new(SQLSTATE_FRACTIONAL_TRUNCATION, 0, "Fractional truncation")
                    };
                    warnings.push(record.at(slot + 1, buffer.column()));
                }
            }
            batch.set_row_status(slot, status);
        }

        result.position += count;
        batch.set_rows_fetched(count);
        self.diagnostics = if row_errors {
            Diagnostics::new(vec![
                DiagnosticRecord::new(SQLSTATE_GENERAL_ERROR, 0, "Error in row"),
                DiagnosticRecord::new(SQLSTATE_NUMERIC_OUT_OF_RANGE, 0, "Numeric value out of range"),
            ])
        } else {
            Diagnostics::new(warnings)
        };
        Ok(FetchOutcome::Rows(count))
    }

    fn get_data(
        &mut self,
        row: usize,
        column: u16,
        bind_type: BindType,
        offset: usize,
        buf: &mut [u8],
    ) -> DriverResult<GetDataOutcome> {
        self.ensure_live()?;
        let unknown_lengths = {
            let mut db = self.db.state();
            db.stats.get_data_calls += 1;
            db.faults.unknown_lengths
        };
        let result = self.result()?;
        let value = result
            .rows
            .get(result.batch_start + row)
            .and_then(|r| r.get(usize::from(column).wrapping_sub(1)))
            .ok_or_else(|| diagnostic(SQLSTATE_INVALID_DESCRIPTOR_INDEX, "Invalid descriptor index"))?;
        if value.is_null() {
            return Ok(GetDataOutcome::Data(Indicator::Null));
        }

        let full = value_bytes(value, bind_type);
        if offset >= full.len() {
            return Ok(GetDataOutcome::NoData);
        }
        let remaining = &full[offset..];
        let room = text_room(buf.len(), bind_type);
        let copied = remaining.len().min(room);
        buf[..copied].copy_from_slice(&remaining[..copied]);
        let terminator = bind_type.terminator_len();
        if buf.len() >= copied + terminator {
            buf[copied..copied + terminator].fill(0);
        }

        let indicator = if unknown_lengths && copied < remaining.len() {
            Indicator::NoTotal
        } else {
            Indicator::Length(remaining.len())
        };
        Ok(GetDataOutcome::Data(indicator))
    }

    fn row_count(&mut self) -> DriverResult<i64> {
        self.ensure_live()?;
        Ok(self.row_count)
    }

    fn close_cursor(&mut self) -> DriverResult<()> {
        self.ensure_live()?;
        self.result = None;
        Ok(())
    }

    fn diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn tables(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        table_type: Option<&str>,
    ) -> DriverResult<()> {
        self.ensure_live()?;
        let data = catalog::tables(&self.db.state(), catalog, schema, table, table_type);
        self.open_result(data);
        Ok(())
    }

    fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> DriverResult<()> {
        self.ensure_live()?;
        let data = catalog::columns(&self.db.state(), catalog, schema, table, column);
        self.open_result(data);
        Ok(())
    }

    fn procedures(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: Option<&str>,
    ) -> DriverResult<()> {
        self.ensure_live()?;
        let data = catalog::procedures(&self.db.state(), catalog, schema, procedure);
        self.open_result(data);
        Ok(())
    }

    fn procedure_columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        procedure: Option<&str>,
        column: Option<&str>,
    ) -> DriverResult<()> {
        self.ensure_live()?;
        let data =
            catalog::procedure_columns(&self.db.state(), catalog, schema, procedure, column);
        self.open_result(data);
        Ok(())
    }

    fn free(&mut self) -> DriverResult<()> {
        self.ensure_live()?;
        {
            let mut session = self.session.lock();
            session.open_statements = session.open_statements.saturating_sub(1);
        }
        self.freed = true;
        self.result = None;
        self.bindings.clear();
        self.db.state().stats.statements_freed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        assert_eq!(
            parse_call("{ CALL dbo.report(?, ?) }"),
            Some((Some("dbo".to_string()), "report".to_string()))
        );
        assert_eq!(
            parse_call("{call ping()}"),
            Some((None, "ping".to_string()))
        );
        assert_eq!(parse_call("SELECT 1"), None);
    }
}
