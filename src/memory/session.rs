//! In-memory session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::protocol::constants::SQLSTATE_CONNECTION_NOT_OPEN;
use crate::protocol::handle::{DriverCapabilities, DriverResult, SessionHandle};
use crate::protocol::types::Value;

use super::convert::diagnostic;
use super::database::MemoryDatabase;
use super::statement::MemoryStatement;

/// Per-session state shared with the session's statements.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub connected: bool,
    pub autocommit: bool,
    pub connection_timeout: Option<Duration>,
    /// Inserts held back until commit.
    pub pending: Vec<(String, Vec<Value>)>,
    /// Statements allocated on this session and not yet freed.
    pub open_statements: usize,
}

impl SessionState {
    pub fn ensure_connected(&self) -> DriverResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(diagnostic(SQLSTATE_CONNECTION_NOT_OPEN, "Connection not open"))
        }
    }
}

/// A session on a [`MemoryDatabase`].
#[derive(Debug)]
pub struct MemorySession {
    db: MemoryDatabase,
    state: Arc<Mutex<SessionState>>,
}

impl MemorySession {
    pub(crate) fn new(db: MemoryDatabase) -> Self {
        Self {
            db,
            state: Arc::new(Mutex::new(SessionState {
                connected: true,
                autocommit: true,
                connection_timeout: None,
                pending: Vec::new(),
                open_statements: 0,
            })),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn autocommit(&self) -> bool {
        self.state.lock().autocommit
    }

    pub fn connection_timeout(&self) -> Option<Duration> {
        self.state.lock().connection_timeout
    }

    /// Apply or discard held-back inserts.
    fn finish_pending(&self, commit: bool) {
        let pending = std::mem::take(&mut self.state.lock().pending);
        let mut db = self.db.state();
        if commit {
            for (table, row) in pending {
                if let Some(t) = db.table_mut(&table) {
                    t.rows.push(row);
                }
            }
            db.stats.commits += 1;
        } else {
            db.stats.rollbacks += 1;
        }
    }
}

impl SessionHandle for MemorySession {
    type Statement = MemoryStatement;

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities {
            supports_double_bind: self.db.state().faults.double_bind,
        }
    }

    fn alloc_statement(&mut self) -> DriverResult<MemoryStatement> {
        {
            let mut state = self.state.lock();
            state.ensure_connected()?;
            state.open_statements += 1;
        }
        self.db.state().stats.statements_allocated += 1;
        Ok(MemoryStatement::new(self.db.clone(), Arc::clone(&self.state)))
    }

    fn set_connection_timeout(&mut self, timeout: Duration) -> DriverResult<()> {
        self.state.lock().connection_timeout = Some(timeout);
        Ok(())
    }

    fn set_autocommit(&mut self, enabled: bool) -> DriverResult<()> {
        let was_enabled = {
            let mut state = self.state.lock();
            state.ensure_connected()?;
            std::mem::replace(&mut state.autocommit, enabled)
        };
        // Turning autocommit back on commits the open transaction.
        if enabled && !was_enabled && !self.state.lock().pending.is_empty() {
            self.finish_pending(true);
        }
        Ok(())
    }

    fn end_transaction(&mut self, commit: bool) -> DriverResult<()> {
        self.state.lock().ensure_connected()?;
        self.finish_pending(commit);
        Ok(())
    }

    fn disconnect(&mut self) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        state.connected = false;
        state.pending.clear();
        // Disconnecting releases every statement still open on the session.
        let released = std::mem::take(&mut state.open_statements);
        drop(state);
        let mut db = self.db.state();
        db.stats.statements_freed += released;
        db.stats.disconnects += 1;
        Ok(())
    }
}
