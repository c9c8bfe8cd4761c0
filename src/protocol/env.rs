//! Environment lock and statement ownership.
//!
//! The driver is not assumed to be thread-safe when allocating or freeing
//! handles. Every such call, from any thread, runs while holding the single
//! [`EnvironmentLock`]. Data copies and conversions happen outside it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::handle::{DriverResult, SessionHandle, StatementHandle};

/// The process-wide lock guarding handle allocation and release.
#[derive(Debug, Default)]
pub struct EnvironmentLock {
    mutex: Mutex<()>,
}

impl EnvironmentLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared instance used when a connection is not given its own lock.
    pub fn global() -> Arc<EnvironmentLock> {
        static GLOBAL: OnceLock<Arc<EnvironmentLock>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(EnvironmentLock::new())).clone()
    }

    /// Acquire the lock for the duration of one allocate/free call.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.mutex.lock()
    }

    /// Whether some thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.mutex.is_locked()
    }
}

/// Closed flags checked before every driver call on a statement.
#[derive(Debug, Clone)]
pub struct Liveness {
    connection: Arc<AtomicBool>,
    statement: Arc<AtomicBool>,
}

impl Liveness {
    /// Flags for a new statement on a connection.
    pub fn for_statement(connection: Arc<AtomicBool>) -> Self {
        Self {
            connection,
            statement: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fail fast if the connection or the statement has been closed.
    pub fn ensure_open(&self) -> Result<()> {
        if self.connection.load(Ordering::Acquire) {
            return Err(Error::ResourceInvalid {
                resource: "connection",
            });
        }
        if self.statement.load(Ordering::Acquire) {
            return Err(Error::ResourceInvalid {
                resource: "statement",
            });
        }
        Ok(())
    }

    /// Mark the statement closed. In-flight work fails at its next call.
    pub fn close_statement(&self) {
        self.statement.store(true, Ordering::Release);
    }

    pub fn is_statement_closed(&self) -> bool {
        self.statement.load(Ordering::Acquire)
    }

    pub fn is_connection_closed(&self) -> bool {
        self.connection.load(Ordering::Acquire)
    }
}

/// Exclusive owner of one statement handle.
///
/// The handle is freed, under the environment lock, either explicitly or when
/// the context is dropped.
pub struct StatementContext<S: StatementHandle> {
    handle: Option<S>,
    lock: Arc<EnvironmentLock>,
    liveness: Liveness,
}

impl<S: StatementHandle> StatementContext<S> {
    /// Allocate a statement on `session` while holding the lock.
    pub fn allocate<H>(
        session: &mut H,
        lock: Arc<EnvironmentLock>,
        connection_closed: Arc<AtomicBool>,
    ) -> Result<Self>
    where
        H: SessionHandle<Statement = S>,
    {
        let liveness = Liveness::for_statement(connection_closed);
        liveness.ensure_open()?;
        let handle = {
            let _guard = lock.lock();
            session
                .alloc_statement()
                .map_err(|d| Error::driver("SQLAllocHandle", d))?
        };
        debug!("allocated statement handle");
        Ok(Self {
            handle: Some(handle),
            lock,
            liveness,
        })
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Run one driver call after the liveness check, naming it in errors.
    pub fn call<T>(
        &mut self,
        function: &'static str,
        f: impl FnOnce(&mut S) -> DriverResult<T>,
    ) -> Result<T> {
        self.liveness.ensure_open()?;
        let handle = self.handle.as_mut().ok_or(Error::ResourceInvalid {
            resource: "statement",
        })?;
        f(handle).map_err(|d| Error::driver(function, d))
    }

    /// Run a driver call that cannot fail, after the liveness check.
    pub fn inspect<T>(&mut self, f: impl FnOnce(&mut S) -> T) -> Result<T> {
        self.liveness.ensure_open()?;
        let handle = self.handle.as_mut().ok_or(Error::ResourceInvalid {
            resource: "statement",
        })?;
        Ok(f(handle))
    }

    /// Close any open cursor and free the handle, ignoring the statement's
    /// closed flag.
    ///
    /// Used for explicit close, which marks the statement closed before
    /// tearing it down.
    pub fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.as_mut() {
            let _guard = self.lock.lock();
            if !self.liveness.is_connection_closed() {
                if let Err(d) = handle.close_cursor() {
                    debug!(diagnostics = %d, "close_cursor during teardown failed");
                }
            }
        }
        self.free()
    }

    /// Free the handle under the lock. Idempotent.
    ///
    /// Disconnecting releases a session's statements, so once the connection
    /// is closed the handle is dropped without calling the driver.
    pub fn free(&mut self) -> Result<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };
        let _guard = self.lock.lock();
        if self.liveness.is_connection_closed() {
            debug!("connection closed, statement handle released by disconnect");
            return Ok(());
        }
        handle
            .free()
            .map_err(|d| Error::driver("SQLFreeHandle", d))?;
        debug!("freed statement handle");
        Ok(())
    }

    pub fn is_freed(&self) -> bool {
        self.handle.is_none()
    }
}

impl<S: StatementHandle> Drop for StatementContext<S> {
    fn drop(&mut self) {
        if let Err(e) = self.free() {
            warn!(error = %e, "failed to free statement handle");
        }
    }
}
