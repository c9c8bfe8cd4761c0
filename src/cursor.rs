//! Cursor-mode results.
//!
//! A [`Cursor`] keeps its statement open and bound between page requests.
//! Each [`fetch_page`](Cursor::fetch_page) is one background unit of work
//! returning at most one batch of rows, so no more than one batch is held in
//! memory ahead of the caller.
//!
//! # Example
//!
//! ```no_run
//! use odbc_bridge_rs::memory::MemoryDatabase;
//! use odbc_bridge_rs::{Connection, QueryOptions, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> odbc_bridge_rs::Result<()> {
//!     let db = MemoryDatabase::new();
//!     let conn = Connection::new(db.connect(), SessionOptions::new())?;
//!
//!     let execution = conn
//!         .execute("SELECT * FROM users", Vec::new(), QueryOptions::new().with_fetch_size(50))
//!         .await?;
//!     if let Some(cursor) = execution.into_cursor() {
//!         loop {
//!             let page = cursor.fetch_page().await?;
//!             if page.is_empty() && cursor.is_exhausted() {
//!                 break;
//!             }
//!             println!("{} rows", page.len());
//!         }
//!         cursor.close().await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::RowShape;
use crate::error::Result;
use crate::protocol::env::{Liveness, StatementContext};
use crate::protocol::fetch::FetchEngine;
use crate::protocol::handle::StatementHandle;
use crate::protocol::projector::project;
use crate::protocol::types::ColumnDescriptor;
use crate::result::ResultSet;
use crate::task::Task;

struct CursorState<S: StatementHandle> {
    ctx: StatementContext<S>,
    engine: FetchEngine,
}

/// An open result set read page by page.
///
/// Dropping the cursor frees its statement.
pub struct Cursor<S: StatementHandle> {
    state: Arc<Mutex<CursorState<S>>>,
    columns: Vec<ColumnDescriptor>,
    liveness: Liveness,
    exhausted: Arc<AtomicBool>,
    shape: RowShape,
    fetch_size: usize,
}

impl<S: StatementHandle> Cursor<S> {
    pub(crate) fn new(ctx: StatementContext<S>, engine: FetchEngine, shape: RowShape) -> Self {
        let columns = engine.columns().to_vec();
        let liveness = ctx.liveness().clone();
        let fetch_size = engine.batch_size();
        debug!(columns = columns.len(), fetch_size, "opened cursor");
        Self {
            state: Arc::new(Mutex::new(CursorState { ctx, engine })),
            columns,
            liveness,
            exhausted: Arc::new(AtomicBool::new(false)),
            shape,
            fetch_size,
        }
    }

    /// Column metadata for this cursor.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Rows requested per page.
    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    /// Whether the end of the result has been reached. Later pages are empty
    /// and do not call the driver.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.liveness.is_statement_closed()
    }

    /// Fetch the next page: at most `fetch_size` rows.
    ///
    /// Pages of one cursor must be requested one at a time.
    pub fn fetch_page(&self) -> Task<ResultSet> {
        let state = Arc::clone(&self.state);
        let liveness = self.liveness.clone();
        let exhausted = Arc::clone(&self.exhausted);
        let columns = self.columns.clone();
        let shape = self.shape;

        Task::spawn_blocking(move || {
            liveness.ensure_open()?;
            let mut guard = state.lock();
            let CursorState { ctx, engine } = &mut *guard;
            let rows = engine.fetch_batch(ctx)?;
            if engine.is_exhausted() {
                exhausted.store(true, Ordering::Release);
            }
            drop(guard);
            project(rows, columns, shape, -1, Vec::new())
        })
    }

    /// Close the cursor and release its buffers and statement.
    ///
    /// The statement is marked closed at once, so a page request still in
    /// flight fails at its next driver call. Closing twice is harmless.
    pub fn close(&self) -> Task<()> {
        self.liveness.close_statement();
        let state = Arc::clone(&self.state);

        Task::spawn_blocking(move || {
            let mut guard = state.lock();
            let CursorState { ctx, engine } = &mut *guard;
            engine.release();
            if !ctx.is_freed() {
                ctx.close()?;
                debug!("closed cursor");
            }
            Ok(())
        })
    }
}

impl<S: StatementHandle> fmt::Debug for Cursor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("columns", &self.column_names())
            .field("fetch_size", &self.fetch_size)
            .field("exhausted", &self.is_exhausted())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Extension trait for converting a [`Cursor`] into a stream of pages.
///
/// # Example
///
/// ```no_run
/// use futures::stream::TryStreamExt;
/// use odbc_bridge_rs::memory::MemoryDatabase;
/// use odbc_bridge_rs::{Connection, CursorStreamExt, QueryOptions, SessionOptions};
///
/// #[tokio::main]
/// async fn main() -> odbc_bridge_rs::Result<()> {
///     let db = MemoryDatabase::new();
///     let conn = Connection::new(db.connect(), SessionOptions::new())?;
///     let execution = conn
///         .execute("SELECT * FROM users", Vec::new(), QueryOptions::new().with_fetch_size(10))
///         .await?;
///
///     if let Some(cursor) = execution.into_cursor() {
///         let pages: Vec<_> = cursor.into_stream().try_collect().await?;
///         println!("{} pages", pages.len());
///     }
///     Ok(())
/// }
/// ```
pub trait CursorStreamExt: Sized {
    /// Convert this cursor into a stream of non-empty pages.
    ///
    /// The stream ends when the result is exhausted, or after yielding the
    /// first error.
    fn into_stream(self) -> impl Stream<Item = Result<ResultSet>> + Send;
}

impl<S: StatementHandle> CursorStreamExt for Cursor<S> {
    fn into_stream(self) -> impl Stream<Item = Result<ResultSet>> + Send {
        use futures::stream;

        stream::unfold(Some(self), |cursor| async move {
            let cursor = cursor?;
            if cursor.is_exhausted() {
                return None;
            }
            match cursor.fetch_page().await {
                Ok(page) if page.is_empty() && cursor.is_exhausted() => None,
                Ok(page) => Some((Ok(page), Some(cursor))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
