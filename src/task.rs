//! Background units of work.
//!
//! Every public operation runs its driver calls on tokio's blocking pool and
//! hands back a [`Task`], which resolves to exactly one result.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// A database operation running in the background.
#[must_use = "tasks do nothing unless awaited"]
#[derive(Debug)]
pub struct Task<T> {
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Run `work` on the blocking pool.
    pub(crate) fn spawn_blocking<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self {
            handle: tokio::task::spawn_blocking(work),
        }
    }

    /// Cancel the work if it has not started yet. Work already running
    /// continues to completion; awaiting the task then reports
    /// [`Error::Task`].
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(Error::Task(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_resolves_once() {
        let task = Task::spawn_blocking(|| Ok(21 * 2));
        assert_eq!(task.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_task_error_passes_through() {
        let task: Task<()> =
            Task::spawn_blocking(|| Err(Error::protocol_mismatch("bad parameter count")));
        assert!(matches!(task.await, Err(Error::ProtocolMismatch { .. })));
    }

    #[tokio::test]
    async fn test_panicking_task() {
        let task: Task<()> = Task::spawn_blocking(|| panic!("driver crashed"));
        assert!(matches!(task.await, Err(Error::Task(_))));
    }
}
