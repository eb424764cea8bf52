//! Deferred cache reads.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::CacheError;

/// The pending result of a cache read.
///
/// Await it from async code, or call [`Deferred::wait`] from a plain thread.
#[must_use = "a deferred read does nothing unless awaited or waited on"]
pub struct Deferred<T> {
    rx: oneshot::Receiver<Result<T, CacheError>>,
}

impl<T> Deferred<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T, CacheError>>) -> Self {
        Self { rx }
    }

    /// Block the current thread until the read completes.
    ///
    /// Must not be called from inside an async runtime; await instead.
    pub fn wait(self) -> Result<T, CacheError> {
        self.rx.blocking_recv().unwrap_or(Err(CacheError::Canceled))
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, CacheError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CacheError::Canceled)))
    }
}
