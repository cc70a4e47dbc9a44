//! Standard runtime services backed by Rust's `std` library.
//!
//! [`StdScheduler`] turns drain requests into a condition a host thread can
//! park on, [`StdRuntime`] runs a [`pagelist_core::Runtime`] loop on top of
//! it, and [`ThreadedPageSource`] performs blocking fetches on worker threads.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use pagelist_core::{
    FetchError, PageFuture, PageResponse, PageSource, Runtime, RuntimeHandle, RuntimeScheduler,
};

/// Drain signal a host thread can block on.
///
/// Requests from any thread collapse into one pending flag; the owner thread
/// consumes it with [`take_drain_request`](Self::take_drain_request) or parks
/// on it with [`wait_for_drain`](Self::wait_for_drain).
#[derive(Default)]
pub struct StdScheduler {
    requested: Mutex<bool>,
    signal: Condvar,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn requested(&self) -> MutexGuard<'_, bool> {
        self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consumes a pending drain request without blocking.
    pub fn take_drain_request(&self) -> bool {
        std::mem::take(&mut *self.requested())
    }

    /// Blocks until a drain is requested or `timeout` passes. Consumes the
    /// request and returns whether there was one.
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        let guard = self.requested();
        let (mut requested, _) = self
            .signal
            .wait_timeout_while(guard, timeout, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *requested)
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("requested", &*self.requested())
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_drain(&self) {
        *self.requested() = true;
        self.signal.notify_all();
    }
}

/// A [`Runtime`] driven by a blocking host loop on the current thread.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::new());
        let runtime = Runtime::new(scheduler.clone());
        Self { scheduler, runtime }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Drains if a drain was requested. Returns whether it ran.
    pub fn drain_if_requested(&self) -> bool {
        let requested = self.scheduler.take_drain_request();
        if requested {
            self.runtime.drain();
        }
        requested
    }

    /// Parks for up to `timeout` waiting for work, then drains it.
    pub fn turn(&self, timeout: Duration) -> bool {
        let requested = self.scheduler.wait_for_drain(timeout);
        if requested {
            self.runtime.drain();
        }
        requested
    }

    /// Runs the loop until `done` holds or `timeout` elapses. Returns whether
    /// `done` was reached.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        self.drain_if_requested();
        while !done() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("runtime loop gave up after {timeout:?}");
                return false;
            }
            self.turn(remaining);
        }
        true
    }

    pub fn drain(&self) {
        self.runtime.drain();
    }

    pub fn has_pending(&self) -> bool {
        self.runtime.has_pending()
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("pending", &self.has_pending())
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

type BlockingFetch<T> = dyn Fn(usize, usize) -> Result<PageResponse<T>, FetchError> + Send + Sync;

/// Page source that runs a blocking fetch function on a fresh worker thread
/// per request.
///
/// The response travels back through a oneshot channel, so the controller
/// still applies it on its own runtime thread.
pub struct ThreadedPageSource<T> {
    fetch: Arc<BlockingFetch<T>>,
}

impl<T> ThreadedPageSource<T> {
    pub fn new(
        fetch: impl Fn(usize, usize) -> Result<PageResponse<T>, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fetch: Arc::new(fetch),
        }
    }
}

impl<T> Clone for ThreadedPageSource<T> {
    fn clone(&self) -> Self {
        Self {
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<T: Send + 'static> PageSource<T> for ThreadedPageSource<T> {
    fn get(&self, page: usize, size: usize) -> PageFuture<T> {
        let (reply, response) = oneshot::channel();
        let fetch = Arc::clone(&self.fetch);
        let worker = thread::Builder::new()
            .name(format!("page-fetch-{page}"))
            .spawn(move || {
                if reply.send(fetch(page, size)).is_err() {
                    log::debug!("page {page} fetched after its request was dropped");
                }
            });

        if let Err(err) = worker {
            log::warn!("could not start fetch worker for page {page}: {err}");
            return Box::pin(futures::future::ready(Err(FetchError::new(err))));
        }

        Box::pin(async move {
            response
                .await
                .unwrap_or_else(|_| Err(FetchError::msg("fetch worker exited without a response")))
        })
    }
}

#[cfg(test)]
#[path = "tests/std_runtime_tests.rs"]
mod tests;
