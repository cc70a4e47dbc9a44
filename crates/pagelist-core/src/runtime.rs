//! Single-thread runtime that owns controller work.
//!
//! Controllers and their observers live on one thread, the owner. Page
//! fetches are spawned here as futures and their completions run during
//! [`RuntimeHandle::drain`], so every notification is delivered on the owner
//! no matter where the backing source did its work.
//!
//! Three kinds of work are queued: local jobs (non-`Send` closures queued from
//! the owner), remote jobs (`Send` closures posted from any thread through a
//! [`Dispatcher`]) and spawned futures.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::task::{Context, Poll, Waker};
use std::thread::{self, ThreadId};

use crate::platform::RuntimeScheduler;

type LocalJob = Box<dyn FnOnce() + 'static>;
type RemoteJob = Box<dyn FnOnce() + Send + 'static>;
type LocalFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;

/// Sending half of the remote job queue, shared with every [`Dispatcher`].
struct Outbox {
    scheduler: Arc<dyn RuntimeScheduler>,
    jobs: mpsc::Sender<RemoteJob>,
    queued: AtomicUsize,
}

impl Outbox {
    fn post(&self, job: RemoteJob) {
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.jobs.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            log::warn!("dropping job posted to a runtime that no longer exists");
            return;
        }
        self.scheduler.schedule_drain();
    }

    fn has_queued(&self) -> bool {
        self.queued.load(Ordering::SeqCst) > 0
    }
}

/// Cross-thread entry point into a runtime.
///
/// Unlike [`RuntimeHandle`], a dispatcher is `Send + Sync` and can be moved
/// into worker threads that need to hand results back to the owner.
#[derive(Clone)]
pub struct Dispatcher {
    outbox: Arc<Outbox>,
}

impl Dispatcher {
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        self.outbox.post(Box::new(job));
    }

    /// Whether posted jobs are still waiting for a drain.
    pub fn has_pending(&self) -> bool {
        self.outbox.has_queued()
    }
}

struct Spawned {
    id: u64,
    future: LocalFuture,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    outbox: Arc<Outbox>,
    inbox: mpsc::Receiver<RemoteJob>,
    local: RefCell<VecDeque<LocalJob>>,
    spawned: RefCell<Vec<Spawned>>,
    next_id: Cell<u64>,
    waker: Waker,
    owner: ThreadId,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        let (jobs, inbox) = mpsc::channel();
        let outbox = Arc::new(Outbox {
            scheduler: Arc::clone(&scheduler),
            jobs,
            queued: AtomicUsize::new(0),
        });
        let waker = futures_task::waker(Arc::new(DrainWaker {
            scheduler: Arc::clone(&scheduler),
        }));
        Self {
            scheduler,
            outbox,
            inbox,
            local: RefCell::new(VecDeque::new()),
            spawned: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            waker,
            owner: thread::current().id(),
        }
    }

    fn enqueue(&self, job: LocalJob) {
        self.local.borrow_mut().push_back(job);
        self.scheduler.schedule_drain();
    }

    fn spawn(&self, future: LocalFuture) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.spawned.borrow_mut().push(Spawned { id, future });
        self.scheduler.schedule_drain();
        id
    }

    fn cancel(&self, id: u64) {
        self.spawned.borrow_mut().retain(|task| task.id != id);
    }

    fn run_remote(&self) -> bool {
        let jobs: Vec<RemoteJob> = self.inbox.try_iter().collect();
        let ran = !jobs.is_empty();
        for job in jobs {
            self.outbox.queued.fetch_sub(1, Ordering::SeqCst);
            job();
        }
        ran
    }

    fn run_local(&self) -> bool {
        let mut ran = false;
        loop {
            // The queue must not stay borrowed while a job runs: jobs enqueue.
            let Some(job) = self.local.borrow_mut().pop_front() else {
                break;
            };
            ran = true;
            job();
        }
        ran
    }

    /// Polls every spawned future once. Returns whether any finished.
    fn poll_spawned(&self) -> bool {
        let mut cx = Context::from_waker(&self.waker);
        // Moved out so that a future may spawn or cancel while being polled.
        let batch = std::mem::take(&mut *self.spawned.borrow_mut());
        let mut finished = false;
        let mut still_pending = Vec::with_capacity(batch.len());
        for mut task in batch {
            match task.future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => finished = true,
                Poll::Pending => still_pending.push(task),
            }
        }
        if !still_pending.is_empty() {
            let mut spawned = self.spawned.borrow_mut();
            // Older tasks keep their place ahead of ones spawned while polling.
            still_pending.append(&mut spawned);
            *spawned = still_pending;
        }
        finished
    }

    fn drain(&self) {
        loop {
            let remote = self.run_remote();
            let local = self.run_local();
            let spawned = self.poll_spawned();
            if !(remote || local || spawned) {
                break;
            }
        }
    }

    fn has_pending(&self) -> bool {
        let local = self.local.try_borrow().map_or(true, |jobs| !jobs.is_empty());
        let spawned = self
            .spawned
            .try_borrow()
            .map_or(true, |tasks| !tasks.is_empty());
        local || spawned || self.outbox.has_queued()
    }
}

/// Owner of the runtime state. Dropping the last `Runtime` invalidates every
/// [`RuntimeHandle`] created from it.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
            dispatcher: Dispatcher {
                outbox: Arc::clone(&self.inner.outbox),
            },
            owner: self.inner.owner,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn drain(&self) {
        self.inner.drain();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Arc::new(DefaultScheduler))
    }
}

/// Scheduler for hosts that drain the runtime on their own cadence.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_drain(&self) {}
}

/// Weak, cloneable reference to a [`Runtime`], usable only on its owner
/// thread except for [`post`](Self::post).
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
    dispatcher: Dispatcher,
    owner: ThreadId,
}

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Queues a closure for the next drain. Runs it right away when the
    /// runtime is already gone.
    pub fn enqueue_local(&self, job: impl FnOnce() + 'static) {
        match self.inner.upgrade() {
            Some(inner) => inner.enqueue(Box::new(job)),
            None => job(),
        }
    }

    /// Spawns a future polled during drains.
    ///
    /// Returns `None`, dropping the future unpolled, when the runtime is gone.
    pub fn spawn_local<F>(&self, future: F) -> Option<TaskHandle>
    where
        F: Future<Output = ()> + 'static,
    {
        let inner = self.inner.upgrade()?;
        let id = inner.spawn(Box::pin(future));
        Some(TaskHandle {
            id,
            runtime: self.clone(),
        })
    }

    pub fn cancel_task(&self, id: u64) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel(id);
        }
    }

    /// Queues `job` from any thread to run on the owner.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        self.dispatcher.post(job);
    }

    pub fn drain(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain();
        }
    }

    pub fn has_pending(&self) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.has_pending(),
            None => self.dispatcher.has_pending(),
        }
    }

    pub fn assert_owner_thread(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "controller touched off its runtime thread"
        );
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }
}

/// Handle to a spawned future.
pub struct TaskHandle {
    id: u64,
    runtime: RuntimeHandle,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Drops the future without polling it again.
    pub fn cancel(self) {
        self.runtime.cancel_task(self.id);
    }
}

/// Wakes spawned futures by asking the host for a drain.
struct DrainWaker {
    scheduler: Arc<dyn RuntimeScheduler>,
}

impl futures_task::ArcWake for DrainWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.scheduler.schedule_drain();
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
