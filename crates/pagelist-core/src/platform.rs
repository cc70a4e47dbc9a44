//! Platform abstraction for the controller runtime.
//!
//! The runtime never drives itself: whenever work becomes available it asks
//! the host, through a [`RuntimeScheduler`], to drain it on the owning thread.

/// Requests runtime drains from the host.
///
/// Implementations must be safe to use from multiple threads, since wakers
/// and cross-thread posts call into the scheduler from wherever they run.
pub trait RuntimeScheduler: Send + Sync {
    /// Ask the host to call [`RuntimeHandle::drain`](crate::RuntimeHandle::drain) soon.
    fn schedule_drain(&self);
}
