//! In-flight work tracking for graceful close.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counts in-flight calls and lets a closer wait for them to finish.
#[derive(Debug, Default)]
pub struct WorkTracker {
    active: AtomicUsize,
    closing: AtomicBool,
    idle: Notify,
}

/// Marks one admitted call; released on drop.
#[derive(Debug)]
pub struct WorkGuard<'a> {
    tracker: &'a WorkTracker,
}

impl WorkTracker {
    /// Create an open tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one call, or `None` once the tracker is closing.
    pub fn try_begin(&self) -> Option<WorkGuard<'_>> {
        if self.closing.load(Ordering::SeqCst) {
            return None;
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = WorkGuard { tracker: self };
        // close() may have raced the increment
        if self.closing.load(Ordering::SeqCst) {
            drop(guard);
            return None;
        }
        Some(guard)
    }

    /// Stop admitting new calls.
    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    /// Number of calls in flight.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no call is in flight. Has no timeout.
    pub async fn drain(&self) {
        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        if self.tracker.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}
