//! Worker pool statistics reported by connector managers.

use serde::{Deserialize, Serialize};

/// Snapshot of one worker pool's occupancy.
///
/// The `Default` value is the zero-valued snapshot reported when nothing is
/// known about a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolStats {
    /// Pool name.
    pub name: String,
    /// Workers currently running a task.
    pub active_threads: usize,
    /// Tasks waiting for a worker.
    pub queued: usize,
    /// Highest number of simultaneously active workers.
    pub highest_active_threads: usize,
    /// Tasks submitted since start.
    pub total_submitted: u64,
    /// Tasks completed since start.
    pub total_completed: u64,
}

impl WorkerPoolStats {
    /// Create an empty snapshot for a named pool.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the snapshot carries no activity.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.active_threads == 0 && self.queued == 0
    }
}
