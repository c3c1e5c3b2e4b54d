use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

/// Counter of free execution slots.
///
/// Never blocks; blocking admission is layered on top by
/// [`StageTracker`](super::tracker::StageTracker). The pool does not know
/// which stage or pipeline holds a slot, so one pool can be shared between
/// pipelines running at the same time.
#[derive(Debug)]
pub struct WorkerPool {
    capacity: usize,
    free: AtomicUsize,
}

impl WorkerPool {
    /// A pool with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            free: AtomicUsize::new(capacity),
        }
    }

    /// A pool with one slot per available core.
    pub fn with_available_parallelism() -> Self {
        Self::new(available_cores())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_slots(&self) -> usize {
        self.free.load(Ordering::Acquire)
    }

    /// Take a slot if one is free.
    pub fn try_reserve(&self) -> bool {
        self.free
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Return a slot taken with [`Self::try_reserve`].
    pub fn release(&self) {
        let released = self
            .free
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok();
        if !released {
            warn!(capacity = self.capacity, "Released a slot that was never reserved");
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Number of cores available to this process, at least one.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
