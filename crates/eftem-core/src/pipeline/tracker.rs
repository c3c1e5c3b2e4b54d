use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::pool::WorkerPool;
use super::types::{ProgressReporter, Stage};

/// Lifecycle of one stage's worker tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Configured,
    Running,
    Finished,
}

#[derive(Debug)]
struct Counters {
    state: TrackerState,
    active: usize,
    done: usize,
    last_percent: Option<u8>,
}

/// Admission ticket of one sub-task.
///
/// Must be handed back to [`StageTracker::complete_worker`].
#[must_use]
#[derive(Debug)]
pub struct WorkerSlot {
    reserved: bool,
}

impl WorkerSlot {
    /// Whether this worker holds a slot of the shared pool.
    pub fn is_reserved(&self) -> bool {
        self.reserved
    }
}

/// Admits the sub-tasks of one stage against a [`WorkerPool`] and reports
/// the stage's progress.
///
/// A sub-task is admitted when the pool has a free slot. If the pool is
/// exhausted by other users while this stage has nothing in flight, one
/// sub-task is admitted without a slot so the stage always makes progress.
#[derive(Debug)]
pub struct StageTracker {
    stage: Stage,
    sub_tasks: usize,
    pool: Arc<WorkerPool>,
    counters: Mutex<Counters>,
    changed: Condvar,
    panicked: AtomicBool,
}

impl StageTracker {
    pub fn new(stage: Stage, sub_tasks: usize, pool: Arc<WorkerPool>) -> Self {
        let state = if sub_tasks == 0 {
            TrackerState::Finished
        } else {
            TrackerState::Configured
        };
        Self {
            stage,
            sub_tasks,
            pool,
            counters: Mutex::new(Counters {
                state,
                active: 0,
                done: 0,
                last_percent: None,
            }),
            changed: Condvar::new(),
            panicked: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> TrackerState {
        self.lock().state
    }

    pub fn active(&self) -> usize {
        self.lock().active
    }

    pub fn done(&self) -> usize {
        self.lock().done
    }

    /// Block until the next sub-task may start, then count it as active.
    pub fn add_worker(&self) -> WorkerSlot {
        let mut counters = self.lock();
        loop {
            if self.pool.try_reserve() {
                counters.active += 1;
                counters.state = TrackerState::Running;
                return WorkerSlot { reserved: true };
            }
            if counters.active == 0 {
                debug!(stage = %self.stage, "Pool exhausted, admitting worker without a slot");
                counters.active += 1;
                counters.state = TrackerState::Running;
                return WorkerSlot { reserved: false };
            }
            counters = self
                .changed
                .wait(counters)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Count a sub-task as done, return its slot and report progress.
    pub fn complete_worker(&self, slot: WorkerSlot, reporter: &dyn ProgressReporter) {
        let mut counters = self.lock();
        counters.active = counters.active.saturating_sub(1);
        counters.done += 1;
        if slot.reserved {
            self.pool.release();
        }

        let percent = percent_done(counters.done, self.sub_tasks);
        if counters.last_percent != Some(percent) {
            counters.last_percent = Some(percent);
            reporter.progress(percent);
        }

        if counters.active == 0 && counters.done >= self.sub_tasks {
            counters.state = TrackerState::Finished;
            self.changed.notify_all();
        } else if self.pool.free_slots() > 1 {
            self.changed.notify_all();
        } else {
            self.changed.notify_one();
        }
    }

    /// Block until every sub-task has completed.
    pub fn wait_finished(&self) {
        let mut counters = self.lock();
        while counters.state != TrackerState::Finished {
            counters = self
                .changed
                .wait(counters)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn mark_panicked(&self) {
        self.panicked.store(true, Ordering::Release);
    }

    pub fn panicked(&self) -> bool {
        self.panicked.load(Ordering::Acquire)
    }
}

fn percent_done(done: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        (done.min(total) * 100 / total) as u8
    }
}
