use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::consts::WORKER_THREAD_PREFIX;
use crate::error::{EftemError, Result};

use super::pool::WorkerPool;
use super::tracker::StageTracker;
use super::types::{ProgressReporter, Stage};

/// Execution resources of a pipeline run: the slot pool that bounds
/// concurrency and the threads that execute sub-tasks.
///
/// Cloning is cheap and shares both.
#[derive(Clone, Debug)]
pub struct PipelineContext {
    pool: Arc<WorkerPool>,
    threads: Arc<rayon::ThreadPool>,
}

impl PipelineContext {
    /// One worker per available core.
    pub fn new() -> Result<Self> {
        Self::with_shared_pool(Arc::new(WorkerPool::with_available_parallelism()))
    }

    pub fn with_workers(workers: usize) -> Result<Self> {
        Self::with_shared_pool(Arc::new(WorkerPool::new(workers)))
    }

    /// Use a pool that may also be shared with other pipelines.
    pub fn with_shared_pool(pool: Arc<WorkerPool>) -> Result<Self> {
        let threads = rayon::ThreadPoolBuilder::new()
            .num_threads(pool.capacity())
            .thread_name(|i| format!("{WORKER_THREAD_PREFIX}-{i}"))
            .build()
            .map_err(|e| EftemError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool,
            threads: Arc::new(threads),
        })
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn workers(&self) -> usize {
        self.pool.capacity()
    }

    /// Run `work` once per unit, never more at a time than the pool admits,
    /// and return once every unit is done.
    ///
    /// Units are admitted on the calling thread; it blocks while the pool is
    /// exhausted. A panicking unit fails the stage after the others finish.
    pub fn run_stage<T, I, F>(
        &self,
        stage: Stage,
        units: I,
        sub_tasks: usize,
        reporter: &dyn ProgressReporter,
        work: F,
    ) -> Result<()>
    where
        T: Send,
        I: IntoIterator<Item = T>,
        F: Fn(T) + Sync,
    {
        let start = Instant::now();
        let tracker = StageTracker::new(stage, sub_tasks, self.pool.clone());
        let tracker = &tracker;
        let work = &work;

        self.threads.in_place_scope(|s| {
            for unit in units {
                let slot = tracker.add_worker();
                s.spawn(move |_| {
                    if catch_unwind(AssertUnwindSafe(|| work(unit))).is_err() {
                        tracker.mark_panicked();
                    }
                    tracker.complete_worker(slot, reporter);
                });
            }
        });
        tracker.wait_finished();

        if tracker.panicked() {
            error!(stage = %stage, "Worker panicked");
            return Err(EftemError::WorkerPanicked(stage));
        }
        info!(
            stage = %stage,
            sub_tasks,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Stage complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pipeline::types::NoOpReporter;

    #[test]
    fn test_run_stage_visits_every_unit() {
        let ctx = PipelineContext::with_workers(3).unwrap();
        let sum = AtomicUsize::new(0);
        ctx.run_stage(Stage::Map, 1..=10usize, 10, &NoOpReporter, |n| {
            sum.fetch_add(n, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(sum.load(Ordering::Relaxed), 55);
        assert_eq!(ctx.pool().free_slots(), 3);
    }

    #[test]
    fn test_panicking_unit_fails_stage() {
        let ctx = PipelineContext::with_workers(2).unwrap();
        let result = ctx.run_stage(Stage::Chi2, 0..4usize, 4, &NoOpReporter, |n| {
            if n == 2 {
                panic!("boom");
            }
        });
        assert!(matches!(result, Err(EftemError::WorkerPanicked(Stage::Chi2))));
        assert_eq!(ctx.pool().free_slots(), 2);
    }
}
