pub mod config;
mod context;
mod orchestrator;
mod pool;
mod stages;
mod tracker;
mod types;

pub use context::PipelineContext;
pub use orchestrator::{
    run_pipeline, run_pipeline_quiet, run_pipeline_reported, spawn_pipeline, PipelineHandle,
};
pub use pool::{available_cores, WorkerPool};
pub use stages::background_variance;
pub use tracker::{StageTracker, TrackerState, WorkerSlot};
pub use types::{PipelineOutput, ProgressFn, ProgressReporter, Stage, StageTiming};
