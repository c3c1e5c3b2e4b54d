use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, info_span};

use crate::dataset::{FitInput, FitResult};
use crate::error::{EftemError, Result};
use crate::fit::MleFit;

use super::context::PipelineContext;
use super::stages;
use super::types::{NoOpReporter, PipelineOutput, ProgressFn, ProgressReporter, Stage, StageTiming};

/// Run every stage and return the populated result, reporting plain
/// percentages to `on_progress`.
pub fn run_pipeline<F>(input: &FitInput, ctx: &PipelineContext, on_progress: F) -> Result<FitResult>
where
    F: Fn(u8) + Send + Sync,
{
    run_pipeline_reported(input, ctx, &ProgressFn(on_progress)).map(|out| out.result)
}

/// Run every stage without any progress reporting.
pub fn run_pipeline_quiet(input: &FitInput, ctx: &PipelineContext) -> Result<PipelineOutput> {
    run_pipeline_reported(input, ctx, &NoOpReporter)
}

/// Run the full pipeline with a thread-safe progress reporter.
///
/// Stages run strictly one after another; each starts only after every
/// sub-task of the previous one has completed.
pub fn run_pipeline_reported(
    input: &FitInput,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<PipelineOutput> {
    let _span = info_span!("pipeline", workers = ctx.workers()).entered();
    let pipeline_start = Instant::now();

    let mut result = FitResult::new(input);
    let routine = input.fit_routine();
    let mut timings = Vec::with_capacity(Stage::COMPUTING.len());

    let mut stage = Stage::Mle;
    while stage != Stage::Done {
        let start = Instant::now();
        let skipped = !stage.runs_for(input);
        if skipped {
            debug!(stage = %stage, pre_edge = input.pre_edge_count(), "Skipping stage");
            reporter.stage_skipped(stage);
        } else {
            let sub_tasks = stage.sub_tasks(input);
            info!(stage = %stage, sub_tasks, "Starting stage");
            reporter.begin_stage(stage, sub_tasks);
            run_stage(stage, input, &mut result, &routine, ctx, reporter)?;
            reporter.stage_finished(stage, &result);
            info!(
                stage = %stage,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Stage finished"
            );
        }
        timings.push(StageTiming {
            stage,
            elapsed: start.elapsed(),
            skipped,
        });
        stage = stage.next();
    }

    info!(
        elapsed_ms = pipeline_start.elapsed().as_millis() as u64,
        failed_pixels = result.error.iter().filter(|e| !e.is_ok()).count(),
        "Elemental map complete"
    );
    Ok(PipelineOutput { result, timings })
}

fn run_stage(
    stage: Stage,
    input: &FitInput,
    result: &mut FitResult,
    routine: &MleFit,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    match stage {
        Stage::Mle => stages::fit_power_law(input, result, routine, ctx, reporter),
        Stage::Background => stages::compute_background(input, result, ctx, reporter),
        Stage::Map => stages::compute_map(input, result, ctx, reporter),
        Stage::Snr => stages::compute_snr(input, result, ctx, reporter),
        Stage::CoeffOfDet => stages::compute_coeff_of_det(input, result, ctx, reporter),
        Stage::Chi2 => stages::compute_chi2(input, result, ctx, reporter),
        Stage::Done => Ok(()),
    }
}

/// A pipeline running on its own thread.
#[derive(Debug)]
pub struct PipelineHandle {
    handle: JoinHandle<Result<PipelineOutput>>,
}

impl PipelineHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the run ends.
    pub fn join(self) -> Result<PipelineOutput> {
        self.handle
            .join()
            .map_err(|_| EftemError::PipelinePanicked)?
    }
}

/// Start the pipeline on a background thread and return immediately.
///
/// The caller observes progress and per-stage results through `reporter`.
pub fn spawn_pipeline(
    input: FitInput,
    ctx: PipelineContext,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineHandle> {
    let handle = thread::Builder::new()
        .name("eftem-pipeline".into())
        .spawn(move || run_pipeline_reported(&input, &ctx, reporter.as_ref()))?;
    Ok(PipelineHandle { handle })
}
