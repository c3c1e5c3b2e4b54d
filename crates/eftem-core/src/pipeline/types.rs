use std::time::Duration;

use serde::Serialize;

use crate::consts::MIN_PRE_EDGE_FOR_GOODNESS_OF_FIT;
use crate::dataset::{FitInput, FitResult};

/// Pipeline stage. The pipeline walks these in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Mle,
    Background,
    Map,
    Snr,
    CoeffOfDet,
    Chi2,
    Done,
}

impl Stage {
    /// Every computing stage, in execution order.
    pub const COMPUTING: [Stage; 6] = [
        Self::Mle,
        Self::Background,
        Self::Map,
        Self::Snr,
        Self::CoeffOfDet,
        Self::Chi2,
    ];

    pub fn next(self) -> Stage {
        match self {
            Self::Mle => Self::Background,
            Self::Background => Self::Map,
            Self::Map => Self::Snr,
            Self::Snr => Self::CoeffOfDet,
            Self::CoeffOfDet => Self::Chi2,
            Self::Chi2 | Self::Done => Self::Done,
        }
    }

    /// Whether this stage has anything to compute for `input`.
    ///
    /// Goodness-of-fit statistics are undefined with only as many pre-edge
    /// images as model parameters.
    pub fn runs_for(self, input: &FitInput) -> bool {
        match self {
            Self::CoeffOfDet | Self::Chi2 => {
                input.pre_edge_count() >= MIN_PRE_EDGE_FOR_GOODNESS_OF_FIT
            }
            Self::Done => false,
            _ => true,
        }
    }

    /// Number of sub-tasks this stage is split into.
    pub fn sub_tasks(self, input: &FitInput) -> usize {
        match self {
            Self::Mle | Self::CoeffOfDet | Self::Chi2 => input.height(),
            Self::Background => input.images().len(),
            Self::Map => input.post_edge_count(),
            Self::Snr => input.post_edge_count() * input.height(),
            Self::Done => 0,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mle => write!(f, "Power law fit (MLE)"),
            Self::Background => write!(f, "Background"),
            Self::Map => write!(f, "Elemental map"),
            Self::Snr => write!(f, "Signal to noise ratio"),
            Self::CoeffOfDet => write!(f, "Coefficient of determination"),
            Self::Chi2 => write!(f, "Chi-square"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Wall-clock time spent in one stage.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub skipped: bool,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Result of a pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub result: FitResult,
    pub timings: Vec<StageTiming>,
}

impl PipelineOutput {
    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or to show
/// each stage's results as soon as they exist. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A stage has started with `sub_tasks` work units.
    fn begin_stage(&self, _stage: Stage, _sub_tasks: usize) {}

    /// Completion of the current stage in percent. Called from worker
    /// threads, only when the value changes, never decreasing within a stage.
    fn progress(&self, _percent: u8) {}

    /// A stage has finished. Its outputs in `result` are complete and will
    /// not be written again.
    fn stage_finished(&self, _stage: Stage, _result: &FitResult) {}

    /// A stage was skipped because the input does not support it.
    fn stage_skipped(&self, _stage: Stage) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Adapts a plain percentage callback to [`ProgressReporter`].
pub struct ProgressFn<F>(pub F);

impl<F> ProgressReporter for ProgressFn<F>
where
    F: Fn(u8) + Send + Sync,
{
    fn progress(&self, percent: u8) {
        (self.0)(percent)
    }
}
