/// Default exit condition of the Newton-Raphson iteration for `r`.
pub const DEFAULT_EPSILON: f32 = 1e-6;

/// Start value of the power-law exponent `r`.
pub const R_START: f64 = 4.0;

/// Step size assumed before the first iteration. A first step larger than
/// this already counts as growing.
pub const INITIAL_STEP: f64 = 10.0;

/// Number of growing Newton steps after which a fit is declared divergent.
pub const MAX_DIVERGENT_STEPS: u32 = 25;

/// Minimum number of pre-edge images needed to fit the two-parameter model.
pub const MIN_PRE_EDGE_IMAGES: usize = 2;

/// Coefficient of determination and chi-square need more pre-edge images
/// than model parameters.
pub const MIN_PRE_EDGE_FOR_GOODNESS_OF_FIT: usize = 3;

/// Marker written to derived images at pixels whose fit failed.
///
/// The negative smallest subnormal: displays as zero but differs from any
/// computed value.
pub const VALUE_CALCULATION_FAILED: f32 = -1.0e-45;

/// Name prefix of the pipeline worker threads.
pub const WORKER_THREAD_PREFIX: &str = "eftem-worker";
