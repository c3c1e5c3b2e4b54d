mod input;
mod result;

pub use input::FitInput;
pub use result::FitResult;

use crate::error::Result;
use crate::image::EnergyImage;

/// Start a run: validate the stack and split it at the edge threshold.
///
/// Fails before any result buffer is allocated.
pub fn begin_run(images: Vec<EnergyImage>, edge_threshold: f32, epsilon: f32) -> Result<FitInput> {
    FitInput::new(images, edge_threshold, epsilon)
}
