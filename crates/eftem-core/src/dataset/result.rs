use ndarray::Array2;

use crate::fit::ErrorCode;
use crate::image::{EnergyImage, ResultImage, ResultKind};

use super::FitInput;

/// Every quantity computed by one pipeline run.
///
/// Allocated zero-filled and populated stage by stage. Per-pixel maps have
/// shape (height, width); per-image vectors are index-aligned with
/// [`FitInput::images`] (background) or [`FitInput::post_edge`] (map, SNR).
#[derive(Clone, Debug)]
pub struct FitResult {
    pub r: Array2<f32>,
    pub a: Array2<f32>,
    pub error: Array2<ErrorCode>,
    pub background: Vec<ResultImage>,
    pub relative_background: Vec<ResultImage>,
    pub map: Vec<ResultImage>,
    pub sigma2: Vec<ResultImage>,
    pub snr: Vec<ResultImage>,
    pub coeff_of_det: Array2<f32>,
    pub chi2: Array2<f32>,
}

impl FitResult {
    pub fn new(input: &FitInput) -> Self {
        let (h, w) = (input.height(), input.width());
        let per_image = |kind: ResultKind, images: &[EnergyImage]| {
            images
                .iter()
                .map(|img| ResultImage::zeros(kind, img.energy_loss, h, w))
                .collect::<Vec<_>>()
        };

        Self {
            r: Array2::zeros((h, w)),
            a: Array2::zeros((h, w)),
            error: Array2::from_elem((h, w), ErrorCode::None),
            background: per_image(ResultKind::Background, input.images()),
            relative_background: per_image(ResultKind::RelativeBackground, input.images()),
            map: per_image(ResultKind::Map, input.post_edge()),
            sigma2: per_image(ResultKind::Sigma2, input.post_edge()),
            snr: per_image(ResultKind::Snr, input.post_edge()),
            coeff_of_det: Array2::zeros((h, w)),
            chi2: Array2::zeros((h, w)),
        }
    }

    pub fn width(&self) -> usize {
        self.r.ncols()
    }

    pub fn height(&self) -> usize {
        self.r.nrows()
    }

    /// Error codes as floats, for display next to the parameter maps.
    pub fn error_map(&self) -> Array2<f32> {
        self.error.mapv(|e| e.code() as f32)
    }

    pub fn error_count(&self, code: ErrorCode) -> usize {
        self.error.iter().filter(|&&e| e == code).count()
    }
}
