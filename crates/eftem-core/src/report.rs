//! Run summaries: error histogram, per-quantity statistics and stage timings.

use ndarray::{ArrayView2, Zip};
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::dataset::{FitInput, FitResult};
use crate::fit::ErrorCode;
use crate::image::ResultImage;
use crate::pipeline::{Stage, StageTiming};

/// Fraction of the pixels above which one error class is worth a warning.
const DOMINANT_ERROR_FRACTION: f64 = 0.5;

/// Descriptive statistics of one quantity over the error-free pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation.
    pub stdv: f64,
}

impl Statistics {
    /// Statistics of `values` where `error` is [`ErrorCode::None`].
    ///
    /// Returns all zeros when no pixel qualifies.
    pub fn compute(values: ArrayView2<'_, f32>, error: ArrayView2<'_, ErrorCode>) -> Self {
        let mut kept = Vec::with_capacity(values.len());
        Zip::from(&values).and(&error).for_each(|&v, &e| {
            if e.is_ok() {
                kept.push(v as f64);
            }
        });
        Self::from_values(kept)
    }

    pub fn from_values(mut values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return Self::default();
        }
        let mean = values.iter().sum::<f64>() / count as f64;
        let stdv = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        values.par_sort_unstable_by(|a, b| a.total_cmp(b));
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        Self {
            count,
            mean,
            median,
            stdv,
        }
    }
}

/// Pixel count of one error class.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorCount {
    pub code: u16,
    pub description: String,
    pub pixels: usize,
    pub fraction: f64,
}

/// Histogram of the per-pixel error codes.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorSummary {
    pub total_pixels: usize,
    pub failed_pixels: usize,
    pub counts: Vec<ErrorCount>,
}

impl ErrorSummary {
    pub fn compute(result: &FitResult) -> Self {
        let total_pixels = result.error.len();
        let counts: Vec<ErrorCount> = ErrorCode::ALL
            .iter()
            .map(|&code| {
                let pixels = result.error_count(code);
                ErrorCount {
                    code: code.code(),
                    description: code.to_string(),
                    pixels,
                    fraction: if total_pixels == 0 {
                        0.0
                    } else {
                        pixels as f64 / total_pixels as f64
                    },
                }
            })
            .collect();
        let failed_pixels = total_pixels - result.error_count(ErrorCode::None);

        for c in counts.iter().filter(|c| c.code != 0) {
            if c.fraction > DOMINANT_ERROR_FRACTION {
                warn!(
                    code = c.code,
                    error = %c.description,
                    fraction = c.fraction,
                    "Most pixels failed the background fit"
                );
            }
        }

        Self {
            total_pixels,
            failed_pixels,
            counts,
        }
    }
}

/// Statistics of one derived image.
#[derive(Clone, Debug, Serialize)]
pub struct ImageStatistics {
    pub label: String,
    pub energy_loss: f32,
    pub stats: Statistics,
}

/// Everything worth keeping about a finished run, serializable to TOML.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub images: Vec<String>,
    pub edge_energy_loss: f32,
    pub pre_edge: usize,
    pub post_edge: usize,
    pub epsilon: f32,
    pub width: usize,
    pub height: usize,
    pub errors: ErrorSummary,
    pub r: Statistics,
    pub a: Statistics,
    pub relative_background: Vec<ImageStatistics>,
    pub map: Vec<ImageStatistics>,
    pub sigma2: Vec<ImageStatistics>,
    pub snr: Vec<ImageStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coeff_of_det: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chi2: Option<Statistics>,
    pub timings: Vec<StageTiming>,
}

impl RunReport {
    pub fn build(input: &FitInput, result: &FitResult, timings: &[StageTiming]) -> Self {
        let error = result.error.view();
        let per_image = |images: &[ResultImage]| -> Vec<ImageStatistics> {
            images
                .iter()
                .map(|img| ImageStatistics {
                    label: img.label.clone(),
                    energy_loss: img.energy_loss,
                    stats: Statistics::compute(img.data.view(), error),
                })
                .collect()
        };
        let goodness = |values: ArrayView2<'_, f32>, stage: Stage| {
            timings
                .iter()
                .any(|t| t.stage == stage && !t.skipped)
                .then(|| Statistics::compute(values, error))
        };

        Self {
            images: input.images().iter().map(|img| img.label.clone()).collect(),
            edge_energy_loss: input.edge_threshold(),
            pre_edge: input.pre_edge_count(),
            post_edge: input.post_edge_count(),
            epsilon: input.epsilon(),
            width: input.width(),
            height: input.height(),
            errors: ErrorSummary::compute(result),
            r: Statistics::compute(result.r.view(), error),
            a: Statistics::compute(result.a.view(), error),
            relative_background: per_image(&result.relative_background[..input.edge_index()]),
            map: per_image(&result.map),
            sigma2: per_image(&result.sigma2),
            snr: per_image(&result.snr),
            coeff_of_det: goodness(result.coeff_of_det.view(), Stage::CoeffOfDet),
            chi2: goodness(result.chi2.view(), Stage::Chi2),
            timings: timings.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        let odd = Statistics::from_values(vec![5.0, 1.0, 3.0]);
        assert_eq!(odd.median, 3.0);
        let even = Statistics::from_values(vec![4.0, 1.0, 3.0, 2.0]);
        assert_eq!(even.median, 2.5);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(Statistics::from_values(Vec::new()), Statistics::default());
    }
}
