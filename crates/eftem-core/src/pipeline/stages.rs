use ndarray::{ArrayView2, ArrayViewMut1, Axis, Zip};
use num_traits::Float;

use crate::consts::VALUE_CALCULATION_FAILED;
use crate::dataset::{FitInput, FitResult};
use crate::error::Result;
use crate::fit::{BackgroundFit, ErrorCode};
use crate::image::ResultImage;

use super::context::PipelineContext;
use super::types::{ProgressReporter, Stage};

/// Replace NaN and infinities with zero.
fn finite_or_zero<T: Float>(v: T) -> T {
    if v.is_finite() {
        v
    } else {
        T::zero()
    }
}

/// Fit `(r, a)` and classify every pixel, one sub-task per row.
pub(super) fn fit_power_law<F: BackgroundFit>(
    input: &FitInput,
    result: &mut FitResult,
    routine: &F,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let pre_edge = input.pre_edge();
    let rows = result
        .r
        .axis_iter_mut(Axis(0))
        .zip(result.a.axis_iter_mut(Axis(0)))
        .zip(result.error.axis_iter_mut(Axis(0)))
        .enumerate();

    ctx.run_stage(
        Stage::Mle,
        rows,
        input.height(),
        reporter,
        |(y, ((mut r_row, mut a_row), mut e_row))| {
            let mut counts = vec![0.0f32; pre_edge.len()];
            for x in 0..r_row.len() {
                for (c, img) in counts.iter_mut().zip(pre_edge) {
                    *c = img.data[[y, x]];
                }
                let fit = routine.fit(&counts);
                r_row[x] = fit.r;
                a_row[x] = fit.a;
                e_row[x] = fit.error;
            }
        },
    )
}

/// Background and relative background for every image.
pub(super) fn compute_background(
    input: &FitInput,
    result: &mut FitResult,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let FitResult {
        r,
        a,
        error,
        background,
        relative_background,
        ..
    } = result;
    let (r, a, error) = (r.view(), a.view(), error.view());
    let units = background
        .iter_mut()
        .zip(relative_background.iter_mut())
        .zip(input.images().iter().zip(input.ln_energy_losses()));

    ctx.run_stage(
        Stage::Background,
        units,
        input.images().len(),
        reporter,
        |((bg, rel), (img, &ln_e))| {
            Zip::from(&mut bg.data)
                .and(&mut rel.data)
                .and(&img.data)
                .and(&r)
                .and(&a)
                .and(&error)
                .for_each(|bg, rel, &signal, &r, &a, &e| {
                    if !e.is_ok() {
                        *bg = VALUE_CALCULATION_FAILED;
                        *rel = VALUE_CALCULATION_FAILED;
                        return;
                    }
                    *bg = (a as f64 - r as f64 * ln_e).exp() as f32;
                    *rel = if signal == 0.0 { 0.0 } else { *bg / signal };
                });
        },
    )
}

/// Elemental map `signal - background` for every post-edge image.
pub(super) fn compute_map(
    input: &FitInput,
    result: &mut FitResult,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let FitResult {
        error,
        background,
        map,
        ..
    } = result;
    let error = error.view();
    let post_background = &background[input.edge_index()..];
    let units = map
        .iter_mut()
        .zip(input.post_edge())
        .zip(post_background);

    ctx.run_stage(
        Stage::Map,
        units,
        input.post_edge_count(),
        reporter,
        |((map, img), bg)| {
            Zip::from(&mut map.data)
                .and(&img.data)
                .and(&bg.data)
                .and(&error)
                .for_each(|m, &signal, &bg, &e| {
                    *m = if e.is_ok() {
                        signal - bg
                    } else {
                        VALUE_CALCULATION_FAILED
                    };
                });
        },
    )
}

/// Variance of the extrapolated background and signal-to-noise ratio, one
/// sub-task per row of every post-edge image.
pub(super) fn compute_snr(
    input: &FitInput,
    result: &mut FitResult,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let FitResult {
        error,
        background,
        map,
        sigma2,
        snr,
        ..
    } = result;
    let error = error.view();
    let edge = input.edge_index();
    let pre_background: Vec<ArrayView2<'_, f32>> =
        background[..edge].iter().map(|bg| bg.data.view()).collect();
    let pre_ln_e = input.pre_edge_ln_energy_losses();

    let mut units = Vec::with_capacity(input.post_edge_count() * input.height());
    for (k, (sigma2_img, snr_img)) in sigma2.iter_mut().zip(snr.iter_mut()).enumerate() {
        let rows = sigma2_img
            .data
            .axis_iter_mut(Axis(0))
            .zip(snr_img.data.axis_iter_mut(Axis(0)))
            .enumerate();
        for (y, (sigma2_row, snr_row)) in rows {
            units.push(SnrRow {
                post_index: k,
                y,
                sigma2: sigma2_row,
                snr: snr_row,
            });
        }
    }
    let sub_tasks = units.len();

    ctx.run_stage(Stage::Snr, units, sub_tasks, reporter, |mut row| {
        let k = row.post_index;
        let y = row.y;
        let ln_e = input.ln_energy_losses()[edge + k];
        let target_bg = background[edge + k].data.row(y);
        let signal_row = map[k].data.row(y);
        let mut pre_bg = vec![0.0f64; pre_background.len()];

        for x in 0..row.snr.len() {
            if !error[[y, x]].is_ok() {
                row.snr[x] = VALUE_CALCULATION_FAILED;
                continue;
            }
            for (b, img) in pre_bg.iter_mut().zip(&pre_background) {
                *b = img[[y, x]] as f64;
            }
            let bg = target_bg[x] as f64;
            let s2 = background_variance(&pre_bg, pre_ln_e, bg, ln_e);
            row.sigma2[x] = s2 as f32;
            let signal = signal_row[x] as f64;
            row.snr[x] = finite_or_zero(signal / (signal + bg + s2).sqrt()) as f32;
        }
    })
}

struct SnrRow<'a> {
    post_index: usize,
    y: usize,
    sigma2: ArrayViewMut1<'a, f32>,
    snr: ArrayViewMut1<'a, f32>,
}

/// Propagated variance of the background extrapolated to `ln_e`.
///
/// `pre_bg` is the fitted background at the pre-edge energy losses whose
/// logarithms are `pre_ln_e`; `bg` is the fitted background at `ln_e`.
pub fn background_variance(pre_bg: &[f64], pre_ln_e: &[f64], bg: f64, ln_e: f64) -> f64 {
    let (s0, s1, s2) = pre_bg
        .iter()
        .zip(pre_ln_e)
        .fold((0.0, 0.0, 0.0), |(s0, s1, s2), (&b, &l)| {
            (s0 + b, s1 + b * l, s2 + b * l * l)
        });
    let m1 = s1 / s0;
    let m2 = s2 / s0;
    let spread: f64 = pre_bg
        .iter()
        .zip(pre_ln_e)
        .map(|(&b, &l)| b * (l - m1).powi(2))
        .sum();
    let var_r = 1.0 / spread;
    let var_a = m2 * var_r;
    let covar = m1 * var_r;

    let di_a = bg;
    let di_r = -ln_e * bg;
    di_a * di_a * var_a + di_r * di_r * var_r + 2.0 * di_a * di_r * covar
}

/// Coefficient of determination of the fit over the pre-edge images.
pub(super) fn compute_coeff_of_det(
    input: &FitInput,
    result: &mut FitResult,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let FitResult {
        error,
        background,
        coeff_of_det,
        ..
    } = result;
    goodness_of_fit(
        Stage::CoeffOfDet,
        input,
        error.view(),
        &background[..input.edge_index()],
        coeff_of_det.axis_iter_mut(Axis(0)),
        ctx,
        reporter,
        |counts, fitted| {
            let n = counts.len() as f64;
            let mean = counts.iter().sum::<f64>() / n;
            let (residual, variation) = counts.iter().zip(fitted).fold(
                (0.0, 0.0),
                |(res, var), (&y, &bg)| (res + (y - bg).powi(2), var + (y - mean).powi(2)),
            );
            1.0 - residual / variation
        },
    )
}

/// Chi-square of the fit over the pre-edge images.
pub(super) fn compute_chi2(
    input: &FitInput,
    result: &mut FitResult,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let FitResult {
        error,
        background,
        chi2,
        ..
    } = result;
    goodness_of_fit(
        Stage::Chi2,
        input,
        error.view(),
        &background[..input.edge_index()],
        chi2.axis_iter_mut(Axis(0)),
        ctx,
        reporter,
        |counts, fitted| {
            counts
                .iter()
                .zip(fitted)
                .map(|(&y, &bg)| (y - bg).powi(2) / y)
                .sum()
        },
    )
}

/// Row-parallel statistic over the pre-edge counts and the fitted background
/// at the same energy losses. Failed pixels get 0.
#[allow(clippy::too_many_arguments)]
fn goodness_of_fit<'a, S>(
    stage: Stage,
    input: &FitInput,
    error: ArrayView2<'_, ErrorCode>,
    pre_background: &[ResultImage],
    rows: impl Iterator<Item = ArrayViewMut1<'a, f32>>,
    ctx: &PipelineContext,
    reporter: &dyn ProgressReporter,
    statistic: S,
) -> Result<()>
where
    S: Fn(&[f64], &[f64]) -> f64 + Sync,
{
    let pre_edge = input.pre_edge();
    ctx.run_stage(
        stage,
        rows.enumerate(),
        input.height(),
        reporter,
        |(y, mut out)| {
            let mut counts = vec![0.0f64; pre_edge.len()];
            let mut fitted = vec![0.0f64; pre_edge.len()];
            for x in 0..out.len() {
                if !error[[y, x]].is_ok() {
                    out[x] = 0.0;
                    continue;
                }
                for ((c, f), (img, bg)) in counts
                    .iter_mut()
                    .zip(fitted.iter_mut())
                    .zip(pre_edge.iter().zip(pre_background))
                {
                    *c = img.data[[y, x]] as f64;
                    *f = bg.data[[y, x]] as f64;
                }
                out[x] = statistic(&counts, &fitted) as f32;
            }
        },
    )
}
