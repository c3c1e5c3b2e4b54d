mod common;

use approx::assert_abs_diff_eq;
use eftem_core::dataset::FitInput;
use eftem_core::fit::ErrorCode;
use eftem_core::pipeline::{run_pipeline_quiet, PipelineContext};
use eftem_core::report::{ErrorSummary, RunReport, Statistics};
use ndarray::array;

use common::*;

#[test]
fn test_statistics_ignore_error_pixels() {
    let values = array![[1.0f32, 2.0, 3.0], [4.0, 1000.0, 6.0]];
    let error = array![
        [ErrorCode::None, ErrorCode::None, ErrorCode::None],
        [ErrorCode::None, ErrorCode::Convergence, ErrorCode::None]
    ];
    let stats = Statistics::compute(values.view(), error.view());
    assert_eq!(stats.count, 5);
    assert_abs_diff_eq!(stats.mean, 3.2, epsilon = 1e-9);
    assert_abs_diff_eq!(stats.median, 3.0, epsilon = 1e-9);
    // Sample standard deviation of [1, 2, 3, 4, 6].
    assert_abs_diff_eq!(stats.stdv, 3.7f64.sqrt(), epsilon = 1e-9);
}

#[test]
fn test_statistics_of_single_value() {
    let stats = Statistics::from_values(vec![7.5]);
    assert_eq!(stats.count, 1);
    assert_eq!(stats.mean, 7.5);
    assert_eq!(stats.median, 7.5);
    assert_eq!(stats.stdv, 0.0);
}

#[test]
fn test_error_summary_counts_every_pixel() {
    let mut images = standard_stack(5, 4);
    images[0].data[[0, 0]] = -1.0;
    images[2].data[[3, 4]] = -1.0;
    let input = FitInput::new(images, EDGE, EPSILON).unwrap();
    let ctx = PipelineContext::with_workers(2).unwrap();
    let output = run_pipeline_quiet(&input, &ctx).unwrap();

    let summary = ErrorSummary::compute(&output.result);
    assert_eq!(summary.total_pixels, 20);
    assert_eq!(summary.failed_pixels, 2);
    assert_eq!(summary.counts.iter().map(|c| c.pixels).sum::<usize>(), 20);

    let negative = summary.counts.iter().find(|c| c.code == 200).unwrap();
    assert_eq!(negative.pixels, 2);
    assert_abs_diff_eq!(negative.fraction, 0.1, epsilon = 1e-12);
}

#[test]
fn test_run_report_of_standard_stack() {
    let input = standard_input(6, 5);
    let ctx = PipelineContext::with_workers(2).unwrap();
    let output = run_pipeline_quiet(&input, &ctx).unwrap();
    let report = RunReport::build(&input, &output.result, &output.timings);

    assert_eq!(report.images.len(), 6);
    assert_eq!(report.pre_edge, 4);
    assert_eq!(report.post_edge, 2);
    assert_eq!(report.edge_energy_loss, EDGE);
    assert_eq!(report.errors.failed_pixels, 0);
    assert_eq!(report.r.count, 30);
    assert_eq!(report.relative_background.len(), 4);
    assert_eq!(report.map.len(), 2);
    for map in &report.map {
        assert!((map.stats.mean - SIGNAL as f64).abs() < 0.5);
    }
    let cod = report.coeff_of_det.unwrap();
    assert!((cod.mean - 1.0).abs() < 1e-3);
    assert!(report.chi2.is_some());
    assert_eq!(report.timings.len(), 6);

    let text = toml::to_string_pretty(&report).unwrap();
    assert!(text.contains("edge_energy_loss"));
    assert!(text.contains("coeff_of_det"));
}

#[test]
fn test_run_report_omits_skipped_statistics() {
    let images = power_law_stack(4, 4, &[95.0, 125.0, 150.0], EDGE, SIGNAL);
    let input = FitInput::new(images, EDGE, EPSILON).unwrap();
    let ctx = PipelineContext::with_workers(2).unwrap();
    let output = run_pipeline_quiet(&input, &ctx).unwrap();
    let report = RunReport::build(&input, &output.result, &output.timings);

    assert!(report.coeff_of_det.is_none());
    assert!(report.chi2.is_none());
    let text = toml::to_string_pretty(&report).unwrap();
    assert!(!text.contains("coeff_of_det"));
}
