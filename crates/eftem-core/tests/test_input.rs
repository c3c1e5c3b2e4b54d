mod common;

use eftem_core::dataset::{begin_run, FitInput};
use eftem_core::error::EftemError;
use eftem_core::image::EnergyImage;
use ndarray::Array2;

use common::*;

fn flat(energy_loss: f32) -> EnergyImage {
    image_from_fn(energy_loss, 4, 3, |_, _| 100.0)
}

#[test]
fn test_images_are_sorted_and_split() {
    let images = vec![flat(170.0), flat(95.0), flat(150.0), flat(80.0), flat(110.0)];
    let input = FitInput::new(images, 150.0, EPSILON).unwrap();

    let energies: Vec<f32> = input.images().iter().map(|i| i.energy_loss).collect();
    assert_eq!(energies, vec![80.0, 95.0, 110.0, 150.0, 170.0]);
    // The threshold itself belongs to the post-edge side.
    assert_eq!(input.edge_index(), 3);
    assert_eq!(input.pre_edge_count(), 3);
    assert_eq!(input.post_edge_count(), 2);
    assert_eq!(input.post_edge()[0].energy_loss, 150.0);
    assert_eq!((input.width(), input.height()), (4, 3));
    assert_eq!(input.pixel_count(), 12);

    let ln: Vec<f64> = input.ln_energy_losses().to_vec();
    assert!((ln[0] - 80f64.ln()).abs() < 1e-12);
    assert_eq!(input.pre_edge_ln_energy_losses().len(), 3);
}

#[test]
fn test_one_pre_edge_image_is_rejected() {
    let err = begin_run(vec![flat(100.0), flat(400.0), flat(450.0)], 300.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::TooFewPreEdgeImages { found: 1 }));
    assert!(err.is_validation());
}

#[test]
fn test_threshold_below_every_image_is_rejected() {
    let err = begin_run(vec![flat(100.0), flat(150.0)], 50.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::TooFewPreEdgeImages { found: 0 }));
}

#[test]
fn test_no_post_edge_image_is_rejected() {
    let err = begin_run(vec![flat(100.0), flat(150.0), flat(200.0)], 300.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::NoPostEdgeImages));
    assert!(err.is_validation());
}

#[test]
fn test_minimal_stack_is_accepted() {
    let input = begin_run(vec![flat(100.0), flat(150.0), flat(400.0)], 300.0, EPSILON).unwrap();
    assert_eq!(input.edge_index(), 2);
    assert_eq!(input.post_edge_count(), 1);
}

#[test]
fn test_empty_stack_is_rejected() {
    let err = begin_run(Vec::new(), 300.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::EmptyStack));
}

#[test]
fn test_dimension_mismatch_is_rejected() {
    let odd = image_from_fn(150.0, 5, 3, |_, _| 1.0);
    let err = begin_run(vec![flat(100.0), odd, flat(400.0)], 300.0, EPSILON).unwrap_err();
    match err {
        EftemError::DimensionMismatch {
            width,
            expected_width,
            ..
        } => {
            assert_eq!(width, 5);
            assert_eq!(expected_width, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_images_are_rejected() {
    let empty = |e: f32| EnergyImage::new(e, "empty", Array2::zeros((0, 0)));
    let err = begin_run(vec![empty(100.0), empty(150.0), empty(400.0)], 300.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::InvalidDimensions { .. }));
}

#[test]
fn test_non_positive_energy_loss_is_rejected() {
    let err = begin_run(vec![flat(0.0), flat(150.0), flat(400.0)], 300.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::InvalidEnergyLoss { .. }));

    let err = begin_run(vec![flat(f32::NAN), flat(150.0), flat(400.0)], 300.0, EPSILON).unwrap_err();
    assert!(matches!(err, EftemError::InvalidEnergyLoss { .. }));
}

#[test]
fn test_invalid_epsilon_is_rejected() {
    for eps in [0.0, -1e-6, f32::NAN, f32::INFINITY] {
        let err = begin_run(vec![flat(100.0), flat(150.0), flat(400.0)], 300.0, eps).unwrap_err();
        assert!(matches!(err, EftemError::InvalidEpsilon(_)), "epsilon {eps}");
    }
}
