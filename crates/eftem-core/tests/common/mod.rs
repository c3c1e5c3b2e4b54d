#![allow(dead_code)]

use std::sync::Mutex;

use eftem_core::dataset::{FitInput, FitResult};
use eftem_core::image::EnergyImage;
use eftem_core::pipeline::{ProgressReporter, Stage};
use ndarray::Array2;

pub const PRE_EDGE: [f32; 4] = [80.0, 95.0, 110.0, 125.0];
pub const POST_EDGE: [f32; 2] = [150.0, 170.0];
pub const EDGE: f32 = 140.0;
pub const SIGNAL: f32 = 50.0;
pub const EPSILON: f32 = 1e-6;

/// `exp(a) * E^-r`.
pub fn power_law(a: f64, r: f64, e: f32) -> f32 {
    (a - r * (e as f64).ln()).exp() as f32
}

/// Background parameters `(a, r)` of the synthetic stacks at pixel `(x, y)`.
pub fn pixel_params(x: usize, y: usize) -> (f64, f64) {
    (20.0 + 0.05 * x as f64 + 0.03 * y as f64, 3.0 + 0.02 * (x + y) as f64)
}

pub fn image_from_fn(energy_loss: f32, width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> EnergyImage {
    let data = Array2::from_shape_fn((height, width), |(y, x)| f(x, y));
    EnergyImage::new(energy_loss, format!("{energy_loss}eV"), data)
}

/// Noiseless power-law background at every energy loss, plus a constant
/// `signal` on the images at or above `edge`.
pub fn power_law_stack(width: usize, height: usize, energies: &[f32], edge: f32, signal: f32) -> Vec<EnergyImage> {
    energies
        .iter()
        .map(|&e| {
            image_from_fn(e, width, height, |x, y| {
                let (a, r) = pixel_params(x, y);
                let extra = if e >= edge { signal } else { 0.0 };
                power_law(a, r, e) + extra
            })
        })
        .collect()
}

/// Four pre-edge and two post-edge images.
pub fn standard_stack(width: usize, height: usize) -> Vec<EnergyImage> {
    let energies: Vec<f32> = PRE_EDGE.iter().chain(&POST_EDGE).copied().collect();
    power_law_stack(width, height, &energies, EDGE, SIGNAL)
}

pub fn standard_input(width: usize, height: usize) -> FitInput {
    FitInput::new(standard_stack(width, height), EDGE, EPSILON).unwrap()
}

/// Every output array of `result`, flattened, for bitwise comparison.
pub fn result_bits(result: &FitResult) -> Vec<u32> {
    let mut bits: Vec<u32> = Vec::new();
    let mut push = |a: &Array2<f32>| bits.extend(a.iter().map(|v| v.to_bits()));
    push(&result.r);
    push(&result.a);
    push(&result.error_map());
    for img in result
        .background
        .iter()
        .chain(&result.relative_background)
        .chain(&result.map)
        .chain(&result.sigma2)
        .chain(&result.snr)
    {
        push(&img.data);
    }
    push(&result.coeff_of_det);
    push(&result.chi2);
    bits
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin(Stage, usize),
    Progress(u8),
    Finished(Stage),
    Skipped(Stage),
}

/// Records every reporter callback in order.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Progress values reported between the start of `stage` and the next
    /// stage event.
    pub fn progress_of(&self, stage: Stage) -> Vec<u8> {
        self.events()
            .into_iter()
            .skip_while(|e| !matches!(e, Event::Begin(s, _) if *s == stage))
            .skip(1)
            .take_while(|e| matches!(e, Event::Progress(_)))
            .filter_map(|e| match e {
                Event::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for Recorder {
    fn begin_stage(&self, stage: Stage, sub_tasks: usize) {
        self.events.lock().unwrap().push(Event::Begin(stage, sub_tasks));
    }

    fn progress(&self, percent: u8) {
        self.events.lock().unwrap().push(Event::Progress(percent));
    }

    fn stage_finished(&self, stage: Stage, _result: &FitResult) {
        self.events.lock().unwrap().push(Event::Finished(stage));
    }

    fn stage_skipped(&self, stage: Stage) {
        self.events.lock().unwrap().push(Event::Skipped(stage));
    }
}
