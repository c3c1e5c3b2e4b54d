use tracing::{debug, info};

use crate::consts::MIN_PRE_EDGE_IMAGES;
use crate::error::{EftemError, Result};
use crate::fit::MleFit;
use crate::image::EnergyImage;

/// Validated, read-only input of one elemental-mapping run.
#[derive(Clone, Debug)]
pub struct FitInput {
    images: Vec<EnergyImage>,
    ln_energy_losses: Vec<f64>,
    edge_threshold: f32,
    edge_index: usize,
    epsilon: f32,
    width: usize,
    height: usize,
}

impl FitInput {
    /// Validate a stack and split it at `edge_threshold`.
    ///
    /// Images are sorted by energy loss. Everything below the threshold is
    /// pre-edge, the rest post-edge. Fails if fewer than two pre-edge or no
    /// post-edge images remain.
    pub fn new(mut images: Vec<EnergyImage>, edge_threshold: f32, epsilon: f32) -> Result<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(EftemError::InvalidEpsilon(epsilon));
        }
        let first = images.first().ok_or(EftemError::EmptyStack)?;
        let (height, width) = first.data.dim();
        if width == 0 || height == 0 {
            return Err(EftemError::InvalidDimensions { width, height });
        }

        for img in &images {
            if img.width() != width || img.height() != height {
                return Err(EftemError::DimensionMismatch {
                    label: img.label.clone(),
                    width: img.width(),
                    height: img.height(),
                    expected_width: width,
                    expected_height: height,
                });
            }
            if !(img.energy_loss.is_finite() && img.energy_loss > 0.0) {
                return Err(EftemError::InvalidEnergyLoss {
                    label: img.label.clone(),
                    energy_loss: img.energy_loss,
                });
            }
        }

        images.sort_by(|a, b| a.cmp_energy_loss(b));

        let edge_index = images
            .iter()
            .position(|img| img.energy_loss >= edge_threshold)
            .unwrap_or(images.len());
        if edge_index < MIN_PRE_EDGE_IMAGES {
            return Err(EftemError::TooFewPreEdgeImages { found: edge_index });
        }
        if edge_index == images.len() {
            return Err(EftemError::NoPostEdgeImages);
        }

        let ln_energy_losses = images
            .iter()
            .map(|img| (img.energy_loss as f64).ln())
            .collect();

        let input = Self {
            images,
            ln_energy_losses,
            edge_threshold,
            edge_index,
            epsilon,
            width,
            height,
        };
        info!(
            images = input.images.len(),
            pre_edge = input.pre_edge_count(),
            post_edge = input.post_edge_count(),
            width,
            height,
            epsilon,
            "Elemental map input validated"
        );
        debug!(
            pre_edge = %input.labels(input.pre_edge()),
            post_edge = %input.labels(input.post_edge()),
            "Edge split"
        );
        Ok(input)
    }

    fn labels(&self, images: &[EnergyImage]) -> String {
        images
            .iter()
            .map(|img| img.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn images(&self) -> &[EnergyImage] {
        &self.images
    }

    pub fn pre_edge(&self) -> &[EnergyImage] {
        &self.images[..self.edge_index]
    }

    pub fn post_edge(&self) -> &[EnergyImage] {
        &self.images[self.edge_index..]
    }

    /// `ln(E)` of every image, index-aligned with [`Self::images`].
    pub fn ln_energy_losses(&self) -> &[f64] {
        &self.ln_energy_losses
    }

    pub fn pre_edge_ln_energy_losses(&self) -> &[f64] {
        &self.ln_energy_losses[..self.edge_index]
    }

    pub fn edge_threshold(&self) -> f32 {
        self.edge_threshold
    }

    pub fn edge_index(&self) -> usize {
        self.edge_index
    }

    pub fn pre_edge_count(&self) -> usize {
        self.edge_index
    }

    pub fn post_edge_count(&self) -> usize {
        self.images.len() - self.edge_index
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// The maximum-likelihood fit routine configured for this input.
    pub fn fit_routine(&self) -> MleFit {
        MleFit::from_ln_energy_losses(self.pre_edge_ln_energy_losses().to_vec(), self.epsilon)
    }
}
