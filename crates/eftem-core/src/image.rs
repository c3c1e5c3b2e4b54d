use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};

/// A single energy-filtered micrograph.
///
/// Pixel values are raw counts, row-major, shape = (height, width).
#[derive(Clone, Debug)]
pub struct EnergyImage {
    /// Energy loss in eV at which the image was recorded.
    pub energy_loss: f32,
    pub label: String,
    pub data: Array2<f32>,
}

impl EnergyImage {
    pub fn new(energy_loss: f32, label: impl Into<String>, data: Array2<f32>) -> Self {
        Self {
            energy_loss,
            label: label.into(),
            data,
        }
    }

    /// Build an image from a flat `x + y * width` pixel buffer.
    ///
    /// Returns `None` if the buffer length is not a multiple of `width`.
    pub fn from_pixels(
        energy_loss: f32,
        label: impl Into<String>,
        pixels: Vec<f32>,
        width: usize,
    ) -> Option<Self> {
        if width == 0 || pixels.len() % width != 0 {
            return None;
        }
        let height = pixels.len() / width;
        let data = Array2::from_shape_vec((height, width), pixels).ok()?;
        Some(Self::new(energy_loss, label, data))
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn row(&self, y: usize) -> ArrayView1<'_, f32> {
        self.data.row(y)
    }

    /// Numeric ordering on energy loss only.
    pub fn cmp_energy_loss(&self, other: &Self) -> Ordering {
        self.energy_loss.total_cmp(&other.energy_loss)
    }
}

/// Kind of a per-image quantity derived by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    Background,
    RelativeBackground,
    Map,
    Sigma2,
    Snr,
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Background => write!(f, "Background"),
            Self::RelativeBackground => write!(f, "Relative background"),
            Self::Map => write!(f, "Map"),
            Self::Sigma2 => write!(f, "Sigma2"),
            Self::Snr => write!(f, "SNR"),
        }
    }
}

/// A derived image, one per input (background) or post-edge (map, SNR) image.
#[derive(Clone, Debug)]
pub struct ResultImage {
    pub kind: ResultKind,
    pub energy_loss: f32,
    pub label: String,
    pub data: Array2<f32>,
}

impl ResultImage {
    /// Zero-filled image labelled after its kind and energy loss.
    pub fn zeros(kind: ResultKind, energy_loss: f32, height: usize, width: usize) -> Self {
        Self {
            kind,
            energy_loss,
            label: format!("{kind} {energy_loss}eV"),
            data: Array2::zeros((height, width)),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pixels_row_major() {
        let img = EnergyImage::from_pixels(100.0, "a", vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 3)
            .unwrap();
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);
        // pixels[x + y * width]
        assert_eq!(img.data[[1, 2]], 5.0);
        assert_eq!(img.row(1).to_vec(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_from_pixels_rejects_ragged() {
        assert!(EnergyImage::from_pixels(100.0, "a", vec![0.0; 5], 2).is_none());
        assert!(EnergyImage::from_pixels(100.0, "a", vec![0.0; 4], 0).is_none());
    }

    #[test]
    fn test_result_label() {
        let img = ResultImage::zeros(ResultKind::Map, 400.0, 2, 2);
        assert_eq!(img.label, "Map 400eV");
        assert!(img.data.iter().all(|&v| v == 0.0));
    }
}
