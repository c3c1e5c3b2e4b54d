use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum EftemError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] ::image::ImageError),

    #[error("Empty image stack")]
    EmptyStack,

    #[error("At least 2 pre-edge images are required (found {found})")]
    TooFewPreEdgeImages { found: usize },

    #[error("No post-edge image at or above the edge threshold")]
    NoPostEdgeImages,

    #[error("Image '{label}' is {width}x{height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        label: String,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Image '{label}' has an invalid energy loss: {energy_loss}")]
    InvalidEnergyLoss { label: String, energy_loss: f32 },

    #[error("Convergence tolerance must be a positive finite number (got {0})")]
    InvalidEpsilon(f32),

    #[error("A worker panicked during the {0} stage")]
    WorkerPanicked(Stage),

    #[error("The pipeline thread panicked")]
    PipelinePanicked,

    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl EftemError {
    /// Whether this error was raised while validating a run, before any
    /// result buffers were allocated.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyStack
                | Self::TooFewPreEdgeImages { .. }
                | Self::NoPostEdgeImages
                | Self::DimensionMismatch { .. }
                | Self::InvalidDimensions { .. }
                | Self::InvalidEnergyLoss { .. }
                | Self::InvalidEpsilon(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EftemError>;
