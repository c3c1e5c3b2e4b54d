pub mod mle;

pub use mle::MleFit;

/// Classification of a per-pixel fit. Recorded once by the fit stage and
/// honoured by every later stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    #[default]
    None = 0,
    /// A pre-edge count at this pixel is negative.
    SignalLessThanZero = 200,
    /// The iteration produced NaN/Inf, or `a` evaluated to NaN.
    Nan = 210,
    /// The Newton iteration oscillated or diverged.
    Convergence = 220,
    /// `Σy / S0(r)` was negative, so `a = ln(..)` is undefined.
    ANotPossibleToCalculate = 230,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 5] = [
        Self::None,
        Self::SignalLessThanZero,
        Self::Nan,
        Self::Convergence,
        Self::ANotPossibleToCalculate,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_ok(self) -> bool {
        self == Self::None
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "no error"),
            Self::SignalLessThanZero => write!(f, "signal is less than 0"),
            Self::Nan => write!(f, "NaN error"),
            Self::Convergence => write!(f, "no convergence"),
            Self::ANotPossibleToCalculate => write!(f, "can't calculate a"),
        }
    }
}

/// Power-law parameters of one pixel: `I(E) = exp(a) * E^-r`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelFit {
    pub r: f32,
    pub a: f32,
    pub error: ErrorCode,
}

impl PixelFit {
    pub fn failed(error: ErrorCode) -> Self {
        Self {
            r: 0.0,
            a: 0.0,
            error,
        }
    }

    /// Background intensity predicted at `ln(E)`.
    pub fn background_at(&self, ln_e: f64) -> f64 {
        (self.a as f64 - self.r as f64 * ln_e).exp()
    }
}

/// A routine that fits the background model to the pre-edge counts of one
/// pixel.
///
/// `counts[i]` is the value of pre-edge image `i` at the pixel; the routine
/// knows the matching energy losses.
pub trait BackgroundFit: Send + Sync {
    fn fit(&self, counts: &[f32]) -> PixelFit;
}
