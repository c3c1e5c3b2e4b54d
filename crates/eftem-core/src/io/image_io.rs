use std::path::Path;

use ::image::{ColorType, ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2, Zip};
use tracing::debug;

use crate::error::{EftemError, Result};
use crate::fit::ErrorCode;
use crate::image::{EnergyImage, ResultImage};

/// Load a single-channel image recorded at `energy_loss` eV.
///
/// Colour images are converted to luminance. Integer formats keep their raw
/// counts. The label is the file stem.
pub fn load_energy_image(path: &Path, energy_loss: f32) -> Result<EnergyImage> {
    let img = ::image::open(path)?;
    let scale = match img.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => u8::MAX as f32,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            u16::MAX as f32
        }
        _ => 1.0,
    };
    let gray = img.to_luma32f();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
        .map_err(|_| EftemError::InvalidDimensions {
            width: w as usize,
            height: h as usize,
        })?
        .mapv(|v| v * scale);

    let label = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();
    debug!(path = %path.display(), energy_loss, width = w, height = h, "Loaded image");
    Ok(EnergyImage::new(energy_loss, label, data))
}

/// First number in a file stem, e.g. `350` for `C-K_350eV.tif`.
pub fn energy_loss_from_file_name(path: &Path) -> Option<f32> {
    let stem = path.file_stem()?.to_str()?;
    let start = stem.find(|c: char| c.is_ascii_digit())?;
    let digits: String = stem[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.trim_end_matches('.').parse().ok()
}

/// Save a derived image as 16-bit grayscale, min-max stretched over the
/// pixels without a fit error. The format follows the file extension.
pub fn save_result_image(
    image: &ResultImage,
    error: ArrayView2<'_, ErrorCode>,
    path: &Path,
) -> Result<()> {
    save_scaled(image.data.view(), error, path)
}

/// Save a per-pixel parameter map the same way as [`save_result_image`].
pub fn save_scaled(data: ArrayView2<'_, f32>, error: ArrayView2<'_, ErrorCode>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();

    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    Zip::from(&data).and(&error).for_each(|&v, &e| {
        if e.is_ok() && v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    });
    let range = if hi > lo { hi - lo } else { 1.0 };
    if !lo.is_finite() {
        lo = 0.0;
    }

    let pixels: Vec<u16> = data
        .iter()
        .zip(error.iter())
        .map(|(&v, &e)| {
            if e.is_ok() && v.is_finite() {
                (((v - lo) / range).clamp(0.0, 1.0) * 65535.0) as u16
            } else {
                0
            }
        })
        .collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(EftemError::InvalidDimensions {
            width: w,
            height: h,
        })?;
    img.save(path)?;
    debug!(path = %path.display(), min = lo, max = hi, "Saved image");
    Ok(())
}
