use image::{RgbImage, imageops::FilterType};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Output size of the preprocessing chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl Default for TargetSize {
    fn default() -> Self {
        Self {
            width: 172,
            height: 172,
        }
    }
}

/// Resamples `image` to exactly `target` using bilinear interpolation.
///
/// An image that already has the target size is returned unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidCropSize`] if `image` has no pixels.
pub fn resize_to(image: &RgbImage, target: TargetSize) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidCropSize { width, height });
    }

    if (width, height) == (target.width, target.height) {
        return Ok(image.clone());
    }

    Ok(image::imageops::resize(
        image,
        target.width,
        target.height,
        FilterType::Triangle,
    ))
}
