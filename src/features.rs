//! Per-sample feature sets and their fixed flat layout.
//!
//! A [`FeatureVector`] is laid out as:
//!
//! 1. for each channel (R, G, B): mean, standard deviation, skewness;
//! 2. for each channel (R, G, B), for each [`Descriptor`] in [`Descriptor::ALL`]
//!    order, for each [`Angle`] in [`Angle::ALL`] order: the descriptor value.
//!
//! For three channels that is `9 + 48 = 57` values.

use image::{DynamicImage, RgbImage};

use crate::error::{PipelineError, Result};
use crate::glcm::{Angle, Descriptor, TextureFeatures, channel_texture_features};
use crate::stats::{ChannelStats, channel_stats};

/// Color channels per image.
pub const CHANNELS: usize = 3;
/// Channel prefixes of [`feature_names`], in layout order.
pub const CHANNEL_NAMES: [&str; CHANNELS] = ["r", "g", "b"];

const STATS_LEN: usize = CHANNELS * 3;
const TEXTURE_LEN: usize = CHANNELS * Descriptor::ALL.len() * Angle::ALL.len();

/// Length of every feature vector.
pub const FEATURE_LEN: usize = STATS_LEN + TEXTURE_LEN;

/// A flattened [`FeatureSet`].
pub type FeatureVector = Vec<f32>;

/// Statistical and texture features of one image, per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureSet {
    pub stats: [ChannelStats; CHANNELS],
    pub texture: [TextureFeatures; CHANNELS],
}

impl FeatureSet {
    /// Flattens the set into the layout documented at the module level.
    pub fn to_vector(&self) -> FeatureVector {
        let mut vector = Vec::with_capacity(FEATURE_LEN);
        for s in &self.stats {
            vector.extend([s.mean, s.std, s.skewness].map(|v| v as f32));
        }
        for texture in &self.texture {
            for descriptor in Descriptor::ALL {
                vector.extend((*texture.get(descriptor)).map(|v| v as f32));
            }
        }
        vector
    }
}

/// Names of the feature vector's entries, in layout order, e.g. `r_mean` or
/// `b_energy_135`.
pub fn feature_names() -> Vec<String> {
    let mut names = Vec::with_capacity(FEATURE_LEN);
    for channel in CHANNEL_NAMES {
        for stat in ["mean", "std", "skewness"] {
            names.push(format!("{channel}_{stat}"));
        }
    }
    for channel in CHANNEL_NAMES {
        for descriptor in Descriptor::ALL {
            for angle in Angle::ALL {
                names.push(format!("{channel}_{}_{}", descriptor.name(), angle.degrees()));
            }
        }
    }
    names
}

/// Computes the feature set of a normalized 8-bit RGB image.
pub fn extract(image: &RgbImage) -> FeatureSet {
    FeatureSet {
        stats: channel_stats(image),
        texture: channel_texture_features(image),
    }
}

/// Computes the feature set of a decoded image of any 8-bit color type.
///
/// Grayscale images are expanded to three equal channels and alpha is dropped.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidChannelDepth`] for images whose channels are
/// not 8 bits deep; they are never rescaled.
pub fn extract_dynamic(image: &DynamicImage) -> Result<FeatureSet> {
    let color = image.color();
    let bits = u16::from(color.bytes_per_pixel()) * 8 / u16::from(color.channel_count());
    if bits != 8 {
        return Err(PipelineError::InvalidChannelDepth { bits });
    }

    match image {
        DynamicImage::ImageRgb8(rgb) => Ok(extract(rgb)),
        other => Ok(extract(&other.to_rgb8())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient() -> RgbImage {
        RgbImage::from_fn(24, 16, |x, y| {
            Rgb([(x * 10) as u8, (y * 15) as u8, ((x + y) * 5) as u8])
        })
    }

    #[test]
    fn test_vector_has_fixed_length_and_names() {
        assert_eq!(FEATURE_LEN, 57);
        let vector = extract(&gradient()).to_vector();
        assert_eq!(vector.len(), FEATURE_LEN);

        let names = feature_names();
        assert_eq!(names.len(), FEATURE_LEN);
        assert_eq!(names[0], "r_mean");
        assert_eq!(names[8], "b_skewness");
        assert_eq!(names[9], "r_correlation_0");
        assert_eq!(names[13], "r_homogeneity_0");
        assert_eq!(names[25], "g_correlation_0");
        assert_eq!(names[56], "b_energy_135");
    }

    #[test]
    fn test_layout_follows_channel_descriptor_angle_order() {
        let set = extract(&gradient());
        let vector = set.to_vector();

        assert_eq!(vector[3], set.stats[1].mean as f32);
        assert_eq!(vector[5], set.stats[1].skewness as f32);
        // g channel, contrast, 90 degrees.
        assert_eq!(vector[9 + 16 + 2 * 4 + 2], set.texture[1].contrast[2] as f32);
        // b channel, energy, 45 degrees.
        assert_eq!(vector[9 + 32 + 3 * 4 + 1], set.texture[2].energy[1] as f32);
    }

    #[test]
    fn test_dynamic_images_of_8bit_depth_are_accepted() {
        let rgb = gradient();
        let expected = extract(&rgb);

        let rgba = DynamicImage::ImageRgb8(rgb.clone()).to_rgba8();
        assert_eq!(extract_dynamic(&DynamicImage::ImageRgba8(rgba)).unwrap(), expected);
        assert_eq!(extract_dynamic(&DynamicImage::ImageRgb8(rgb)).unwrap(), expected);
    }

    #[test]
    fn test_wider_channels_are_rejected() {
        let image: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(4, 4, Rgb([1000, 2, 3]));
        assert!(matches!(
            extract_dynamic(&DynamicImage::ImageRgb16(image)),
            Err(PipelineError::InvalidChannelDepth { bits: 16 })
        ));

        let image = DynamicImage::ImageRgb32F(ImageBuffer::from_pixel(4, 4, Rgb([0.5, 0.5, 0.5])));
        assert!(matches!(
            extract_dynamic(&image),
            Err(PipelineError::InvalidChannelDepth { bits: 32 })
        ));
    }
}
