use image::{GrayImage, Luma, RgbImage};
use imageproc::edges::canny;
use serde::{Deserialize, Serialize};

/// Hysteresis thresholds on gradient magnitude.
///
/// Magnitudes are those of [`canny`], which blurs with σ = 1.4 before taking
/// the Euclidean norm of the Sobel response. A sharp step of height `h` peaks
/// at roughly `2 * h` on that scale, so the defaults find a subject whose
/// brightest channel exceeds about 52 against a zeroed background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self {
            low: 100.0,
            high: 105.0,
        }
    }
}

/// Extracts a single channel of an RGB image as a grayscale plane.
pub fn channel_plane(image: &RgbImage, channel: usize) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[channel]])
    })
}

/// Detects edges in a background-removed image.
///
/// Canny runs on every color channel separately and the resulting edge maps are
/// unioned, so a transition visible in any one channel is an edge.
pub fn detect_edges(image: &RgbImage, thresholds: &EdgeThresholds) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut edges = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return edges;
    }

    for channel in 0..3 {
        let plane = channel_plane(image, channel);
        let channel_edges = canny(&plane, thresholds.low, thresholds.high);
        for (out, Luma([e])) in edges.pixels_mut().zip(channel_edges.pixels()) {
            out.0[0] = out.0[0].max(*e);
        }
    }

    edges
}
