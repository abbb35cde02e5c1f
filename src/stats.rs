use image::RgbImage;
use num_traits::ToPrimitive;

/// First three moments of one channel's intensity distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Third standardized moment, `0.0` for a constant channel.
    pub skewness: f64,
}

impl ChannelStats {
    /// Computes the moments in two passes over `samples`.
    ///
    /// Values that can't be represented as `f64` are skipped. An empty sample set
    /// gives all zeros.
    pub fn from_samples<I, T>(samples: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone,
        T: ToPrimitive,
    {
        let (count, sum) = samples
            .clone()
            .into_iter()
            .filter_map(|v| v.to_f64())
            .fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
        if count == 0 {
            return Self::default();
        }
        let n = count as f64;
        let mean = sum / n;

        let (m2, m3) = samples
            .into_iter()
            .filter_map(|v| v.to_f64())
            .fold((0.0, 0.0), |(m2, m3), v| {
                let d = v - mean;
                (m2 + d * d, m3 + d * d * d)
            });
        let m2 = m2 / n;
        let m3 = m3 / n;

        let std = m2.sqrt();
        // Rounding noise on a constant channel must not turn into a huge skew.
        let skewness = if m2 <= f64::EPSILON * mean.abs().max(1.0) {
            0.0
        } else {
            m3 / m2.powf(1.5)
        };

        Self {
            mean,
            std,
            skewness,
        }
    }
}

/// Per-channel statistics of an RGB image, in channel order.
pub fn channel_stats(image: &RgbImage) -> [ChannelStats; 3] {
    std::array::from_fn(|channel| {
        ChannelStats::from_samples(image.pixels().map(move |p| p.0[channel]))
    })
}
