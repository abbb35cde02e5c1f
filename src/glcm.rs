//! Gray-level co-occurrence matrices and the texture descriptors derived from them.

use image::{GrayImage, RgbImage};

use crate::edges::channel_plane;

/// Number of gray levels of an 8-bit channel.
pub const LEVELS: usize = 256;

/// Direction of the pixel pairs counted in a co-occurrence matrix, at distance 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Angle {
    Deg0,
    Deg45,
    Deg90,
    Deg135,
}

impl Angle {
    pub const ALL: [Angle; 4] = [Angle::Deg0, Angle::Deg45, Angle::Deg90, Angle::Deg135];

    /// `(row, col)` offset from a pixel to its partner.
    pub const fn offset(self) -> (i64, i64) {
        match self {
            Angle::Deg0 => (0, 1),
            Angle::Deg45 => (1, 1),
            Angle::Deg90 => (1, 0),
            Angle::Deg135 => (1, -1),
        }
    }

    /// The angle in degrees, as used in feature names.
    pub const fn degrees(self) -> u32 {
        match self {
            Angle::Deg0 => 0,
            Angle::Deg45 => 45,
            Angle::Deg90 => 90,
            Angle::Deg135 => 135,
        }
    }
}

/// Texture descriptors, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Correlation,
    Homogeneity,
    Contrast,
    Energy,
}

impl Descriptor {
    pub const ALL: [Descriptor; 4] = [
        Descriptor::Correlation,
        Descriptor::Homogeneity,
        Descriptor::Contrast,
        Descriptor::Energy,
    ];

    /// Lowercase name used in feature names.
    pub const fn name(self) -> &'static str {
        match self {
            Descriptor::Correlation => "correlation",
            Descriptor::Homogeneity => "homogeneity",
            Descriptor::Contrast => "contrast",
            Descriptor::Energy => "energy",
        }
    }
}

/// A symmetric, normalized co-occurrence matrix over [`LEVELS`] gray levels.
#[derive(Debug, Clone, PartialEq)]
pub struct CoOccurrence {
    probabilities: Vec<f64>,
}

impl CoOccurrence {
    /// Counts every in-bounds pixel pair along `angle` in both directions and
    /// normalizes the counts to sum to `1`.
    ///
    /// A plane too small to contain a single pair gives an all-zero matrix.
    pub fn from_plane(plane: &GrayImage, angle: Angle) -> Self {
        let (width, height) = (i64::from(plane.width()), i64::from(plane.height()));
        let (dr, dc) = angle.offset();

        let mut counts = vec![0u32; LEVELS * LEVELS];
        let mut total = 0u64;
        for row in 0..height {
            let partner_row = row + dr;
            if partner_row >= height {
                break;
            }
            for col in 0..width {
                let partner_col = col + dc;
                if !(0..width).contains(&partner_col) {
                    continue;
                }
                let i = plane.get_pixel(col as u32, row as u32).0[0] as usize;
                let j = plane.get_pixel(partner_col as u32, partner_row as u32).0[0] as usize;
                counts[i * LEVELS + j] += 1;
                counts[j * LEVELS + i] += 1;
                total += 2;
            }
        }

        let probabilities = if total == 0 {
            vec![0.0; LEVELS * LEVELS]
        } else {
            let total = total as f64;
            counts.into_iter().map(|c| f64::from(c) / total).collect()
        };

        Self { probabilities }
    }

    /// Probability of gray level `i` co-occurring with gray level `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.probabilities[i * LEVELS + j]
    }

    fn entries(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(|(k, p)| ((k / LEVELS) as f64, (k % LEVELS) as f64, *p))
    }

    /// Evaluates one texture descriptor over the matrix.
    pub fn descriptor(&self, descriptor: Descriptor) -> f64 {
        match descriptor {
            Descriptor::Contrast => self.entries().map(|(i, j, p)| p * (i - j).powi(2)).sum(),
            Descriptor::Homogeneity => self
                .entries()
                .map(|(i, j, p)| p / (1.0 + (i - j).powi(2)))
                .sum(),
            Descriptor::Energy => self.entries().map(|(_, _, p)| p * p).sum::<f64>().sqrt(),
            Descriptor::Correlation => self.correlation(),
        }
    }

    fn correlation(&self) -> f64 {
        let (mu_i, mu_j) = self
            .entries()
            .fold((0.0, 0.0), |(mi, mj), (i, j, p)| (mi + i * p, mj + j * p));
        let (var_i, var_j, cov) = self.entries().fold((0.0, 0.0, 0.0), |(vi, vj, c), (i, j, p)| {
            let di = i - mu_i;
            let dj = j - mu_j;
            (vi + p * di * di, vj + p * dj * dj, c + p * di * dj)
        });

        let std_product = var_i.sqrt() * var_j.sqrt();
        // A single populated gray level is perfectly correlated with itself.
        if std_product < 1e-15 {
            1.0
        } else {
            cov / std_product
        }
    }
}

/// Each descriptor evaluated at every [`Angle`], in [`Angle::ALL`] order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextureFeatures {
    pub correlation: [f64; 4],
    pub homogeneity: [f64; 4],
    pub contrast: [f64; 4],
    pub energy: [f64; 4],
}

impl TextureFeatures {
    /// Values of `descriptor` at every angle.
    pub fn get(&self, descriptor: Descriptor) -> &[f64; 4] {
        match descriptor {
            Descriptor::Correlation => &self.correlation,
            Descriptor::Homogeneity => &self.homogeneity,
            Descriptor::Contrast => &self.contrast,
            Descriptor::Energy => &self.energy,
        }
    }

    fn get_mut(&mut self, descriptor: Descriptor) -> &mut [f64; 4] {
        match descriptor {
            Descriptor::Correlation => &mut self.correlation,
            Descriptor::Homogeneity => &mut self.homogeneity,
            Descriptor::Contrast => &mut self.contrast,
            Descriptor::Energy => &mut self.energy,
        }
    }
}

/// Computes all texture descriptors of one 8-bit plane.
pub fn texture_features(plane: &GrayImage) -> TextureFeatures {
    let mut features = TextureFeatures::default();
    for (a, angle) in Angle::ALL.into_iter().enumerate() {
        let glcm = CoOccurrence::from_plane(plane, angle);
        for descriptor in Descriptor::ALL {
            features.get_mut(descriptor)[a] = glcm.descriptor(descriptor);
        }
    }
    features
}

/// Texture descriptors of every channel of an RGB image, in channel order.
pub fn channel_texture_features(image: &RgbImage) -> [TextureFeatures; 3] {
    std::array::from_fn(|channel| texture_features(&channel_plane(image, channel)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::{Luma, Rgb};

    fn plane(rows: &[&[u8]]) -> GrayImage {
        GrayImage::from_fn(rows[0].len() as u32, rows.len() as u32, |x, y| {
            Luma([rows[y as usize][x as usize]])
        })
    }

    fn sample_plane() -> GrayImage {
        plane(&[&[0, 0, 1, 1], &[0, 0, 1, 1], &[0, 2, 2, 2], &[2, 2, 3, 3]])
    }

    #[test]
    fn test_horizontal_pairs_are_counted_symmetrically() {
        let glcm = CoOccurrence::from_plane(&sample_plane(), Angle::Deg0);
        assert_abs_diff_eq!(glcm.get(0, 0), 4.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(0, 1), 2.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(1, 0), 2.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(2, 2), 6.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(2, 3), 1.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(3, 0), 0.0);
        assert_abs_diff_eq!(glcm.probabilities.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_pairs_are_counted_downwards() {
        let glcm = CoOccurrence::from_plane(&sample_plane(), Angle::Deg90);
        assert_abs_diff_eq!(glcm.get(0, 0), 6.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(0, 2), 2.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(1, 2), 2.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(2, 3), 2.0 / 24.0);
        assert_abs_diff_eq!(glcm.get(0, 1), 0.0);
    }

    #[test]
    fn test_diagonal_offsets_stay_in_bounds() {
        // 135 degrees pairs a pixel with its lower-left neighbor.
        let glcm = CoOccurrence::from_plane(&plane(&[&[0, 1], &[2, 3]]), Angle::Deg135);
        assert_abs_diff_eq!(glcm.get(1, 2), 0.5);
        assert_abs_diff_eq!(glcm.get(2, 1), 0.5);

        let glcm = CoOccurrence::from_plane(&plane(&[&[0, 1], &[2, 3]]), Angle::Deg45);
        assert_abs_diff_eq!(glcm.get(0, 3), 0.5);
    }

    #[test]
    fn test_uniform_plane_is_perfectly_homogeneous() {
        let image = RgbImage::from_pixel(12, 9, Rgb([0, 140, 255]));
        for features in channel_texture_features(&image) {
            for a in 0..4 {
                assert_abs_diff_eq!(features.homogeneity[a], 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(features.contrast[a], 0.0, epsilon = 1e-12);
                assert_abs_diff_eq!(features.energy[a], 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(features.correlation[a], 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_checkerboard_descriptors_depend_on_angle() {
        let board = GrayImage::from_fn(8, 8, |x, y| Luma([if (x + y) % 2 == 0 { 0 } else { 255 }]));
        let features = texture_features(&board);

        // Horizontal and vertical neighbors always differ.
        for a in [0, 2] {
            assert_abs_diff_eq!(features.contrast[a], 65025.0, epsilon = 1e-9);
            assert_abs_diff_eq!(features.homogeneity[a], 1.0 / 65026.0, epsilon = 1e-12);
            assert_abs_diff_eq!(features.correlation[a], -1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(features.energy[a], 0.5f64.sqrt(), epsilon = 1e-12);
        }
        // Diagonal neighbors always match.
        for a in [1, 3] {
            assert_abs_diff_eq!(features.contrast[a], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(features.homogeneity[a], 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(features.correlation[a], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_plane_without_pairs_is_empty() {
        let column = GrayImage::from_pixel(1, 5, Luma([9]));
        let glcm = CoOccurrence::from_plane(&column, Angle::Deg0);
        assert_eq!(glcm.descriptor(Descriptor::Contrast), 0.0);
        assert_eq!(glcm.descriptor(Descriptor::Energy), 0.0);
    }

    #[test]
    fn test_descriptor_order_and_names() {
        let names: Vec<_> = Descriptor::ALL.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["correlation", "homogeneity", "contrast", "energy"]);
        let degrees: Vec<_> = Angle::ALL.iter().map(|a| a.degrees()).collect();
        assert_eq!(degrees, [0, 45, 90, 135]);
    }
}
