use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::{FromColor, Hsv, Srgb};
use serde::{Deserialize, Serialize};

/// Hue period of the 8-bit HSV convention, where hue is stored in half degrees.
pub const HUE_PERIOD: i32 = 180;

/// Mask value marking a kept pixel.
pub const MASK_ON: u8 = 255;

/// A closed range predicate over 8-bit HSV pixels.
///
/// Hue bounds are half degrees and are read modulo [`HUE_PERIOD`], so a band such
/// as `(-10, 10)` covers the reds on both sides of the hue origin. A band spanning
/// the whole period matches every hue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBand {
    pub hue: (i32, i32),
    pub saturation: (u8, u8),
    pub value: (u8, u8),
}

impl HsvBand {
    /// Creates a band from inclusive `(lower, upper)` bounds per axis.
    ///
    /// ```
    /// use tomato_features::colors::HsvBand;
    ///
    /// let red = HsvBand::new((-10, 10), (75, 255), (50, 255));
    /// assert!(red.contains((175, 200, 200)));
    /// assert!(!red.contains((20, 200, 200)));
    /// ```
    pub const fn new(hue: (i32, i32), saturation: (u8, u8), value: (u8, u8)) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Returns `true` if the HSV triple falls inside all three ranges.
    pub fn contains(&self, (hue, saturation, value): (u8, u8, u8)) -> bool {
        self.hue_matches(i32::from(hue))
            && (self.saturation.0..=self.saturation.1).contains(&saturation)
            && (self.value.0..=self.value.1).contains(&value)
    }

    fn hue_matches(&self, hue: i32) -> bool {
        let (lower, upper) = self.hue;
        if upper - lower >= HUE_PERIOD - 1 {
            return true;
        }

        let lower = lower.rem_euclid(HUE_PERIOD);
        let upper = upper.rem_euclid(HUE_PERIOD);
        if lower <= upper {
            (lower..=upper).contains(&hue)
        } else {
            // The range straddles the hue origin.
            hue >= lower || hue <= upper
        }
    }
}

/// The four color classes a tomato photograph is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorBands {
    pub red: HsvBand,
    pub green: HsvBand,
    pub yellow: HsvBand,
    pub black: HsvBand,
}

impl Default for ColorBands {
    fn default() -> Self {
        Self {
            red: HsvBand::new((-10, 10), (75, 255), (50, 255)),
            green: HsvBand::new((35, 70), (100, 255), (50, 255)),
            yellow: HsvBand::new((10, 35), (125, 255), (50, 255)),
            black: HsvBand::new((0, 255), (0, 255), (0, 50)),
        }
    }
}

impl ColorBands {
    /// Band names, in the order [`ColorBands::bands`] returns them.
    pub const NAMES: [&'static str; 4] = ["red", "green", "yellow", "black"];

    /// The four bands as an array, red first and black last.
    pub fn bands(&self) -> [&HsvBand; 4] {
        [&self.red, &self.green, &self.yellow, &self.black]
    }

    /// Returns `true` if the pixel belongs to at least one band.
    pub fn matches(&self, pixel: Rgb<u8>) -> bool {
        let hsv = to_hsv8(pixel);
        self.bands().iter().any(|band| band.contains(hsv))
    }
}

/// Converts an sRGB pixel into the 8-bit HSV convention: hue in `0..180`,
/// saturation and value in `0..=255`.
pub fn to_hsv8(Rgb([r, g, b]): Rgb<u8>) -> (u8, u8, u8) {
    let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());

    let hue = (hsv.hue.into_positive_degrees() / 2.0).round() as i32 % HUE_PERIOD;
    let saturation = (hsv.saturation * 255.0).round() as u8;
    let value = (hsv.value * 255.0).round() as u8;

    (hue as u8, saturation, value)
}

/// Builds the union mask of all color bands.
///
/// Each pixel is either [`MASK_ON`] or `0`; overlapping bands never push a pixel
/// outside that domain.
pub fn color_mask(image: &RgbImage, bands: &ColorBands) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if bands.matches(*image.get_pixel(x, y)) {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    })
}

/// Keeps the original pixels where `mask` is set and zeroes everything else.
///
/// # Panics
///
/// Panics if `mask` and `image` have different dimensions.
pub fn apply_mask(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    assert_eq!(
        image.dimensions(),
        mask.dimensions(),
        "mask must match image dimensions"
    );

    let mut out = image.clone();
    for (pixel, Luma([m])) in out.pixels_mut().zip(mask.pixels()) {
        if *m == 0 {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    out
}

/// Masks the image with [`color_mask`] and returns the background-removed image
/// together with the mask it was built from.
pub fn remove_background(image: &RgbImage, bands: &ColorBands) -> (RgbImage, GrayImage) {
    let mask = color_mask(image, bands);
    let masked = apply_mask(image, &mask);
    (masked, mask)
}

/// Fraction of pixels set in a mask, `0.0` for an empty image.
pub fn mask_coverage(mask: &GrayImage) -> f64 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let on = mask.pixels().filter(|p| p.0[0] != 0).count();
    on as f64 / total as f64
}
