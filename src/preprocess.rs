//! The per-sample chain that isolates the tomato and normalizes its geometry.

use image::{GrayImage, RgbImage};
use imageproc::contours::Contour;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::colors::{self, ColorBands};
use crate::contours::{ContourFilter, find_outer_contours};
use crate::edges::{EdgeThresholds, detect_edges};
use crate::error::{PipelineError, Result};
use crate::rect::crop_to_contours;
use crate::resize::{TargetSize, resize_to};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub bands: ColorBands,
    pub edges: EdgeThresholds,
    pub filter: ContourFilter,
    pub target: TargetSize,
}

impl PreprocessConfig {
    /// Checks the settings every stage relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a band whose lower bound
    /// exceeds its upper bound, for non-finite or inverted edge thresholds and
    /// for an empty target size.
    pub fn validate(&self) -> Result<()> {
        for (name, band) in ColorBands::NAMES.into_iter().zip(self.bands.bands()) {
            let (hue, saturation, value) = (band.hue, band.saturation, band.value);
            if hue.0 > hue.1 || saturation.0 > saturation.1 || value.0 > value.1 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} band bounds must be ordered, got {band:?}"
                )));
            }
        }

        let EdgeThresholds { low, high } = self.edges;
        if !(low.is_finite() && high.is_finite()) || low < 0.0 || low > high {
            return Err(PipelineError::InvalidConfig(format!(
                "edge thresholds must satisfy 0 <= low <= high, got low={low} high={high}"
            )));
        }
        if self.target.width == 0 || self.target.height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "target size must be non-empty, got {}x{}",
                self.target.width, self.target.height
            )));
        }
        Ok(())
    }
}

/// Intermediate artifacts of one [`Preprocessor::run_with_capture`] call.
///
/// Only filled in on request; [`Preprocessor::run`] drops every stage as soon as
/// the next one has consumed it.
#[derive(Debug, Clone, Default)]
pub struct StageCapture {
    pub mask: Option<GrayImage>,
    pub masked: Option<RgbImage>,
    pub edges: Option<GrayImage>,
    pub contours: Option<Vec<Contour<i32>>>,
    pub filtered: Option<Vec<Contour<i32>>>,
    pub cropped: Option<RgbImage>,
}

/// Background removal, edge detection, contour cropping and resizing.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Creates a preprocessor after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this preprocessor runs with.
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Runs the full chain on one image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoForegroundDetected`] when no contour survives
    /// filtering and [`PipelineError::InvalidCropSize`] for a degenerate crop.
    pub fn run(&self, image: &RgbImage) -> Result<RgbImage> {
        self.run_inner(image, None)
    }

    /// Same as [`Preprocessor::run`], but retains every intermediate stage in
    /// `capture`. Stages reached before a failure are still captured.
    pub fn run_with_capture(
        &self,
        image: &RgbImage,
        capture: &mut StageCapture,
    ) -> Result<RgbImage> {
        self.run_inner(image, Some(capture))
    }

    fn run_inner(
        &self,
        image: &RgbImage,
        mut capture: Option<&mut StageCapture>,
    ) -> Result<RgbImage> {
        let (masked, mask) = colors::remove_background(image, &self.config.bands);
        debug!(
            "mask covers {:.1}% of {}x{} image",
            colors::mask_coverage(&mask) * 100.0,
            image.width(),
            image.height()
        );
        if let Some(c) = capture.as_deref_mut() {
            c.mask = Some(mask);
        }

        let edges = detect_edges(&masked, &self.config.edges);
        let mut contours = find_outer_contours(&edges);
        if let Some(c) = capture.as_deref_mut() {
            c.edges = Some(edges);
            c.contours = Some(contours.clone());
        }

        let found = contours.len();
        self.config.filter.filter_in_place(&mut contours);
        debug!("{} of {found} outer contours survived filtering", contours.len());

        // Fails with `NoForegroundDetected` when nothing survived; the masked
        // image and the (empty) filtered list are captured first.
        let cropped = crop_to_contours(&masked, &contours);
        if let Some(c) = capture.as_deref_mut() {
            c.masked = Some(masked);
            c.filtered = Some(contours);
        }
        let cropped = cropped?;

        let resized = resize_to(&cropped, self.config.target)?;
        if let Some(c) = capture {
            c.cropped = Some(cropped);
        }

        Ok(resized)
    }
}
