//! Batch driver composing preprocessing, feature extraction and assembly.
//!
//! Every sample is processed independently from its raw image to its feature
//! vector, on a rayon worker pool. Labels are only encoded once all samples are
//! done, so the encoder always sees the complete label set.

use image::{DynamicImage, RgbImage};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, FeatureRecord, Split};
use crate::error::{PipelineError, Result};
use crate::features::{self, FeatureVector};
use crate::preprocess::{PreprocessConfig, Preprocessor};

/// Image content of a [`RawSample`].
#[derive(Debug, Clone)]
pub enum ImageData {
    /// Encoded file contents, decoded inside the worker.
    Encoded(Vec<u8>),
    /// An image already in memory.
    Decoded(DynamicImage),
}

impl ImageData {
    /// Decodes the image, or hands back the in-memory one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Decode`] if encoded bytes can't be decoded.
    pub fn decode(self) -> Result<DynamicImage> {
        match self {
            ImageData::Encoded(bytes) => Ok(image::load_from_memory(&bytes)?),
            ImageData::Decoded(image) => Ok(image),
        }
    }
}

/// One sample of a batch: its image travels together with its label.
#[derive(Debug, Clone)]
pub struct RawSample {
    /// Stable identifier used in logs and reports.
    pub id: String,
    pub label: String,
    pub image: ImageData,
}

impl RawSample {
    /// A sample holding encoded file contents.
    pub fn encoded(id: impl Into<String>, label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            image: ImageData::Encoded(bytes),
        }
    }

    /// A sample holding an already decoded image.
    pub fn decoded(id: impl Into<String>, label: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            image: ImageData::Decoded(image),
        }
    }
}

/// What to do with a sample whose image can't be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Record the sample as skipped and continue.
    #[default]
    Skip,
    /// Fail the whole batch.
    Abort,
}

/// Settings of a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub decode_policy: DecodePolicy,
    /// Share of samples held out by [`Pipeline::split`].
    pub test_ratio: f64,
    pub seed: u64,
    /// Worker count; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            decode_policy: DecodePolicy::default(),
            test_ratio: 0.25,
            seed: 42,
            threads: None,
        }
    }
}

/// Receives every normalized image of a batch, e.g. to store it on disk.
///
/// Called concurrently from worker threads.
pub trait Persistor: Sync {
    /// # Errors
    ///
    /// Any error aborts the batch.
    fn persist(&self, image: &RgbImage, label: &str, ordinal: usize) -> Result<()>;
}

/// A sample excluded from the dataset, and why.
#[derive(Debug)]
pub struct SkippedSample {
    pub id: String,
    pub label: String,
    pub error: PipelineError,
}

/// Result of one batch: the assembled dataset and the samples left out of it.
#[derive(Debug)]
pub struct BatchOutput {
    pub dataset: Dataset,
    pub skipped: Vec<SkippedSample>,
}

/// Runs batches of samples through preprocessing and feature extraction.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    preprocessor: Preprocessor,
}

impl Pipeline {
    /// Creates a pipeline after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an invalid preprocessing
    /// config, a test ratio outside `(0, 1)` or a zero worker count.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let preprocessor = Preprocessor::new(config.preprocess)?;
        if !(config.test_ratio > 0.0 && config.test_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test ratio must be in (0, 1), got {}",
                config.test_ratio
            )));
        }
        if config.threads == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "worker count must be positive".to_owned(),
            ));
        }
        Ok(Self {
            config,
            preprocessor,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Preprocesses a single image and computes its feature vector.
    ///
    /// # Errors
    ///
    /// Returns the per-sample errors of [`Preprocessor::run`].
    pub fn features_for(&self, image: &DynamicImage) -> Result<FeatureVector> {
        let resized = self.preprocessor.run(&image.to_rgb8())?;
        Ok(features::extract(&resized).to_vector())
    }

    /// Runs the full chain on every raw photograph of a batch.
    ///
    /// Each normalized image is handed to `persistor`, if any, together with the
    /// sample's label and its position in `samples`.
    ///
    /// # Errors
    ///
    /// Per-sample failures are reported in [`BatchOutput::skipped`]; see
    /// [`Pipeline::extract_preprocessed`] for the errors that fail the batch.
    pub fn process(
        &self,
        samples: Vec<RawSample>,
        persistor: Option<&dyn Persistor>,
    ) -> Result<BatchOutput> {
        self.run_batch(samples, |ordinal, label, image| {
            let rgb = image.decode()?.into_rgb8();
            let resized = self.preprocessor.run(&rgb)?;
            if let Some(persistor) = persistor {
                persistor.persist(&resized, label, ordinal)?;
            }
            Ok(features::extract(&resized).to_vector())
        })
    }

    /// Computes feature vectors of images that were already preprocessed, such
    /// as the ones a [`Persistor`] wrote.
    ///
    /// # Errors
    ///
    /// Fails the batch on an undecodable image under [`DecodePolicy::Abort`], on
    /// any error that isn't local to one sample, and when no sample survives
    /// ([`PipelineError::EmptyDataset`]).
    pub fn extract_preprocessed(&self, samples: Vec<RawSample>) -> Result<BatchOutput> {
        self.run_batch(samples, |_, _, image| {
            Ok(features::extract_dynamic(&image.decode()?)?.to_vector())
        })
    }

    /// Splits a dataset with the configured test ratio and seed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when either partition would be
    /// empty.
    pub fn split(&self, dataset: &Dataset) -> Result<Split> {
        dataset.split(self.config.test_ratio, self.config.seed)
    }

    fn run_batch<F>(&self, samples: Vec<RawSample>, stage: F) -> Result<BatchOutput>
    where
        F: Fn(usize, &str, ImageData) -> Result<FeatureVector> + Sync,
    {
        let total = samples.len();
        let work = || -> Vec<(String, String, Result<FeatureVector>)> {
            samples
                .into_par_iter()
                .enumerate()
                .map(|(ordinal, RawSample { id, label, image })| {
                    let result = stage(ordinal, &label, image);
                    (id, label, result)
                })
                .collect()
        };

        let outcomes = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?
                .install(work),
            None => work(),
        };

        let mut records = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for (id, label, result) in outcomes {
            match result {
                Ok(features) => records.push(FeatureRecord {
                    id,
                    label,
                    features,
                }),
                Err(error @ PipelineError::Decode(_))
                    if self.config.decode_policy == DecodePolicy::Abort =>
                {
                    warn!("aborting batch on sample {id} ({label}): {error}");
                    return Err(error);
                }
                Err(error) if error.is_sample_local() => {
                    warn!("skipping sample {id} ({label}): {error}");
                    skipped.push(SkippedSample { id, label, error });
                }
                Err(error) => return Err(error),
            }
        }

        info!(
            "processed {total} samples: {} kept, {} skipped",
            records.len(),
            skipped.len()
        );

        let dataset = Dataset::assemble(records)?;
        Ok(BatchOutput { dataset, skipped })
    }
}
