//! Assembly of feature vectors and labels into a classifier-ready dataset.

use std::collections::BTreeSet;

use log::info;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::error::{PipelineError, Result};
use crate::features::FeatureVector;

/// A stable bijection between label strings and `0..K`.
///
/// Classes are the distinct labels in lexicographic order; the code of a label is
/// its position in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learns the sorted set of distinct labels; duplicates and input order
    /// don't matter.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_owned())
            .collect();
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// Code of `label`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownLabel`] for a label absent from the fitted set.
    pub fn encode(&self, label: &str) -> Result<u32> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .map(|i| i as u32)
            .map_err(|_| PipelineError::UnknownLabel(label.to_owned()))
    }

    /// Label of `code`, if it is in range.
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    /// Fitted labels; a label's code is its index here.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Features of one sample before label encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: String,
    pub label: String,
    pub features: FeatureVector,
}

/// A sample whose label has been encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub id: String,
    pub features: FeatureVector,
    pub label: u32,
}

/// Train and test partitions of a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<LabeledSample>,
    pub test: Vec<LabeledSample>,
}

/// Encoded samples sharing one feature dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    encoder: LabelEncoder,
    samples: Vec<LabeledSample>,
    dimension: usize,
}

impl Dataset {
    /// Fits the label encoder on all records, then encodes every record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyDataset`] without records and
    /// [`PipelineError::InconsistentFeatureDimension`] if any record's vector
    /// length differs from the first one's.
    pub fn assemble(records: Vec<FeatureRecord>) -> Result<Self> {
        let dimension = records
            .first()
            .map(|r| r.features.len())
            .ok_or(PipelineError::EmptyDataset)?;
        if let Some(bad) = records.iter().find(|r| r.features.len() != dimension) {
            return Err(PipelineError::InconsistentFeatureDimension {
                id: bad.id.clone(),
                expected: dimension,
                found: bad.features.len(),
            });
        }

        let encoder = LabelEncoder::fit(records.iter().map(|r| &r.label));
        let samples = records
            .into_iter()
            .map(|r| {
                Ok(LabeledSample {
                    label: encoder.encode(&r.label)?,
                    id: r.id,
                    features: r.features,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "assembled {} samples of dimension {dimension} over {} classes",
            samples.len(),
            encoder.len()
        );

        Ok(Self {
            encoder,
            samples,
            dimension,
        })
    }

    /// The encoder fitted on this dataset's labels.
    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    /// Samples in input order.
    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    /// Length shared by every feature vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Row-major feature matrix and the matching label column.
    pub fn to_matrices(&self) -> (Vec<FeatureVector>, Vec<u32>) {
        self.samples
            .iter()
            .map(|s| (s.features.clone(), s.label))
            .unzip()
    }

    /// Shuffles the samples with a generator seeded by `seed` and holds out
    /// `ceil(len * test_ratio)` of them for testing.
    ///
    /// Identical datasets split with identical arguments always give identical
    /// partitions.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `test_ratio` is not strictly
    /// between `0` and `1`, or if either partition would be empty.
    pub fn split(&self, test_ratio: f64, seed: u64) -> Result<Split> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test ratio must be in (0, 1), got {test_ratio}"
            )));
        }

        let n = self.samples.len();
        let n_test = (n as f64 * test_ratio).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(PipelineError::InvalidConfig(format!(
                "test ratio {test_ratio} leaves an empty partition for {n} samples"
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let pick = |indices: &[usize]| -> Vec<LabeledSample> {
            indices.iter().map(|&i| self.samples[i].clone()).collect()
        };
        let (test, train) = order.split_at(n_test);
        Ok(Split {
            train: pick(train),
            test: pick(test),
        })
    }
}
