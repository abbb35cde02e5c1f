use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while turning photographs into feature vectors.
///
/// Some variants only ever concern a single sample and are handled by
/// dropping that sample from the batch; see [`PipelineError::is_sample_local`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// No contour survived filtering, so there is nothing to crop.
    #[error("no plausible foreground contour detected")]
    NoForegroundDetected,

    /// A zero-area crop reached the resizer.
    #[error("crop of {width}x{height} pixels cannot be resized")]
    InvalidCropSize { width: u32, height: u32 },

    /// A channel handed to feature extraction is not 8 bits deep.
    #[error("expected 8-bit channels, found {bits}-bit channels")]
    InvalidChannelDepth { bits: u16 },

    /// Assembled feature vectors differ in length.
    #[error("feature vector of sample {id} has length {found}, expected {expected}")]
    InconsistentFeatureDimension {
        id: String,
        expected: usize,
        found: usize,
    },

    /// No valid samples remain to build a dataset from.
    #[error("dataset contains no valid samples")]
    EmptyDataset,

    /// A label was encoded that the encoder was never fitted on.
    #[error("label {0:?} is not known to the encoder")]
    UnknownLabel(String),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persistor could not write a preprocessed image.
    #[error("failed to persist image to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl PipelineError {
    /// Returns `true` for errors that only invalidate the sample they were raised for.
    pub fn is_sample_local(&self) -> bool {
        matches!(
            self,
            Self::Decode(_)
                | Self::NoForegroundDetected
                | Self::InvalidCropSize { .. }
                | Self::InvalidChannelDepth { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_local_classification() {
        assert!(PipelineError::NoForegroundDetected.is_sample_local());
        assert!(PipelineError::InvalidCropSize { width: 0, height: 4 }.is_sample_local());
        assert!(PipelineError::InvalidChannelDepth { bits: 16 }.is_sample_local());
        assert!(!PipelineError::EmptyDataset.is_sample_local());
        assert!(
            !PipelineError::InconsistentFeatureDimension {
                id: "a".into(),
                expected: 57,
                found: 56,
            }
            .is_sample_local()
        );
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::InvalidCropSize { width: 0, height: 12 };
        assert_eq!(err.to_string(), "crop of 0x12 pixels cannot be resized");
        let err = PipelineError::UnknownLabel("Rotten".into());
        assert_eq!(err.to_string(), "label \"Rotten\" is not known to the encoder");
    }
}
