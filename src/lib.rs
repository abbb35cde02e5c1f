//! Feature extraction for tomato photographs.
//!
//! Raw photographs go through a preprocessing chain built on [imageproc] (color
//! band masking, edge detection, outer contour extraction and filtering,
//! cropping and resizing). The normalized images are then described by
//! per-channel moments and gray-level co-occurrence texture descriptors, and
//! assembled into fixed-length feature vectors with integer-encoded labels.
//!
//! The modules follow the processing order; [`pipeline`] composes them over a
//! batch of samples.

pub mod colors;
pub mod contours;
pub mod dataset;
pub mod edges;
pub mod error;
pub mod features;
pub mod glcm;
pub mod io;
pub mod pipeline;
pub mod preprocess;
pub mod rect;
pub mod resize;
pub mod stats;

pub use dataset::{Dataset, FeatureRecord, LabelEncoder, LabeledSample, Split};
pub use error::{PipelineError, Result};
pub use features::{FEATURE_LEN, FeatureSet, FeatureVector};
pub use pipeline::{BatchOutput, DecodePolicy, Persistor, Pipeline, PipelineConfig, RawSample};
pub use preprocess::{PreprocessConfig, Preprocessor, StageCapture};
