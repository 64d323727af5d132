#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Euclidean clustering of the object cloud.
pub mod cluster;

/// Stage configuration.
pub mod config;

mod error;
pub use error::{PerceptionError, SegmentError};

/// Frame pipeline composing every stage.
pub mod pipeline;

/// Voxel, passthrough and outlier cleaning.
pub mod preprocess;

/// Output sinks for clouds, markers and detections.
pub mod publisher;

/// Per frame perception output.
pub mod scene;

/// Support surface extraction.
pub mod segment;
