#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Object classification from cluster clouds.
pub mod classifier;

/// Color space conversions.
pub mod color;

/// Fixed length cluster descriptors.
pub mod descriptor;

mod error;
pub use error::{FeatureError, ModelError};

/// Histogram utilities.
pub mod histogram;

/// Trained model: scaler, support vector classifier and label encoder.
pub mod model;
