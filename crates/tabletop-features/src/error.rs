use tabletop_3d::normals::NormalEstimationError;

/// An error type for feature extraction and classification.
#[derive(thiserror::Error, Debug)]
pub enum FeatureError {
    /// Error when the histogram parameters are not valid.
    #[error("Invalid histogram: {num_bins} bins over [{min}, {max}]")]
    InvalidHistogram {
        /// Requested number of bins.
        num_bins: usize,
        /// Lower bound of the range.
        min: f64,
        /// Upper bound of the range.
        max: f64,
    },

    /// Error when the feature vector does not match the model.
    #[error("Feature vector has length {actual}, the model expects {expected}")]
    DimensionMismatch {
        /// Length expected by the model.
        expected: usize,
        /// Length of the feature vector.
        actual: usize,
    },

    /// Error when the classifier coefficients do not fit together.
    #[error("Malformed classifier: {0}")]
    MalformedModel(String),

    /// Error when the classifier predicts a code the label encoder does not know.
    #[error("Predicted class code {0} has no label")]
    UnknownClass(usize),

    /// Error when the surface normals could not be estimated.
    #[error(transparent)]
    NormalEstimation(#[from] NormalEstimationError),
}

/// An error type for loading a trained model.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// Error when the model file cannot be read.
    #[error("Failed to read model file")]
    Io(#[from] std::io::Error),

    /// Error when the model file is not valid JSON or misses fields.
    #[error("Failed to parse model file")]
    Parse(#[from] serde_json::Error),

    /// Error when the model parts are inconsistent with each other.
    #[error("Invalid model: {0}")]
    Invalid(String),
}
