use std::sync::Arc;

use tabletop_3d::normals::{NormalEstimationError, NormalEstimator};
use tabletop_3d::pointcloud::PointCloud;

use crate::descriptor::{compute_color_histograms, compute_normal_histograms, FeatureVector};
use crate::model::Model;
use crate::FeatureError;

/// Labels object clusters with a trained [`Model`].
///
/// The classifier is immutable once built and can be shared across threads.
#[derive(Clone)]
pub struct ObjectClassifier {
    model: Arc<Model>,
    normals: Arc<dyn NormalEstimator>,
}

impl std::fmt::Debug for ObjectClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectClassifier")
            .field("classes", &self.model.encoder.classes())
            .finish_non_exhaustive()
    }
}

impl ObjectClassifier {
    /// Create a classifier from a model and a normal estimator.
    pub fn new(model: Arc<Model>, normals: Arc<dyn NormalEstimator>) -> Self {
        Self { model, normals }
    }

    /// The model used for prediction.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Compute the descriptor of a cluster cloud.
    pub fn features(&self, cloud: &PointCloud) -> Result<FeatureVector, FeatureError> {
        let config = &self.model.features;
        let normals = self.normals.estimate(cloud)?;
        if normals.len() != cloud.len() {
            return Err(NormalEstimationError::LengthMismatch {
                expected: cloud.len(),
                actual: normals.len(),
            }
            .into());
        }

        let color = compute_color_histograms(cloud, config)?;
        let normal = compute_normal_histograms(&normals, config)?;
        Ok(FeatureVector::from_histograms(color, normal))
    }

    /// Predict the label of a cluster cloud.
    pub fn classify(&self, cloud: &PointCloud) -> Result<String, FeatureError> {
        let features = self.features(cloud)?;
        let label = self.model.predict(&features)?;
        Ok(label.to_string())
    }
}
