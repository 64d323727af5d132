use serde::{Deserialize, Serialize};
use tabletop_3d::clustering::EuclideanClusterParams;
use tabletop_3d::filters::{Axis, StatisticalOutlierParams};
use tabletop_3d::normals::NormalEstimationParams;
use tabletop_3d::segmentation::RansacPlaneParams;

/// Plane segmentation settings.
pub type SegmentConfig = RansacPlaneParams;

/// Euclidean clustering settings.
pub type ClusterConfig = EuclideanClusterParams;

/// A passthrough crop on one axis, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropConfig {
    /// Axis to crop on.
    pub axis: Axis,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

/// Settings of the cleaning stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Edge length of a voxel in meters, equal on every axis.
    pub leaf_size: f64,
    /// Voxels holding fewer points are dropped during downsampling.
    pub min_points_per_voxel: usize,
    /// Crops applied in order after downsampling.
    pub crops: Vec<CropConfig>,
    /// Statistical outlier removal applied last.
    pub outlier: StatisticalOutlierParams,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            leaf_size: 0.01,
            min_points_per_voxel: 1,
            crops: vec![
                CropConfig {
                    axis: Axis::Z,
                    min: 0.6,
                    max: 1.2,
                },
                CropConfig {
                    axis: Axis::Y,
                    min: -0.5,
                    max: 0.5,
                },
                CropConfig {
                    axis: Axis::X,
                    min: 0.3,
                    max: 1.1,
                },
            ],
            outlier: StatisticalOutlierParams::default(),
        }
    }
}

/// Settings of the whole perception pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Cleaning stage.
    pub preprocess: PreprocessConfig,
    /// Segmentation stage.
    pub segment: SegmentConfig,
    /// Clustering stage.
    pub cluster: ClusterConfig,
    /// Normal estimation used by the classifier.
    pub normals: NormalEstimationParams,
    /// Height of a label marker above the first point of its object.
    pub marker_offset: f64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            segment: SegmentConfig::default(),
            cluster: ClusterConfig::default(),
            normals: NormalEstimationParams::default(),
            marker_offset: 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() -> Result<(), serde_yaml::Error> {
        let yaml = "
preprocess:
  leaf_size: 0.005
  outlier:
    std_dev_mul: 1.0
cluster:
  min_cluster_size: 25
";
        let config: PerceptionConfig = serde_yaml::from_str(yaml)?;
        assert_eq!(config.preprocess.leaf_size, 0.005);
        assert_eq!(config.preprocess.min_points_per_voxel, 1);
        assert_eq!(config.preprocess.crops.len(), 3);
        assert_eq!(config.preprocess.outlier.mean_k, 50);
        assert_eq!(config.preprocess.outlier.std_dev_mul, 1.0);
        assert_eq!(config.cluster.min_cluster_size, 25);
        assert_eq!(config.cluster.max_cluster_size, 1000);
        assert_eq!(config.segment.distance_threshold, 0.01);
        assert_eq!(config.marker_offset, 0.4);
        Ok(())
    }

    #[test]
    fn test_default_crop_order() {
        let axes = PreprocessConfig::default()
            .crops
            .iter()
            .map(|c| c.axis)
            .collect::<Vec<_>>();
        assert_eq!(axes, vec![Axis::Z, Axis::Y, Axis::X]);
    }
}
