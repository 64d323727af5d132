use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::kdtree::KdTree;
use crate::ops::{point_statistics, symmetric_eigen3};
use crate::pointcloud::PointCloud;

/// Error types for normal estimation.
#[derive(Debug, thiserror::Error)]
pub enum NormalEstimationError {
    /// The estimator could not produce normals for the cloud.
    #[error("Normal estimation failed: {0}")]
    Failed(String),

    /// The estimator returned a different number of normals than points.
    #[error("Expected {expected} normals, got {actual}")]
    LengthMismatch {
        /// Number of points in the cloud.
        expected: usize,
        /// Number of normals returned.
        actual: usize,
    },
}

/// Produces one surface normal per point of a cloud.
///
/// Implementations may be local computations or proxies to a remote service.
pub trait NormalEstimator: Send + Sync {
    /// Estimate the normals of `cloud`, one per point, in cloud order.
    fn estimate(&self, cloud: &PointCloud) -> Result<Vec<[f64; 3]>, NormalEstimationError>;
}

/// Parameters of the k-nearest-neighbour normal estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalEstimationParams {
    /// Number of neighbours (including the point itself) used to fit the local plane.
    pub k: usize,
    /// Normals are flipped to point towards this position.
    pub viewpoint: [f64; 3],
}

impl Default for NormalEstimationParams {
    fn default() -> Self {
        Self {
            k: 10,
            viewpoint: [0.0, 0.0, 0.0],
        }
    }
}

/// Estimates normals by principal component analysis of the k nearest neighbours.
///
/// The normal is the eigenvector of the smallest eigenvalue of the neighbourhood covariance.
/// Points with fewer than three neighbours get a zero normal.
#[derive(Debug, Clone, Default)]
pub struct KnnNormalEstimator {
    params: NormalEstimationParams,
}

impl KnnNormalEstimator {
    /// Create a new estimator.
    pub fn new(params: NormalEstimationParams) -> Self {
        Self { params }
    }
}

impl NormalEstimator for KnnNormalEstimator {
    fn estimate(&self, cloud: &PointCloud) -> Result<Vec<[f64; 3]>, NormalEstimationError> {
        let points = cloud.points();
        let tree = KdTree::new(points);
        let viewpoint = DVec3::from_array(self.params.viewpoint);

        let normals = points
            .iter()
            .map(|p| {
                let neighbours = tree
                    .knn(p, self.params.k)
                    .into_iter()
                    .map(|(i, _)| i)
                    .collect::<Vec<_>>();
                if neighbours.len() < 3 {
                    return [0.0; 3];
                }
                let Some(stats) = point_statistics(points, &neighbours) else {
                    return [0.0; 3];
                };
                let (_, vectors) = symmetric_eigen3(&stats.covariance);
                let Some(mut normal) = DVec3::from_array(vectors[0]).try_normalize() else {
                    return [0.0; 3];
                };
                if normal.dot(viewpoint - DVec3::from_array(*p)) < 0.0 {
                    normal = -normal;
                }
                normal.to_array()
            })
            .collect::<Vec<_>>();

        Ok(normals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_normals_point_to_viewpoint() -> Result<(), NormalEstimationError> {
        let points = (0..100)
            .map(|i| [(i % 10) as f64 * 0.01, (i / 10) as f64 * 0.01, 0.7])
            .collect::<Vec<_>>();
        let cloud = PointCloud::from_points(points);
        let estimator = KnnNormalEstimator::default();

        let normals = estimator.estimate(&cloud)?;
        assert_eq!(normals.len(), cloud.len());
        for n in normals {
            assert_relative_eq!(n[2], -1.0, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_tiny_cloud_gets_zero_normals() -> Result<(), NormalEstimationError> {
        let cloud = PointCloud::from_points(vec![[0.0; 3], [1.0, 0.0, 0.0]]);
        let normals = KnnNormalEstimator::default().estimate(&cloud)?;
        assert_eq!(normals, vec![[0.0; 3]; 2]);
        Ok(())
    }
}
