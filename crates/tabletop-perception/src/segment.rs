use tabletop_3d::pointcloud::PointCloud;
use tabletop_3d::segmentation::{ransac_plane, Plane, SegmentationError};

use crate::config::SegmentConfig;
use crate::SegmentError;

/// A cleaned cloud split into the support surface and everything above it.
///
/// Every input point ends up in exactly one of the two clouds.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    /// Points on the dominant plane.
    pub surface: PointCloud,
    /// Remaining points.
    pub objects: PointCloud,
    /// The fitted plane.
    pub plane: Plane,
}

/// Extracts the single dominant plane of a cloud with RANSAC.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentConfig,
}

impl Segmenter {
    /// Create a segmenter.
    pub fn new(config: SegmentConfig) -> Self {
        Self { config }
    }

    /// Split `cloud` into surface inliers and object outliers.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InsufficientData`] when the cloud has fewer than three points
    /// or no sample spans a plane. Callers should treat the frame as having no objects.
    pub fn segment(&self, cloud: &PointCloud) -> Result<SegmentationResult, SegmentError> {
        let fit = ransac_plane(cloud.points(), &self.config).map_err(|e| match e {
            SegmentationError::InsufficientData { required, actual } => {
                SegmentError::InsufficientData { required, actual }
            }
            SegmentationError::NoPlaneFound(_) => SegmentError::InsufficientData {
                required: 3,
                actual: cloud.len(),
            },
        })?;

        log::debug!(
            "plane {:?}: {} inliers after {} iterations",
            fit.plane.coefficients,
            fit.inliers.len(),
            fit.num_iterations
        );

        Ok(SegmentationResult {
            surface: cloud.extract(&fit.inliers, false),
            objects: cloud.extract(&fit.inliers, true),
            plane: fit.plane,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_complete() -> Result<(), SegmentError> {
        let mut points = (0..400)
            .map(|i| [0.4 + (i % 20) as f64 * 0.02, -0.2 + (i / 20) as f64 * 0.02, 0.7])
            .collect::<Vec<_>>();
        points.extend((0..30).map(|i| [0.6, 0.0, 0.75 + i as f64 * 0.005]));
        let cloud = PointCloud::from_points(points);

        let result = Segmenter::default().segment(&cloud)?;
        assert_eq!(result.surface.len() + result.objects.len(), cloud.len());
        assert_eq!(result.surface.len(), 400);
        assert!(result.objects.points().iter().all(|p| p[2] > 0.71));
        Ok(())
    }

    #[test]
    fn test_too_few_points() {
        let cloud = PointCloud::from_points(vec![[0.0; 3], [1.0; 3]]);
        assert_eq!(
            Segmenter::default().segment(&cloud).err(),
            Some(SegmentError::InsufficientData {
                required: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_collinear_points() {
        let cloud = PointCloud::from_points((0..10).map(|i| [i as f64, 0.0, 0.0]).collect());
        assert!(matches!(
            Segmenter::default().segment(&cloud),
            Err(SegmentError::InsufficientData { actual: 10, .. })
        ));
    }
}
