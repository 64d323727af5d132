use glam::DVec3;
use tabletop_3d::filters::{passthrough, statistical_outlier_removal};
use tabletop_3d::pointcloud::PointCloud;
use tabletop_3d::voxel_grid::{VoxelGrid, VoxelGridError};

use crate::config::PreprocessConfig;

/// Cleans raw sensor clouds: voxel downsampling, passthrough crops, outlier removal.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    voxel_grid: VoxelGrid,
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor.
    ///
    /// # Errors
    ///
    /// Returns an error if the leaf size is not strictly positive.
    pub fn new(config: PreprocessConfig) -> Result<Self, VoxelGridError> {
        let mut voxel_grid = VoxelGrid::new(DVec3::splat(config.leaf_size))?;
        voxel_grid.set_min_points_per_voxel(config.min_points_per_voxel);
        Ok(Self { voxel_grid, config })
    }

    /// Run every cleaning stage in order. An empty cloud stays empty.
    pub fn clean(&self, cloud: &PointCloud) -> PointCloud {
        let mut cloud = self.voxel_grid.downsample(cloud);
        log::debug!("voxel grid: {} points", cloud.len());

        for crop in &self.config.crops {
            cloud = passthrough(&cloud, crop.axis, crop.min, crop.max);
        }
        log::debug!("passthrough: {} points", cloud.len());

        let cloud = statistical_outlier_removal(&cloud, &self.config.outlier);
        log::debug!("outlier removal: {} points", cloud.len());
        cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cloud_stays_empty() -> Result<(), VoxelGridError> {
        let preprocessor = Preprocessor::new(PreprocessConfig::default())?;
        assert!(preprocessor.clean(&PointCloud::default()).is_empty());
        Ok(())
    }

    #[test]
    fn test_crops_and_downsampling() -> Result<(), VoxelGridError> {
        let preprocessor = Preprocessor::new(PreprocessConfig::default())?;
        let cloud = PointCloud::from_points(vec![
            // same voxel, merged
            [0.501, 0.001, 0.801],
            [0.503, 0.003, 0.803],
            // below the table crop
            [0.5, 0.0, 0.2],
            // too far to the side
            [0.5, 0.9, 0.8],
            // behind the robot
            [0.1, 0.0, 0.8],
        ]);
        let cleaned = preprocessor.clean(&cloud);
        assert_eq!(cleaned.len(), 1);
        let p = cleaned.points()[0];
        assert!((p[0] - 0.502).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_sparse_voxels_are_dropped() -> Result<(), VoxelGridError> {
        let config = PreprocessConfig {
            min_points_per_voxel: 2,
            ..Default::default()
        };
        let cloud = PointCloud::from_points(vec![
            [0.501, 0.001, 0.801],
            [0.503, 0.003, 0.803],
            // alone in its voxel
            [0.705, 0.105, 0.805],
        ]);

        let cleaned = Preprocessor::new(config)?.clean(&cloud);
        assert_eq!(cleaned.len(), 1);
        assert!((cleaned.points()[0][1] - 0.002).abs() < 1e-9);

        let kept = Preprocessor::new(PreprocessConfig::default())?.clean(&cloud);
        assert_eq!(kept.len(), 2);
        Ok(())
    }

    #[test]
    fn test_invalid_leaf_size() {
        let config = PreprocessConfig {
            leaf_size: 0.0,
            ..Default::default()
        };
        assert!(Preprocessor::new(config).is_err());
    }
}
