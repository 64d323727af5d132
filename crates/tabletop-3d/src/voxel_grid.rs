use crate::pointcloud::PointCloud;
use glam::DVec3;
use std::collections::BTreeMap;

/// Error types for the voxel grid.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VoxelGridError {
    /// The leaf size has a non positive or non finite component.
    #[error("Leaf size must be positive in all dimensions. Got: {0:?}")]
    InvalidLeafSize([f64; 3]),
}

/// Accumulated sums for one voxel: point sum, color sum, normal sum, count.
#[derive(Default)]
struct VoxelData {
    point_sum: DVec3,
    color_sum: [u64; 3],
    normal_sum: DVec3,
    count: usize,
}

/// A 3D voxel grid for downsampling point clouds.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    /// The size of the voxel (leaf) in x, y, z dimensions.
    leaf_size: DVec3,
    /// Minimum number of points required per voxel.
    min_points_per_voxel: usize,
}

impl VoxelGrid {
    /// Creates a new `VoxelGrid` with the specified leaf size.
    ///
    /// # Arguments
    /// * `leaf_size` - The size of the voxel in x, y, z dimensions.
    ///
    /// # Errors
    /// Returns [`VoxelGridError::InvalidLeafSize`] if any dimension is not strictly positive.
    pub fn new(leaf_size: DVec3) -> Result<Self, VoxelGridError> {
        let valid = leaf_size.to_array().iter().all(|v| v.is_finite() && *v > 0.0);
        if !valid {
            return Err(VoxelGridError::InvalidLeafSize(leaf_size.to_array()));
        }

        Ok(VoxelGrid {
            leaf_size,
            min_points_per_voxel: 1,
        })
    }

    /// Sets the minimum number of points a voxel needs to produce an output point.
    ///
    /// Sparser voxels are dropped. Zero is treated as one.
    pub fn set_min_points_per_voxel(&mut self, min_points: usize) {
        self.min_points_per_voxel = min_points.max(1);
    }

    /// Computes the voxel index for a given point.
    fn voxel_index(&self, point: &[f64; 3]) -> (i64, i64, i64) {
        (
            (point[0] / self.leaf_size.x).floor() as i64,
            (point[1] / self.leaf_size.y).floor() as i64,
            (point[2] / self.leaf_size.z).floor() as i64,
        )
    }

    /// Downsamples the input point cloud by grouping points into voxels and computing centroids.
    ///
    /// Voxels are emitted in lexicographic order of their integer index, which makes the
    /// output deterministic for a given input and leaf size.
    ///
    /// # Arguments
    /// * `point_cloud` - The input point cloud to downsample.
    ///
    /// # Returns
    /// A new `PointCloud` containing the downsampled points, and optionally colors and normals.
    pub fn downsample(&self, point_cloud: &PointCloud) -> PointCloud {
        let mut grid: BTreeMap<(i64, i64, i64), VoxelData> = BTreeMap::new();

        let colors_in = point_cloud.colors();
        let normals_in = point_cloud.normals();

        // group points into voxels
        for (i, point) in point_cloud.points().iter().enumerate() {
            if !point.iter().all(|v| v.is_finite()) {
                continue;
            }
            let entry = grid.entry(self.voxel_index(point)).or_default();
            entry.point_sum += DVec3::from_array(*point);
            entry.count += 1;

            if let Some(color) = colors_in.and_then(|c| c.get(i)) {
                for (acc, c) in entry.color_sum.iter_mut().zip(color.iter()) {
                    *acc += *c as u64;
                }
            }
            if let Some(normal) = normals_in.and_then(|n| n.get(i)) {
                entry.normal_sum += DVec3::from_array(*normal);
            }
        }

        // compute centroids for each voxel
        let mut points = Vec::with_capacity(grid.len());
        let mut colors = colors_in.map(|_| Vec::with_capacity(grid.len()));
        let mut normals = normals_in.map(|_| Vec::with_capacity(grid.len()));

        for voxel in grid.values() {
            if voxel.count < self.min_points_per_voxel {
                continue;
            }
            let inv_count = 1.0 / voxel.count as f64;
            points.push((voxel.point_sum * inv_count).to_array());

            if let Some(colors) = colors.as_mut() {
                colors.push([
                    (voxel.color_sum[0] as f64 * inv_count).round() as u8,
                    (voxel.color_sum[1] as f64 * inv_count).round() as u8,
                    (voxel.color_sum[2] as f64 * inv_count).round() as u8,
                ]);
            }
            if let Some(normals) = normals.as_mut() {
                let mean = voxel.normal_sum * inv_count;
                let normal = mean.try_normalize().unwrap_or(mean);
                normals.push(normal.to_array());
            }
        }

        log::debug!(
            "voxel grid reduced {} points to {}",
            point_cloud.len(),
            points.len()
        );

        PointCloud::new(points, colors, normals)
    }
}
