use serde::{Deserialize, Serialize};

use crate::kdtree::KdTree;
use crate::pointcloud::PointCloud;

/// Coordinate axis used by the passthrough filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

impl Axis {
    #[inline]
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Keep only the points whose coordinate on `axis` lies in `[min, max]`.
///
/// # Arguments
///
/// * `cloud` - The input point cloud.
/// * `axis` - The axis to filter on.
/// * `min` - Lower bound, inclusive.
/// * `max` - Upper bound, inclusive.
///
/// # Example
///
/// ```
/// use tabletop_3d::filters::{passthrough, Axis};
/// use tabletop_3d::pointcloud::PointCloud;
///
/// let cloud = PointCloud::from_points(vec![[0.0, 0.0, 0.5], [0.0, 0.0, 0.8]]);
/// let cropped = passthrough(&cloud, Axis::Z, 0.6, 1.2);
/// assert_eq!(cropped.len(), 1);
/// ```
pub fn passthrough(cloud: &PointCloud, axis: Axis, min: f64, max: f64) -> PointCloud {
    let i = axis.index();
    cloud.filter(|p| p[i] >= min && p[i] <= max)
}

/// Parameters of the statistical outlier removal filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalOutlierParams {
    /// Number of neighbours used to compute the mean distance of a point.
    pub mean_k: usize,
    /// Multiplier of the standard deviation added to the global mean distance.
    pub std_dev_mul: f64,
}

impl Default for StatisticalOutlierParams {
    fn default() -> Self {
        Self {
            mean_k: 50,
            std_dev_mul: 0.2,
        }
    }
}

/// Remove points whose mean neighbour distance is unusually large.
///
/// For every point the mean distance to its `mean_k` nearest neighbours (excluding itself)
/// is computed. Points whose mean distance exceeds `mean + std_dev_mul * stddev` over the
/// whole cloud are discarded. Smaller clouds use as many neighbours as are available.
pub fn statistical_outlier_removal(
    cloud: &PointCloud,
    params: &StatisticalOutlierParams,
) -> PointCloud {
    if cloud.len() < 2 || params.mean_k == 0 {
        return cloud.clone();
    }

    let tree = KdTree::new(cloud.points());
    let k = params.mean_k.min(cloud.len() - 1);

    // NOTE: the first neighbour returned is the query point itself
    let mean_distances = cloud
        .points()
        .iter()
        .map(|p| {
            let nn = tree.knn(p, k + 1);
            let neighbours = &nn[1.min(nn.len())..];
            if neighbours.is_empty() {
                0.0
            } else {
                neighbours.iter().map(|(_, d)| d).sum::<f64>() / neighbours.len() as f64
            }
        })
        .collect::<Vec<_>>();

    let n = mean_distances.len() as f64;
    let sum = mean_distances.iter().sum::<f64>();
    let sq_sum = mean_distances.iter().map(|d| d * d).sum::<f64>();
    let mean = sum / n;
    let variance = ((sq_sum - sum * sum / n) / (n - 1.0)).max(0.0);
    let threshold = mean + params.std_dev_mul * variance.sqrt();

    let inliers = mean_distances
        .iter()
        .enumerate()
        .filter_map(|(i, d)| (*d <= threshold).then_some(i))
        .collect::<Vec<_>>();

    log::debug!(
        "statistical outlier removal kept {}/{} points (threshold {:.4})",
        inliers.len(),
        cloud.len(),
        threshold
    );

    cloud.extract(&inliers, false)
}
