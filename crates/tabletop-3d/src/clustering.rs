use serde::{Deserialize, Serialize};

use crate::kdtree::KdTree;
use crate::pointcloud::PointCloud;

/// Parameters for Euclidean cluster extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EuclideanClusterParams {
    /// Maximum distance between two neighbouring points of the same cluster.
    pub tolerance: f64,
    /// Minimum number of points of a valid cluster.
    pub min_cluster_size: usize,
    /// Maximum number of points of a valid cluster.
    pub max_cluster_size: usize,
}

impl Default for EuclideanClusterParams {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            min_cluster_size: 10,
            max_cluster_size: 1000,
        }
    }
}

/// Group points into spatially connected components.
///
/// Two points share a cluster when they are linked by a chain of neighbours, each within
/// `tolerance` of the next. Components with a size outside
/// `[min_cluster_size, max_cluster_size]` are dropped.
///
/// # Returns
///
/// The clusters as sorted index lists, largest cluster first. Clusters of equal size keep
/// the order in which they were discovered, so the output is stable.
///
/// # Example
///
/// ```
/// use tabletop_3d::clustering::{euclidean_clusters, EuclideanClusterParams};
///
/// let points = vec![[0.0, 0.0, 0.0], [0.01, 0.0, 0.0], [1.0, 0.0, 0.0]];
/// let params = EuclideanClusterParams {
///     tolerance: 0.05,
///     min_cluster_size: 2,
///     max_cluster_size: 10,
/// };
/// assert_eq!(euclidean_clusters(&points, &params), vec![vec![0, 1]]);
/// ```
pub fn euclidean_clusters(
    points: &[[f64; 3]],
    params: &EuclideanClusterParams,
) -> Vec<Vec<usize>> {
    let tree = KdTree::new(points);
    let mut processed = vec![false; points.len()];
    let mut clusters = Vec::new();

    for seed in 0..points.len() {
        if processed[seed] {
            continue;
        }
        processed[seed] = true;

        // breadth first expansion over the radius neighbourhood
        let mut cluster = vec![seed];
        let mut head = 0;
        while head < cluster.len() {
            let query = cluster[head];
            head += 1;
            for neighbour in tree.within(&points[query], params.tolerance) {
                if !processed[neighbour] {
                    processed[neighbour] = true;
                    cluster.push(neighbour);
                }
            }
        }

        if (params.min_cluster_size..=params.max_cluster_size).contains(&cluster.len()) {
            cluster.sort_unstable();
            clusters.push(cluster);
        } else {
            log::debug!(
                "discarding cluster of {} points outside [{}, {}]",
                cluster.len(),
                params.min_cluster_size,
                params.max_cluster_size
            );
        }
    }

    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

/// Fixed palette used to paint clusters, cycled when there are more clusters than colors.
pub const CLUSTER_PALETTE: [[u8; 3]; 12] = [
    [230, 25, 75],
    [60, 180, 75],
    [255, 225, 25],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
    [250, 190, 190],
    [0, 128, 128],
    [170, 110, 40],
];

/// Build a cloud holding the clustered points only, each cluster painted with its own color.
pub fn colorize_clusters(cloud: &PointCloud, clusters: &[Vec<usize>]) -> PointCloud {
    let mut points = Vec::new();
    let mut colors = Vec::new();
    for (j, indices) in clusters.iter().enumerate() {
        let color = CLUSTER_PALETTE[j % CLUSTER_PALETTE.len()];
        for &i in indices {
            if let Some(p) = cloud.points().get(i) {
                points.push(*p);
                colors.push(color);
            }
        }
    }
    PointCloud::new(points, Some(colors), None)
}
