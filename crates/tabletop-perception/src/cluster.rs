use tabletop_3d::clustering::{colorize_clusters, euclidean_clusters};
use tabletop_3d::pointcloud::PointCloud;

use crate::config::ClusterConfig;

/// Sorted point indices of one object into the object cloud.
pub type Cluster = Vec<usize>;

/// Groups the object cloud into spatially separated objects.
#[derive(Debug, Clone, Default)]
pub struct Clusterer {
    config: ClusterConfig,
}

impl Clusterer {
    /// Create a clusterer.
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Extract clusters from the positions of `objects`, largest first.
    pub fn cluster(&self, objects: &PointCloud) -> Vec<Cluster> {
        let clusters = euclidean_clusters(objects.points(), &self.config);
        log::debug!(
            "{} clusters from {} points: {:?}",
            clusters.len(),
            objects.len(),
            clusters.iter().map(Vec::len).collect::<Vec<_>>()
        );
        clusters
    }

    /// Paint each cluster with its palette color for visualization.
    pub fn colorize(&self, objects: &PointCloud, clusters: &[Cluster]) -> PointCloud {
        colorize_clusters(objects, clusters)
    }
}
