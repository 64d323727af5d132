use std::num::NonZeroUsize;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

/// Spatial index over the positions of a point cloud.
///
/// Thin wrapper around an immutable `kiddo` tree that answers queries in terms of point
/// indices and plain (not squared) Euclidean distances.
pub struct KdTree {
    tree: Option<ImmutableKdTree<f64, u32, 3, 32>>,
}

impl KdTree {
    /// Build the index. An empty slice produces an index that answers every query with nothing.
    pub fn new(points: &[[f64; 3]]) -> Self {
        let tree = (!points.is_empty()).then(|| ImmutableKdTree::new_from_slice(points));
        Self { tree }
    }

    /// The `k` nearest points to `query` as `(index, distance)`, closest first.
    pub fn knn(&self, query: &[f64; 3], k: usize) -> Vec<(usize, f64)> {
        let (Some(tree), Some(k)) = (self.tree.as_ref(), NonZeroUsize::new(k)) else {
            return Vec::new();
        };
        tree.nearest_n::<SquaredEuclidean>(query, k)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance.sqrt()))
            .collect()
    }

    /// Indices of all points within `radius` of `query`, in no particular order.
    pub fn within(&self, query: &[f64; 3], radius: f64) -> Vec<usize> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        tree.within_unsorted::<SquaredEuclidean>(query, radius * radius)
            .into_iter()
            .map(|nn| nn.item as usize)
            .collect()
    }
}
