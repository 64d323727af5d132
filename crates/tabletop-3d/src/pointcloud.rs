use glam::DVec3;

/// A point cloud with points, colors, and normals.
///
/// Pipeline stages never mutate a cloud handed to them; every stage produces a new cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Create a point cloud holding only positions.
    pub fn from_points(points: Vec<[f64; 3]>) -> Self {
        Self::new(points, None, None)
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &Vec<[f64; 3]> {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&Vec<[u8; 3]>> {
        self.colors.as_ref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&Vec<[f64; 3]>> {
        self.normals.as_ref()
    }

    /// Extract a subset of the point cloud.
    ///
    /// With `negative == false` the points at `indices` are kept, in the order given.
    /// With `negative == true` every point *not* listed is kept, in cloud order.
    /// Out of range indices are ignored.
    pub fn extract(&self, indices: &[usize], negative: bool) -> PointCloud {
        let selected: Vec<usize> = if negative {
            let mut mask = vec![true; self.len()];
            for &i in indices {
                if let Some(m) = mask.get_mut(i) {
                    *m = false;
                }
            }
            mask.iter()
                .enumerate()
                .filter_map(|(i, keep)| keep.then_some(i))
                .collect()
        } else {
            indices.iter().copied().filter(|&i| i < self.len()).collect()
        };

        let points = selected.iter().map(|&i| self.points[i]).collect();
        let colors = self
            .colors
            .as_ref()
            .map(|c| selected.iter().filter_map(|&i| c.get(i).copied()).collect());
        let normals = self
            .normals
            .as_ref()
            .map(|n| selected.iter().filter_map(|&i| n.get(i).copied()).collect());

        PointCloud::new(points, colors, normals)
    }

    /// Keep only the points for which `keep` returns true.
    pub fn filter<F>(&self, mut keep: F) -> PointCloud
    where
        F: FnMut(&[f64; 3]) -> bool,
    {
        let indices = self
            .points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| keep(p).then_some(i))
            .collect::<Vec<_>>();
        self.extract(&indices, false)
    }

    /// Concatenate two point clouds into a new one.
    ///
    /// Colors and normals survive only when both inputs carry them, or when one of the
    /// inputs is empty.
    pub fn concat(&self, other: &PointCloud) -> PointCloud {
        let mut points = Vec::with_capacity(self.len() + other.len());
        points.extend_from_slice(&self.points);
        points.extend_from_slice(&other.points);

        let colors = concat_attribute(
            self.colors.as_ref(),
            self.len(),
            other.colors.as_ref(),
            other.len(),
        );
        let normals = concat_attribute(
            self.normals.as_ref(),
            self.len(),
            other.normals.as_ref(),
            other.len(),
        );

        PointCloud::new(points, colors, normals)
    }

    /// Replace the colors of the point cloud.
    pub fn with_colors(mut self, colors: Vec<[u8; 3]>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Compute the mean of all points, or `None` for an empty cloud.
    pub fn centroid(&self) -> Option<[f64; 3]> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(DVec3::ZERO, |acc, p| acc + DVec3::from_array(*p));
        Some((sum / self.points.len() as f64).to_array())
    }
}

fn concat_attribute<T: Copy>(
    a: Option<&Vec<T>>,
    a_len: usize,
    b: Option<&Vec<T>>,
    b_len: usize,
) -> Option<Vec<T>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            Some(out)
        }
        (Some(a), None) if b_len == 0 => Some(a.clone()),
        (None, Some(b)) if a_len == 0 => Some(b.clone()),
        _ => None,
    }
}
