use glam::DVec3;

/// Utility function to compute the Euclidean distance between two points.
///
/// # Arguments
///
/// * `a` - A point in 3D space.
/// * `b` - Another point in 3D space.
///
/// # Returns
///
/// The Euclidean distance between the two points.
///
/// Example:
/// ```
/// use tabletop_3d::ops::euclidean_distance;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// let dst = euclidean_distance(&a, &b);
/// assert!((dst - 5.196152).abs() < 1e-6);
/// ```
pub fn euclidean_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    DVec3::from_array(*a).distance(DVec3::from_array(*b))
}

/// Centroid and 3x3 covariance matrix of a set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct PointStatistics {
    /// Mean of the points.
    pub centroid: [f64; 3],
    /// Covariance matrix (row major), normalized by the number of points.
    pub covariance: [[f64; 3]; 3],
}

/// Compute the centroid and covariance of the points selected by `indices`.
///
/// Returns `None` when no point is selected.
pub fn point_statistics(points: &[[f64; 3]], indices: &[usize]) -> Option<PointStatistics> {
    if indices.is_empty() {
        return None;
    }

    let n = indices.len() as f64;
    let centroid = indices
        .iter()
        .fold(DVec3::ZERO, |acc, &i| acc + DVec3::from_array(points[i]))
        / n;

    let mut covariance = [[0.0; 3]; 3];
    for &i in indices {
        let d = (DVec3::from_array(points[i]) - centroid).to_array();
        for (r, row) in covariance.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value += d[r] * d[c];
            }
        }
    }
    covariance
        .iter_mut()
        .flat_map(|row| row.iter_mut())
        .for_each(|v| *v /= n);

    Some(PointStatistics {
        centroid: centroid.to_array(),
        covariance,
    })
}

/// Eigen decomposition of a symmetric 3x3 matrix.
///
/// # Returns
///
/// The eigenvalues in nondecreasing order and the matching unit eigenvectors.
pub fn symmetric_eigen3(matrix: &[[f64; 3]; 3]) -> ([f64; 3], [[f64; 3]; 3]) {
    let mat = faer::Mat::<f64>::from_fn(3, 3, |i, j| matrix[i][j]);
    let evd = mat.selfadjoint_eigendecomposition(faer::Side::Lower);

    let s = evd.s().column_vector();
    let u = evd.u();

    let values = [s.read(0), s.read(1), s.read(2)];
    let vectors = [
        [u.read(0, 0), u.read(1, 0), u.read(2, 0)],
        [u.read(0, 1), u.read(1, 1), u.read(2, 1)],
        [u.read(0, 2), u.read(1, 2), u.read(2, 2)],
    ];
    (values, vectors)
}

/// Fit a plane to the selected points by least squares.
///
/// # Returns
///
/// The plane coefficients `[a, b, c, d]` with `a*x + b*y + c*z + d = 0` and a unit normal,
/// or `None` when fewer than three points are selected.
pub fn fit_plane_least_squares(points: &[[f64; 3]], indices: &[usize]) -> Option<[f64; 4]> {
    if indices.len() < 3 {
        return None;
    }
    let stats = point_statistics(points, indices)?;
    let (_, vectors) = symmetric_eigen3(&stats.covariance);

    let normal = DVec3::from_array(vectors[0]).try_normalize()?;
    let d = -normal.dot(DVec3::from_array(stats.centroid));
    Some([normal.x, normal.y, normal.z, d])
}
