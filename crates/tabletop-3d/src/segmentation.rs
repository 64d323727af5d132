//! RANSAC based plane segmentation.

use glam::DVec3;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ops::fit_plane_least_squares;

/// Error types for the segmentation module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SegmentationError {
    /// Not enough points to fit the model.
    #[error("Insufficient data to fit a plane: required {required} points, got {actual}")]
    InsufficientData {
        /// Minimum number of points needed.
        required: usize,
        /// Number of points received.
        actual: usize,
    },

    /// Every sampled point triple was degenerate (coincident or collinear).
    #[error("No plane could be fitted after {0} iterations")]
    NoPlaneFound(usize),
}

/// Parameters for RANSAC plane fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacPlaneParams {
    /// Maximum point-to-plane distance for a point to count as an inlier.
    pub distance_threshold: f64,
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Desired probability that at least one sample set is outlier-free.
    pub probability: f64,
    /// Whether to refit the plane on all inliers and reselect them.
    pub optimize_coefficients: bool,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
}

impl Default for RansacPlaneParams {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            max_iterations: 1000,
            probability: 0.99,
            optimize_coefficients: true,
            random_seed: Some(42),
        }
    }
}

/// A plane `a*x + b*y + c*z + d = 0` with a unit normal `(a, b, c)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// The plane coefficients `[a, b, c, d]`.
    pub coefficients: [f64; 4],
}

impl Plane {
    /// Plane through three points, or `None` if they are degenerate.
    pub fn from_points(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> Option<Self> {
        let (a, b, c) = (
            DVec3::from_array(*a),
            DVec3::from_array(*b),
            DVec3::from_array(*c),
        );
        let normal = (b - a).cross(c - a).try_normalize()?;
        let d = -normal.dot(a);
        Some(Self {
            coefficients: [normal.x, normal.y, normal.z, d],
        })
    }

    /// Unsigned distance from `point` to the plane.
    #[inline]
    pub fn distance(&self, point: &[f64; 3]) -> f64 {
        let [a, b, c, d] = self.coefficients;
        (a * point[0] + b * point[1] + c * point[2] + d).abs()
    }

    /// Indices of the points within `threshold` of the plane.
    pub fn inliers(&self, points: &[[f64; 3]], threshold: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| (self.distance(p) <= threshold).then_some(i))
            .collect()
    }
}

/// Result of a plane segmentation.
#[derive(Debug, Clone)]
pub struct PlaneSegmentation {
    /// The fitted plane.
    pub plane: Plane,
    /// Indices of the inlier points, ascending.
    pub inliers: Vec<usize>,
    /// Number of RANSAC iterations performed.
    pub num_iterations: usize,
}

/// Fit the dominant plane of a set of points with RANSAC.
///
/// - Minimal sample size is 3 points; degenerate samples are skipped.
/// - Iterations adapt from the current inlier ratio and the desired probability.
/// - With `optimize_coefficients` the best model is refit on its inliers by least squares.
///
/// # Errors
///
/// Returns [`SegmentationError::InsufficientData`] for fewer than 3 points and
/// [`SegmentationError::NoPlaneFound`] when no sample produced a valid plane.
pub fn ransac_plane(
    points: &[[f64; 3]],
    params: &RansacPlaneParams,
) -> Result<PlaneSegmentation, SegmentationError> {
    const SAMPLE_SIZE: usize = 3;

    let n = points.len();
    if n < SAMPLE_SIZE {
        return Err(SegmentationError::InsufficientData {
            required: SAMPLE_SIZE,
            actual: n,
        });
    }

    let mut rng: StdRng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let log_probability = (1.0 - params.probability).ln();
    let mut best: Option<(Plane, usize)> = None;
    let mut required_iters = params.max_iterations;
    let mut iter = 0;

    while iter < required_iters {
        iter += 1;

        let sample = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        let Some(plane) = Plane::from_points(
            &points[sample.index(0)],
            &points[sample.index(1)],
            &points[sample.index(2)],
        ) else {
            continue;
        };

        let num_inliers = points
            .iter()
            .filter(|p| plane.distance(p) <= params.distance_threshold)
            .count();

        if best.map_or(true, |(_, count)| num_inliers > count) {
            best = Some((plane, num_inliers));

            // adapt the number of iterations to the inlier ratio
            let w = num_inliers as f64 / n as f64;
            let k = log_probability / (1.0 - w.powi(SAMPLE_SIZE as i32)).ln();
            if k.is_finite() && k >= 0.0 {
                required_iters = (k.ceil() as usize).clamp(iter, params.max_iterations);
            }
        }
    }

    let Some((mut plane, _)) = best else {
        return Err(SegmentationError::NoPlaneFound(iter));
    };
    let mut inliers = plane.inliers(points, params.distance_threshold);

    if params.optimize_coefficients {
        if let Some(coefficients) = fit_plane_least_squares(points, &inliers) {
            let refined = Plane { coefficients };
            let refined_inliers = refined.inliers(points, params.distance_threshold);
            if refined_inliers.len() >= inliers.len() {
                plane = refined;
                inliers = refined_inliers;
            }
        }
    }

    log::debug!(
        "ransac plane: {} inliers out of {} points after {} iterations",
        inliers.len(),
        n,
        iter
    );

    Ok(PlaneSegmentation {
        plane,
        inliers,
        num_iterations: iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table_with_box() -> Vec<[f64; 3]> {
        let mut points = (0..400)
            .map(|i| [(i % 20) as f64 * 0.02, (i / 20) as f64 * 0.02, 0.75])
            .collect::<Vec<_>>();
        points.extend((0..60).map(|i| {
            [
                0.2 + (i % 4) as f64 * 0.01,
                0.2 + ((i / 4) % 5) as f64 * 0.01,
                0.80 + (i / 20) as f64 * 0.02,
            ]
        }));
        points
    }

    #[test]
    fn test_ransac_plane_finds_table() -> Result<(), SegmentationError> {
        let points = table_with_box();
        let result = ransac_plane(&points, &RansacPlaneParams::default())?;

        assert_eq!(result.inliers.len(), 400);
        assert!(result.inliers.iter().all(|&i| i < 400));
        assert_relative_eq!(result.plane.coefficients[2].abs(), 1.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_ransac_plane_is_reproducible_with_seed() -> Result<(), SegmentationError> {
        let points = table_with_box();
        let params = RansacPlaneParams {
            optimize_coefficients: false,
            ..Default::default()
        };
        let a = ransac_plane(&points, &params)?;
        let b = ransac_plane(&points, &params)?;
        assert_eq!(a.inliers, b.inliers);
        assert_eq!(a.plane, b.plane);
        Ok(())
    }

    #[test]
    fn test_ransac_plane_insufficient_data() {
        let points = vec![[0.0; 3], [1.0, 0.0, 0.0]];
        let result = ransac_plane(&points, &RansacPlaneParams::default());
        assert_eq!(
            result.unwrap_err(),
            SegmentationError::InsufficientData {
                required: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_ransac_plane_collinear_points() {
        let points = (0..10).map(|i| [i as f64, 0.0, 0.0]).collect::<Vec<_>>();
        let params = RansacPlaneParams {
            max_iterations: 20,
            ..Default::default()
        };
        assert!(matches!(
            ransac_plane(&points, &params),
            Err(SegmentationError::NoPlaneFound(20))
        ));
    }

    #[test]
    fn test_plane_from_points() {
        let plane = Plane::from_points(&[0.0, 0.0, 1.0], &[1.0, 0.0, 1.0], &[0.0, 1.0, 1.0])
            .expect("valid plane");
        assert_relative_eq!(plane.distance(&[5.0, 5.0, 3.0]), 2.0, epsilon = 1e-12);
        assert!(Plane::from_points(&[0.0; 3], &[1.0; 3], &[2.0; 3]).is_none());
    }
}
