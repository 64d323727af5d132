use serde::{Deserialize, Serialize};
use tabletop_3d::pointcloud::PointCloud;

use crate::color::hsv_from_rgb;
use crate::histogram::{compute_histogram, normalize_histogram};
use crate::FeatureError;

/// Color space the color histogram is computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    /// Raw RGB channels.
    Rgb,
    /// Hue, saturation and value, which is less sensitive to lighting.
    Hsv,
}

/// Layout of the descriptor. Must be identical at training and inference time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Number of bins per color channel.
    pub color_bins: usize,
    /// Number of bins per normal component.
    pub normal_bins: usize,
    /// Color space of the color histogram.
    pub color_space: ColorSpace,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            color_bins: 32,
            normal_bins: 32,
            color_space: ColorSpace::Hsv,
        }
    }
}

impl FeatureConfig {
    /// Total length of the feature vector.
    pub fn len(&self) -> usize {
        3 * (self.color_bins + self.normal_bins)
    }

    /// Whether the descriptor is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fixed length descriptor: normalized color histogram followed by normalized normal histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Concatenate a color histogram and a normal histogram.
    pub fn from_histograms(color: Vec<f64>, normal: Vec<f64>) -> Self {
        let mut values = color;
        values.extend(normal);
        Self(values)
    }

    /// The values of the descriptor.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl std::ops::Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Compute the normalized per channel color histogram of a cloud.
///
/// Each channel is scaled to [0, 255] and binned over [0, 256]. A cloud without colors
/// yields an all zero histogram.
pub fn compute_color_histograms(
    cloud: &PointCloud,
    config: &FeatureConfig,
) -> Result<Vec<f64>, FeatureError> {
    let channels: Vec<[f64; 3]> = match cloud.colors() {
        Some(colors) => colors
            .iter()
            .map(|c| match config.color_space {
                ColorSpace::Hsv => hsv_from_rgb(*c).map(|v| v * 255.0),
                ColorSpace::Rgb => c.map(|v| v as f64),
            })
            .collect(),
        None => Vec::new(),
    };

    let mut features = Vec::with_capacity(3 * config.color_bins);
    for ch in 0..3 {
        features.extend(compute_histogram(
            channels.iter().map(|c| c[ch]),
            config.color_bins,
            (0.0, 256.0),
        )?);
    }
    normalize_histogram(&mut features);
    Ok(features)
}

/// Compute the normalized histogram of the x, y and z components of unit normals over [-1, 1].
pub fn compute_normal_histograms(
    normals: &[[f64; 3]],
    config: &FeatureConfig,
) -> Result<Vec<f64>, FeatureError> {
    let mut features = Vec::with_capacity(3 * config.normal_bins);
    for axis in 0..3 {
        features.extend(compute_histogram(
            normals.iter().map(|n| n[axis]),
            config.normal_bins,
            (-1.0, 1.0),
        )?);
    }
    normalize_histogram(&mut features);
    Ok(features)
}
