use serde::Serialize;
use tabletop_3d::pointcloud::PointCloud;
use tabletop_3d::segmentation::Plane;

/// A labelled object found in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    /// Position in detection order within the frame.
    pub id: usize,
    /// Predicted class name.
    pub label: String,
    /// Points of the object.
    pub cloud: PointCloud,
    /// Mean of the object points.
    pub centroid: [f64; 3],
}

/// A text label floating above a detected object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMarker {
    /// Id of the object the label belongs to.
    pub id: usize,
    /// Label text.
    pub text: String,
    /// Anchor position.
    pub position: [f64; 3],
}

/// Everything perception learned from one frame.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Sequence number of the frame.
    pub frame: u64,
    /// The support surface.
    pub surface: PointCloud,
    /// Points above the surface.
    pub objects: PointCloud,
    /// The fitted support plane.
    pub plane: Plane,
    /// Labelled objects in detection order.
    pub detections: Vec<DetectedObject>,
    /// One marker per detection.
    pub markers: Vec<LabelMarker>,
}

impl Scene {
    /// Labels of the detections, in detection order.
    pub fn labels(&self) -> Vec<&str> {
        self.detections.iter().map(|d| d.label.as_str()).collect()
    }
}
