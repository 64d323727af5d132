use std::fmt;

use tabletop_3d::pointcloud::PointCloud;

use crate::scene::{DetectedObject, LabelMarker};

/// The cloud streams a frame and a pick pass produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudTopic {
    /// Points above the support surface.
    Objects,
    /// The support surface.
    Table,
    /// Clustered points painted per cluster.
    Clusters,
    /// Collision map sent to the motion planner.
    Obstacles,
}

impl CloudTopic {
    /// Name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudTopic::Objects => "objects",
            CloudTopic::Table => "table",
            CloudTopic::Clusters => "clusters",
            CloudTopic::Obstacles => "obstacles",
        }
    }
}

impl fmt::Display for CloudTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for everything the pipeline and the orchestrator make visible to the outside.
///
/// Publishing is fire and forget: implementations log their own failures.
pub trait ScenePublisher: Send + Sync {
    /// Publish a cloud on a topic.
    fn publish_cloud(&self, topic: CloudTopic, cloud: &PointCloud);

    /// Publish a label marker.
    fn publish_marker(&self, marker: &LabelMarker);

    /// Publish the detections of a frame.
    fn publish_detections(&self, detections: &[DetectedObject]);

    /// Command the robot's world joint to an angle in radians.
    fn publish_world_joint(&self, angle: f64);
}

/// A publisher that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl ScenePublisher for NullPublisher {
    fn publish_cloud(&self, _topic: CloudTopic, _cloud: &PointCloud) {}

    fn publish_marker(&self, _marker: &LabelMarker) {}

    fn publish_detections(&self, _detections: &[DetectedObject]) {}

    fn publish_world_joint(&self, _angle: f64) {}
}
