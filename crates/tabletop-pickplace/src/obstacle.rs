use serde::{Deserialize, Serialize};
use tabletop_3d::pointcloud::PointCloud;
use tabletop_perception::scene::DetectedObject;

/// Which detections stay in the obstacle map while an entry is dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstaclePolicy {
    /// At pick step `i` of `n`, the detections after position `i` in detection order, and
    /// none at the last step.
    #[default]
    DetectionOrder,
    /// Every detection not yet dispatched in this pass and not the current target.
    PendingTargets,
}

/// Progress of a pass, as seen by the obstacle policy.
#[derive(Debug, Clone, Copy)]
pub struct PassCursor<'a> {
    /// Index of the current pick list entry.
    pub step: usize,
    /// Length of the pick list.
    pub num_steps: usize,
    /// Detections already dispatched in this pass.
    pub dispatched: &'a [usize],
    /// Detection targeted by the current entry.
    pub target: Option<usize>,
}

impl ObstaclePolicy {
    /// Select the detections that still count as obstacles.
    pub fn remaining<'a>(
        &self,
        detections: &'a [DetectedObject],
        cursor: PassCursor<'_>,
    ) -> Vec<&'a DetectedObject> {
        match self {
            ObstaclePolicy::DetectionOrder => {
                if cursor.step + 1 < cursor.num_steps {
                    detections.iter().skip(cursor.step + 1).collect()
                } else {
                    Vec::new()
                }
            }
            ObstaclePolicy::PendingTargets => detections
                .iter()
                .filter(|d| Some(d.id) != cursor.target && !cursor.dispatched.contains(&d.id))
                .collect(),
        }
    }
}

/// Merge the support surface with the clouds of the remaining objects.
pub fn build_obstacles(surface: &PointCloud, remaining: &[&DetectedObject]) -> PointCloud {
    remaining
        .iter()
        .fold(surface.clone(), |map, object| map.concat(&object.cloud))
}
