use serde::{Deserialize, Serialize};
use tabletop_perception::scene::DetectedObject;

use crate::config::{PickListEntry, PickPlaceParams};
use crate::pose::Pose;
use crate::service::{Arm, PickPlaceRequest};

/// Which detection wins when several share the requested label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// The last detection in detection order.
    #[default]
    LastMatch,
    /// The first detection in detection order.
    FirstMatch,
}

impl MatchPolicy {
    /// Find the detection labelled `name`.
    pub fn find<'a>(
        &self,
        detections: &'a [DetectedObject],
        name: &str,
    ) -> Option<&'a DetectedObject> {
        let mut matches = detections.iter().filter(|d| d.label == name);
        match self {
            MatchPolicy::LastMatch => matches.last(),
            MatchPolicy::FirstMatch => matches.next(),
        }
    }
}

/// Why a matched entry cannot be dispatched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No detection carries the requested label.
    #[error("no detection labelled {0}")]
    Unmatched(String),

    /// The group has no drop location.
    #[error("no dropbox for group {0}")]
    NoDropbox(String),

    /// The group has no arm.
    #[error("no arm for group {0}")]
    NoArm(String),
}

/// A pick list entry resolved against the detections of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PickTask {
    /// Requested object.
    pub object_name: String,
    /// Requested group.
    pub group: String,
    /// Id of the matched detection.
    pub target: Option<usize>,
    /// Centroid of the matched detection.
    pub pick_pose: Option<Pose>,
    /// Drop location of the group.
    pub place_pose: Option<Pose>,
    /// Arm of the group.
    pub arm: Option<Arm>,
}

impl PickTask {
    /// Build the manipulation request, or the first reason there is none.
    ///
    /// Matching is checked before placement and arm assignment.
    pub fn request(&self, scene_id: u32) -> Result<PickPlaceRequest, ResolveError> {
        let pick_pose = self
            .pick_pose
            .ok_or_else(|| ResolveError::Unmatched(self.object_name.clone()))?;
        let place_pose = self
            .place_pose
            .ok_or_else(|| ResolveError::NoDropbox(self.group.clone()))?;
        let arm = self
            .arm
            .ok_or_else(|| ResolveError::NoArm(self.group.clone()))?;

        Ok(PickPlaceRequest {
            scene_id,
            object_name: self.object_name.clone(),
            arm,
            pick_pose,
            place_pose,
        })
    }
}

/// Resolve a pick list entry: pick pose from the matching detection, place pose and arm
/// from the group.
pub fn resolve(
    entry: &PickListEntry,
    detections: &[DetectedObject],
    params: &PickPlaceParams,
    policy: MatchPolicy,
) -> PickTask {
    let target = policy.find(detections, &entry.name);
    PickTask {
        object_name: entry.name.clone(),
        group: entry.group.clone(),
        target: target.map(|d| d.id),
        pick_pose: target.map(|d| Pose::from_position(d.centroid)),
        place_pose: params.place_position(&entry.group).map(Pose::from_position),
        arm: params.arm(&entry.group),
    }
}
