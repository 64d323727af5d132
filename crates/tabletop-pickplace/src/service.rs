use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pose::Pose;

/// A manipulator of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    /// The left arm.
    Left,
    /// The right arm.
    Right,
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::Left => f.write_str("left"),
            Arm::Right => f.write_str("right"),
        }
    }
}

/// A request to pick an object and place it somewhere else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickPlaceRequest {
    /// Identifier of the test scene.
    pub scene_id: u32,
    /// Name of the object to pick.
    pub object_name: String,
    /// Arm that performs the motion.
    pub arm: Arm,
    /// Where the object is.
    pub pick_pose: Pose,
    /// Where the object goes.
    pub place_pose: Pose,
}

/// The answer of the manipulation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickPlaceResponse {
    /// Whether the motion succeeded.
    pub success: bool,
}

/// An error type for manipulation service calls.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The service is not registered or cannot be reached.
    #[error("Pick-place service unavailable: {0}")]
    Unavailable(String),

    /// The service was reached but the call failed.
    #[error("Pick-place call failed: {0}")]
    Call(String),

    /// The service did not answer in time.
    #[error("Pick-place service did not answer within {0:?}")]
    Timeout(Duration),
}

/// The robot's pick-place routine.
pub trait PickPlaceService: Send + Sync {
    /// Resolve once the service can take requests.
    fn wait_until_available(&self) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Execute one pick and place.
    fn pick_place(
        &self,
        request: PickPlaceRequest,
    ) -> impl Future<Output = Result<PickPlaceResponse, ServiceError>> + Send;
}
