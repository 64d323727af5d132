use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::service::Arm;

/// An error type for persisting pick records.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// Error when the record file cannot be written or read.
    #[error("Failed to access record file")]
    Io(#[from] std::io::Error),

    /// Error when the records cannot be encoded or decoded.
    #[error("Failed to encode records")]
    Yaml(#[from] serde_yaml::Error),
}

/// Outcome of one pick list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// The service reported success.
    Succeeded,
    /// The service failed, timed out or reported failure.
    Failed,
    /// No detection carried the requested label.
    Unmatched,
    /// The group has no dropbox or no arm.
    Unresolved,
    /// The pass was cancelled before the entry ran.
    Cancelled,
}

/// What happened to one pick list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRecord {
    /// Identifier of the test scene.
    pub test_scene_num: u32,
    /// Arm assigned to the entry.
    pub arm_name: Option<Arm>,
    /// Requested object.
    pub object_name: String,
    /// Resolved pick pose.
    pub pick_pose: Option<Pose>,
    /// Resolved place pose.
    pub place_pose: Option<Pose>,
    /// Outcome.
    pub status: RecordStatus,
    /// Detail for entries that did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RecordFile {
    object_list: Vec<PickRecord>,
}

/// Write the records of a pass as `object_list: [...]`.
pub fn write_records(path: impl AsRef<Path>, records: &[PickRecord]) -> Result<(), RecordError> {
    let file = RecordFile {
        object_list: records.to_vec(),
    };
    std::fs::write(path, serde_yaml::to_string(&file)?)?;
    Ok(())
}

/// Read records written by [`write_records`].
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<PickRecord>, RecordError> {
    let text = std::fs::read_to_string(path)?;
    let file: RecordFile = serde_yaml::from_str(&text)?;
    Ok(file.object_list)
}
