use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::service::Arm;

/// An error type for loading the pick-place parameters.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Error when a parameter file cannot be read.
    #[error("Failed to read {path}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Error when a parameter file is not valid YAML or misses fields.
    #[error("Failed to parse parameters")]
    Yaml(#[from] serde_yaml::Error),

    /// Error when an object or dropbox has an empty name or group.
    #[error("Empty {0} in parameters")]
    EmptyField(&'static str),

    /// Error when two dropboxes serve the same group.
    #[error("Group {0} has more than one dropbox")]
    DuplicateGroup(String),
}

/// One object to pick, in pick order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickListEntry {
    /// Class name of the object.
    pub name: String,
    /// Group, which decides the dropbox and the arm.
    pub group: String,
}

/// A drop location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropboxEntry {
    /// Name of the box.
    pub name: String,
    /// Group the box collects.
    pub group: String,
    /// Place position.
    pub position: [f64; 3],
}

/// Pick list file layout: `object_list: [{name, group}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickList {
    /// Entries in pick order.
    pub object_list: Vec<PickListEntry>,
}

fn default_arms() -> BTreeMap<String, Arm> {
    BTreeMap::from([("green".to_string(), Arm::Right), ("red".to_string(), Arm::Left)])
}

/// Dropbox file layout: `dropbox: [{name, group, position}]` and an optional `arms` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropboxConfig {
    /// Drop locations.
    pub dropbox: Vec<DropboxEntry>,
    /// Arm used for each group.
    #[serde(default = "default_arms")]
    pub arms: BTreeMap<String, Arm>,
}

/// A group referenced by the pick list that cannot be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// No dropbox collects the group.
    MissingDropbox {
        /// Object that needs it.
        object: String,
        /// The group.
        group: String,
    },
    /// No arm is assigned to the group.
    MissingArm {
        /// Object that needs it.
        object: String,
        /// The group.
        group: String,
    },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::MissingDropbox { object, group } => {
                write!(f, "{object}: no dropbox for group {group}")
            }
            ConfigIssue::MissingArm { object, group } => {
                write!(f, "{object}: no arm for group {group}")
            }
        }
    }
}

/// The parameters of a pick pass, immutable for the duration of the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PickPlaceParams {
    /// What to pick, in order.
    pub pick_list: PickList,
    /// Where to put it.
    pub dropbox: DropboxConfig,
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&text)?)
}

impl PickPlaceParams {
    /// Build and check the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error for empty names or groups and for duplicate dropbox groups.
    pub fn new(pick_list: PickList, dropbox: DropboxConfig) -> Result<Self, ConfigError> {
        for entry in &pick_list.object_list {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::EmptyField("object name"));
            }
            if entry.group.trim().is_empty() {
                return Err(ConfigError::EmptyField("object group"));
            }
        }

        let mut groups = HashSet::new();
        for entry in &dropbox.dropbox {
            if entry.group.trim().is_empty() {
                return Err(ConfigError::EmptyField("dropbox group"));
            }
            if !groups.insert(entry.group.as_str()) {
                return Err(ConfigError::DuplicateGroup(entry.group.clone()));
            }
        }

        Ok(Self { pick_list, dropbox })
    }

    /// Parse the parameters from YAML documents.
    pub fn from_yaml_str(pick_list: &str, dropbox: &str) -> Result<Self, ConfigError> {
        Self::new(serde_yaml::from_str(pick_list)?, serde_yaml::from_str(dropbox)?)
    }

    /// Load the parameters from a pick list file and a dropbox file.
    pub fn load(
        pick_list: impl AsRef<Path>,
        dropbox: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        Self::new(read_yaml(pick_list.as_ref())?, read_yaml(dropbox.as_ref())?)
    }

    /// Place position of a group.
    pub fn place_position(&self, group: &str) -> Option<[f64; 3]> {
        self.dropbox
            .dropbox
            .iter()
            .find(|d| d.group == group)
            .map(|d| d.position)
    }

    /// Arm assigned to a group.
    pub fn arm(&self, group: &str) -> Option<Arm> {
        self.dropbox.arms.get(group).copied()
    }

    /// Every pick list entry whose group has no dropbox or no arm.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for entry in &self.pick_list.object_list {
            if self.place_position(&entry.group).is_none() {
                issues.push(ConfigIssue::MissingDropbox {
                    object: entry.name.clone(),
                    group: entry.group.clone(),
                });
            }
            if self.arm(&entry.group).is_none() {
                issues.push(ConfigIssue::MissingArm {
                    object: entry.name.clone(),
                    group: entry.group.clone(),
                });
            }
        }
        issues
    }
}
