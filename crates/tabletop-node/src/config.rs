use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabletop_features::descriptor::FeatureConfig;
use tabletop_perception::config::PerceptionConfig;
use tabletop_pickplace::orchestrator::OrchestratorConfig;

use crate::simulated_service::SimulatedServiceConfig;
use crate::NodeError;

/// Where frames come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory of binary `.pcd` frames.
    pub frames_dir: Option<PathBuf>,
    /// Frames per second.
    pub rate_hz: f64,
    /// Start over after the last frame.
    pub looping: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            frames_dir: None,
            rate_hz: 1.0,
            looping: false,
        }
    }
}

/// Everything the node needs besides the model and the pick-place parameters.
///
/// Every section is optional in the YAML file:
///
/// ```yaml
/// perception:
///   preprocess:
///     leaf_size: 0.01
///   cluster:
///     tolerance: 0.05
/// pickplace:
///   scene_id: 2
///   dwell_secs: 16.0
///   match_policy: last_match
///   output_path: output_2.yaml
/// source:
///   frames_dir: frames/
///   rate_hz: 2.0
/// max_passes: 1
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Perception stages.
    pub perception: PerceptionConfig,
    /// Expected descriptor layout, checked against the model at startup.
    pub features: Option<FeatureConfig>,
    /// Pick pass settings.
    pub pickplace: OrchestratorConfig,
    /// Frame source.
    pub source: SourceConfig,
    /// Simulated manipulation service.
    pub service: SimulatedServiceConfig,
    /// Stop after this many pick passes.
    pub max_passes: Option<usize>,
}

impl NodeConfig {
    /// Load the configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| NodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Fail when a configured descriptor layout disagrees with the model's.
    pub fn check_features(&self, model: &FeatureConfig) -> Result<(), NodeError> {
        match &self.features {
            Some(configured) if configured != model => Err(NodeError::FeatureLayout {
                configured: format!("{configured:?}"),
                model: format!("{model:?}"),
            }),
            _ => Ok(()),
        }
    }
}
