use std::path::PathBuf;

use tabletop_3d::io::pcd::PcdError;
use tabletop_features::ModelError;
use tabletop_perception::PerceptionError;
use tabletop_pickplace::config::ConfigError;

/// An error type for starting and running the node.
#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    /// Error when a file or directory cannot be accessed.
    #[error("Failed to access {path}")]
    Io {
        /// The path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Error when the node configuration is not valid YAML.
    #[error("Failed to parse node configuration")]
    Yaml(#[from] serde_yaml::Error),

    /// Error when no frames directory is configured.
    #[error("No frames directory given, use --frames or source.frames_dir")]
    MissingFramesDir,

    /// Error when the frames directory holds no `.pcd` file.
    #[error("No .pcd frames in {0}")]
    NoFrames(PathBuf),

    /// Error when the frame rate is not strictly positive.
    #[error("Frame rate must be positive. Got: {0}")]
    InvalidRate(f64),

    /// Error when a frame cannot be decoded.
    #[error(transparent)]
    Pcd(#[from] PcdError),

    /// Error when the model cannot be loaded.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Error when the pick-place parameters cannot be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error when the perception pipeline cannot be built.
    #[error(transparent)]
    Perception(#[from] PerceptionError),

    /// Error when a worker task panicked or was aborted.
    #[error("Worker task failed")]
    Task(#[from] tokio::task::JoinError),

    /// Error when the configured descriptor layout disagrees with the model.
    #[error("Descriptor layout {configured} does not match the model's {model}")]
    FeatureLayout {
        /// Layout from the node configuration.
        configured: String,
        /// Layout stored in the model.
        model: String,
    },
}
