#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Node configuration file.
pub mod config;

mod error;
pub use error::NodeError;

/// Point cloud frame sources.
pub mod frame_source;

/// Publisher that summarizes everything in the log.
pub mod log_publisher;

/// Task consuming scenes and running pick passes.
pub mod mover_node;

/// Task turning frames into scenes.
pub mod perception_node;

/// Publisher streaming to the rerun viewer.
pub mod rerun_publisher;

/// In-process stand-in for the robot's pick-place routine.
pub mod simulated_service;
