#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pick list, dropbox and arm parameters.
pub mod config;

/// Obstacle map construction.
pub mod obstacle;

/// The pick-place state machine.
pub mod orchestrator;

/// Poses in the robot frame.
pub mod pose;

/// Per entry pick records and their YAML output.
pub mod record;

/// The manipulation service interface.
pub mod service;

/// Matching pick list entries against detections.
pub mod task;
