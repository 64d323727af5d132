#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Euclidean cluster extraction.
pub mod clustering;

/// Passthrough and statistical outlier filters.
pub mod filters;

/// I/O utilities for reading point cloud frames.
pub mod io;

/// k-d tree spatial index.
pub mod kdtree;

/// Surface normal estimation.
pub mod normals;

/// Operations on 3D points.
pub mod ops;

/// Point cloud container.
pub mod pointcloud;

/// Robust plane segmentation.
pub mod segmentation;

/// Voxel grid downsampling.
pub mod voxel_grid;
