use tabletop_3d::voxel_grid::VoxelGridError;

/// An error type for the segmentation stage.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SegmentError {
    /// Error when the cloud is too small or too degenerate to fit a plane.
    #[error("Insufficient data to fit a plane: required {required} points, got {actual}")]
    InsufficientData {
        /// Minimum number of points needed.
        required: usize,
        /// Number of points received.
        actual: usize,
    },
}

/// An error type for the perception pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PerceptionError {
    /// Error when no support surface could be extracted from the frame.
    #[error(transparent)]
    Segment(#[from] SegmentError),

    /// Error when the cleaning stage is misconfigured.
    #[error(transparent)]
    VoxelGrid(#[from] VoxelGridError),
}
