//! Error types for terrain construction and boundary extraction.

use thiserror::Error;

/// Errors raised while building or rebuilding a terrain field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    /// World extents are empty, inverted, or not finite.
    #[error("invalid terrain bounds: size {width}x{height}")]
    InvalidBounds {
        /// World width
        width: f32,
        /// World height
        height: f32,
    },

    /// The grid resolution has a zero dimension.
    #[error("invalid grid resolution {width}x{height}")]
    InvalidResolution {
        /// Cells across
        width: u32,
        /// Cells down
        height: u32,
    },

    /// A mask buffer does not match the grid resolution.
    #[error("mask has {actual} cells, expected {expected}")]
    MaskSizeMismatch {
        /// Cells required by the resolution
        expected: usize,
        /// Cells supplied
        actual: usize,
    },

    /// Boundary extraction produced geometry inconsistent with the grid.
    #[error("degenerate boundary: {solid_cells} solid cells but no edges")]
    DegenerateBoundary {
        /// Solid cells at the time of extraction
        solid_cells: usize,
    },
}
