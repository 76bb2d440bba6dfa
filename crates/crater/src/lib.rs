//! # Crater
//!
//! Destructible occupancy terrain for artillery simulations.
//!
//! Crater represents the ground as a single solid/empty grid laid over a
//! rectangular region of world space. Weapons carve circular or annular holes
//! into it, and a collision boundary is re-derived from the grid in batches.
//!
//! - **Occupancy grid**: one shared buffer per match, carving is idempotent
//! - **Fixed mapping**: world ↔ grid is an affine transform fixed at creation
//! - **Carve stamps**: circles and rings, clipped to the grid
//! - **Batched boundary**: edits are queued and flushed on an interval
//! - **State hash**: replicas compare hashes to prove they carved identically
//!
//! ## Quick Start
//!
//! ```
//! use crater::{Bounds, TerrainConfig, TerrainField};
//! use glam::Vec2;
//!
//! let config = TerrainConfig::new(Bounds::from_min_max(Vec2::ZERO, Vec2::new(64.0, 32.0)), 64, 32);
//! let mut terrain = TerrainField::from_heightmap(config, |_| 16.0).unwrap();
//!
//! let report = terrain.carve(Vec2::new(32.0, 16.0), 4.0);
//! assert!(report.changed > 0);
//!
//! // Carving the same hole again changes nothing.
//! assert_eq!(terrain.carve(Vec2::new(32.0, 16.0), 4.0).changed, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod boundary;
pub mod error;
pub mod grid;
pub mod hash;
pub mod mapping;
pub mod stamp;
pub mod stats;
pub mod terrain;

// Re-exports for convenience
pub use boundary::{Boundary, Segment};
pub use error::TerrainError;
pub use grid::{CellCoord, OccupancyGrid};
pub use hash::hash_terrain;
pub use mapping::{CellSpan, GridMapping};
pub use stamp::CarveShape;
pub use stats::SolidStats;
pub use terrain::{BodyState, BoundaryOutcome, CarveReport, FlushReport, TerrainConfig, TerrainField};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from dimensions (centered at origin).
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(-width / 2.0, -height / 2.0),
            max: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Create bounds from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Get the size of the bounds.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Returns `true` if both extents are finite and strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let size = self.size();
        self.min.is_finite() && self.max.is_finite() && size.x > 0.0 && size.y > 0.0
    }

    /// Clamp a point into the bounds.
    #[must_use]
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Check if this bounds intersects a circle.
    #[must_use]
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = self.clamp(center);
        center.distance_squared(closest) <= radius * radius
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from_min_max(Vec2::ZERO, Vec2::new(200.0, 100.0))
    }
}
