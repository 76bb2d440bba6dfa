//! World ↔ grid coordinate mapping.
//!
//! The mapping is a fixed affine transform derived once from the terrain's
//! world extents and grid resolution. Every carve for the lifetime of a match
//! goes through the same instance, so authority and replicas always touch the
//! same cells for the same world-space command.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::TerrainError;
use crate::grid::CellCoord;
use crate::Bounds;

/// Inclusive rectangle of cells, already clipped to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSpan {
    /// Lower-left cell (inclusive)
    pub min: CellCoord,
    /// Upper-right cell (inclusive)
    pub max: CellCoord,
}

impl CellSpan {
    /// Iterate every cell in the span, row by row from the bottom.
    pub fn iter(self) -> impl Iterator<Item = CellCoord> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| CellCoord::new(x, y)))
    }
}

/// Affine transform between world space and grid space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMapping {
    origin: Vec2,
    cell_size: Vec2,
    width: u32,
    height: u32,
}

impl GridMapping {
    /// Derive the mapping for `bounds` split into `width` × `height` cells.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidBounds`] for degenerate extents and
    /// [`TerrainError::InvalidResolution`] for a zero dimension.
    pub fn new(bounds: Bounds, width: u32, height: u32) -> Result<Self, TerrainError> {
        if !bounds.is_valid() {
            let size = bounds.size();
            return Err(TerrainError::InvalidBounds {
                width: size.x,
                height: size.y,
            });
        }
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidResolution { width, height });
        }

        #[allow(clippy::cast_precision_loss)]
        let cells = Vec2::new(width as f32, height as f32);
        Ok(Self {
            origin: bounds.min,
            cell_size: bounds.size() / cells,
            width,
            height,
        })
    }

    /// World position of the grid's lower-left corner.
    #[must_use]
    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// World size of one cell.
    #[must_use]
    pub const fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// World extents covered by the grid.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        #[allow(clippy::cast_precision_loss)]
        let cells = Vec2::new(self.width as f32, self.height as f32);
        Bounds::from_min_max(self.origin, self.origin + self.cell_size * cells)
    }

    /// Continuous grid coordinates of a world point.
    #[must_use]
    pub fn world_to_grid(&self, world: Vec2) -> Vec2 {
        (world - self.origin) / self.cell_size
    }

    /// World coordinates of a continuous grid point.
    #[must_use]
    pub fn grid_to_world(&self, grid: Vec2) -> Vec2 {
        self.origin + grid * self.cell_size
    }

    /// World position of a cell's centre.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        #[allow(clippy::cast_precision_loss)]
        let g = Vec2::new(cell.x as f32 + 0.5, cell.y as f32 + 0.5);
        self.grid_to_world(g)
    }

    /// The cell containing a world point, if it lies on the grid.
    #[must_use]
    pub fn cell_at(&self, world: Vec2) -> Option<CellCoord> {
        let g = self.world_to_grid(world).floor();
        if !g.is_finite() || g.x < 0.0 || g.y < 0.0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (g.x as u32, g.y as u32);
        (x < self.width && y < self.height).then_some(CellCoord::new(x, y))
    }

    /// Cells overlapping a world rectangle, clipped to the grid.
    ///
    /// Returns `None` when the rectangle misses the grid entirely or is not
    /// finite.
    #[must_use]
    pub fn cell_span(&self, region: &Bounds) -> Option<CellSpan> {
        if !region.min.is_finite() || !region.max.is_finite() {
            return None;
        }
        let grid = self.bounds();
        if region.max.x < grid.min.x || region.max.y < grid.min.y || region.min.x >= grid.max.x || region.min.y >= grid.max.y {
            return None;
        }

        let lo = self.world_to_grid(grid.clamp(region.min)).floor().max(Vec2::ZERO);
        let hi = self.world_to_grid(grid.clamp(region.max)).floor().max(Vec2::ZERO);
        // The far edge of the grid floors onto one past the last cell.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let span = CellSpan {
            min: CellCoord::new((lo.x as u32).min(self.width - 1), (lo.y as u32).min(self.height - 1)),
            max: CellCoord::new((hi.x as u32).min(self.width - 1), (hi.y as u32).min(self.height - 1)),
        };
        Some(span)
    }
}
