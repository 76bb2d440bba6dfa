//! `TerrainField`: top-level API for Crater.
//!
//! The field wraps the occupancy grid, its fixed world mapping and the derived
//! collision boundary. Carves write the grid immediately (queries always see
//! the latest ground) but boundary regeneration is batched: changed cells are
//! queued and flushed every `flush_interval` seconds, bounding the cost of a
//! burst of small edits such as a beam or an expanding ring.
//!
//! Two transitions bypass the batch and regenerate at once: the grid going
//! from "has solid cells" to "fully empty" and the reverse.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::boundary::Boundary;
use crate::error::TerrainError;
use crate::grid::{CellCoord, OccupancyGrid};
use crate::mapping::GridMapping;
use crate::stamp::CarveShape;
use crate::stats::SolidStats;
use crate::Bounds;

/// Configuration for a terrain field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// World extents covered by the grid
    pub bounds: Bounds,
    /// Cells across
    pub width: u32,
    /// Cells down
    pub height: u32,
    /// Seconds between batched boundary rebuilds
    pub flush_interval: f32,
    /// Below this solid percentage the terrain body is switched off
    pub min_solid_percent: f32,
}

impl TerrainConfig {
    /// Create a config with default batching parameters.
    #[must_use]
    pub fn new(bounds: Bounds, width: u32, height: u32) -> Self {
        Self {
            bounds,
            width,
            height,
            ..Self::default()
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            width: 400,
            height: 200,
            flush_interval: 0.1,
            min_solid_percent: 1.0,
        }
    }
}

/// Whether the terrain still has a collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyState {
    /// Collider present and rendered
    Active,
    /// No collider and nothing to render
    Deactivated,
}

/// Result of a single carve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CarveReport {
    /// Cells that went from solid to empty
    pub changed: usize,
}

/// What a boundary rebuild did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryOutcome {
    /// New collider geometry is in place
    Regenerated {
        /// Merged edge count
        segments: usize,
    },
    /// The body was switched off instead
    Deactivated {
        /// Solid percentage at the time
        solid_percent: f32,
    },
    /// The body was already off; nothing to do
    Inactive,
}

/// Result of flushing queued edits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlushReport {
    /// Changed cells applied in this batch
    pub cells: usize,
    /// Boundary result, if a rebuild ran
    pub outcome: Option<BoundaryOutcome>,
}

/// The destructible ground of one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainField {
    config: TerrainConfig,
    mapping: GridMapping,
    grid: OccupancyGrid,
    boundary: Boundary,
    body: BodyState,
    /// Cells changed since the last flush
    pending: Vec<CellCoord>,
    /// Seconds since the last flush
    since_flush: f32,
    /// Set when a solid/empty transition demands an immediate rebuild
    transition: bool,
    /// Number of carve stamps applied, including no-op ones
    carves: u64,
}

impl TerrainField {
    /// Create a field from an existing grid.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds are degenerate or the grid does not
    /// match the configured resolution.
    pub fn new(config: TerrainConfig, grid: OccupancyGrid) -> Result<Self, TerrainError> {
        let mapping = GridMapping::new(config.bounds, config.width, config.height)?;
        if grid.width() != config.width || grid.height() != config.height {
            return Err(TerrainError::MaskSizeMismatch {
                expected: config.width as usize * config.height as usize,
                actual: grid.len(),
            });
        }

        let mut field = Self {
            config,
            mapping,
            grid,
            boundary: Boundary::empty(),
            body: BodyState::Active,
            pending: Vec::new(),
            since_flush: 0.0,
            transition: false,
            carves: 0,
        };
        field.regenerate_boundary();
        Ok(field)
    }

    /// Create a field from an image mask (rows top-to-bottom).
    ///
    /// # Errors
    ///
    /// See [`OccupancyGrid::from_mask`] and [`TerrainField::new`].
    pub fn from_mask(config: TerrainConfig, mask: &[u8], threshold: u8) -> Result<Self, TerrainError> {
        let grid = OccupancyGrid::from_mask(config.width, config.height, mask, threshold)?;
        Self::new(config, grid)
    }

    /// Create a field whose columns are solid up to `surface(x)`.
    ///
    /// `surface` receives the world x of a column centre and returns the world
    /// y of the ground there. A cell is solid when its centre is at or below
    /// that height.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds or resolution are invalid.
    pub fn from_heightmap(config: TerrainConfig, surface: impl Fn(f32) -> f32) -> Result<Self, TerrainError> {
        let mapping = GridMapping::new(config.bounds, config.width, config.height)?;
        let mut grid = OccupancyGrid::empty(config.width, config.height)?;
        for x in 0..config.width {
            let top = surface(mapping.cell_center(CellCoord::new(x, 0)).x);
            for y in 0..config.height {
                let cell = CellCoord::new(x, y);
                if mapping.cell_center(cell).y <= top {
                    grid.fill(cell);
                }
            }
        }
        Self::new(config, grid)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Clear every cell whose centre lies within `radius` of `center`.
    pub fn carve(&mut self, center: Vec2, radius: f32) -> CarveReport {
        self.carve_shape(&CarveShape::circle(center, radius))
    }

    /// Clear only the annulus `inner < d <= outer` around `center`.
    ///
    /// Continuously carving effects call this with the previously processed
    /// radius as `inner`, so the interior is never scanned twice.
    pub fn carve_ring(&mut self, center: Vec2, inner: f32, outer: f32) -> CarveReport {
        self.carve_shape(&CarveShape::ring(center, inner, outer))
    }

    /// Apply a carve stamp.
    pub fn carve_shape(&mut self, shape: &CarveShape) -> CarveReport {
        self.carves += 1;
        if !shape.is_valid() {
            warn!(?shape, "ignoring invalid carve");
            return CarveReport::default();
        }
        let span = self
            .mapping
            .bounds()
            .intersects_circle(shape.center(), shape.reach())
            .then(|| self.mapping.cell_span(&shape.bounds()))
            .flatten();
        let Some(span) = span else {
            trace!(?shape, "carve outside terrain");
            return CarveReport::default();
        };

        let had_solid = self.grid.has_solid();
        let mut changed = 0;
        for cell in span.iter() {
            if shape.contains(self.mapping.cell_center(cell)) && self.grid.clear(cell) {
                self.pending.push(cell);
                changed += 1;
            }
        }

        if had_solid && !self.grid.has_solid() {
            self.transition = true;
        }
        if changed > 0 {
            debug!(
                center = ?shape.center(),
                changed,
                remaining = self.grid.solid_count(),
                "terrain carved"
            );
        }
        if self.transition {
            self.flush();
        }
        CarveReport { changed }
    }

    /// Advance the batch timer, flushing queued edits when it elapses.
    pub fn tick(&mut self, dt: f32) -> Option<FlushReport> {
        self.since_flush += dt;
        if self.since_flush < self.config.flush_interval {
            return None;
        }
        self.since_flush = 0.0;
        if self.pending.is_empty() && !self.transition {
            return None;
        }
        Some(self.flush())
    }

    /// Apply queued edits now and rebuild the boundary if anything changed.
    pub fn flush(&mut self) -> FlushReport {
        let cells = self.pending.len();
        self.pending.clear();
        self.since_flush = 0.0;

        if cells == 0 && !self.transition {
            return FlushReport {
                cells,
                outcome: None,
            };
        }
        self.transition = false;
        FlushReport {
            cells,
            outcome: Some(self.regenerate_boundary()),
        }
    }

    /// Recompute the collision boundary from the grid.
    ///
    /// If the solid percentage is below `min_solid_percent`, or extraction
    /// fails, the body is deactivated instead of keeping degenerate geometry.
    pub fn regenerate_boundary(&mut self) -> BoundaryOutcome {
        if self.body == BodyState::Deactivated {
            return BoundaryOutcome::Inactive;
        }

        let stats = self.stats();
        if stats.solid_cells == 0 || stats.percent() < self.config.min_solid_percent {
            return self.deactivate(stats.percent());
        }

        match Boundary::extract(&self.grid, &self.mapping) {
            Ok(boundary) => {
                let segments = boundary.len();
                self.boundary = boundary;
                trace!(segments, "terrain boundary regenerated");
                BoundaryOutcome::Regenerated { segments }
            }
            Err(err) => {
                warn!(error = %err, "boundary extraction failed; deactivating terrain");
                self.deactivate(stats.percent())
            }
        }
    }

    fn deactivate(&mut self, solid_percent: f32) -> BoundaryOutcome {
        info!(solid_percent, "terrain body deactivated");
        self.body = BodyState::Deactivated;
        self.boundary = Boundary::empty();
        BoundaryOutcome::Deactivated { solid_percent }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Is there solid ground at a world point? Always `false` once deactivated.
    #[must_use]
    pub fn is_solid_world(&self, point: Vec2) -> bool {
        self.is_active()
            && self
                .mapping
                .cell_at(point)
                .is_some_and(|cell| self.grid.is_solid(cell))
    }

    /// World y of the top of the highest solid cell in the column under `x`.
    #[must_use]
    pub fn surface_y(&self, x: f32) -> Option<f32> {
        if !self.is_active() {
            return None;
        }
        let probe = Vec2::new(x, self.mapping.bounds().min.y);
        let column = self.mapping.cell_at(probe)?.x;
        (0..self.grid.height())
            .rev()
            .find(|&y| self.grid.is_solid(CellCoord::new(column, y)))
            .map(|y| self.mapping.cell_center(CellCoord::new(column, y)).y + self.mapping.cell_size().y * 0.5)
    }

    /// Solid-area snapshot.
    #[must_use]
    pub fn stats(&self) -> SolidStats {
        SolidStats::of(&self.grid)
    }

    /// Solid fraction in [0, 1].
    #[must_use]
    pub fn solid_fraction(&self) -> f32 {
        self.stats().fraction()
    }

    /// Whether the terrain body is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.body == BodyState::Active
    }

    /// Current body state.
    #[must_use]
    pub const fn body_state(&self) -> BodyState {
        self.body
    }

    /// The current collision boundary.
    #[must_use]
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// The occupancy grid.
    #[must_use]
    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// The world ↔ grid mapping.
    #[must_use]
    pub const fn mapping(&self) -> &GridMapping {
        &self.mapping
    }

    /// Field configuration.
    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Changed cells waiting for the next flush.
    #[must_use]
    pub fn pending_cells(&self) -> usize {
        self.pending.len()
    }

    /// Number of carve stamps applied so far.
    #[must_use]
    pub const fn carve_count(&self) -> u64 {
        self.carves
    }

    /// Deterministic hash of the occupancy state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        crate::hash::hash_terrain(self)
    }
}
