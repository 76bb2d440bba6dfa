//! Collision boundary extraction.
//!
//! The boundary is the set of cell edges separating a solid cell from an
//! empty one (or from the outside of the grid). Adjacent unit edges along the
//! same grid line are merged into a single segment, which keeps the collider
//! small for the long flat runs typical of artillery maps.
//!
//! Grid lines are independent of each other, so horizontal and vertical lines
//! are scanned in parallel with rayon. Results are collected in line order,
//! making the output identical across runs and thread counts.

use glam::Vec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::TerrainError;
use crate::grid::OccupancyGrid;
use crate::mapping::GridMapping;

/// A straight boundary edge in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start point
    pub a: Vec2,
    /// End point
    pub b: Vec2,
}

impl Segment {
    /// Create a segment.
    #[must_use]
    pub const fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }

    /// Closest point on the segment to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let ab = self.b - self.a;
        let len2 = ab.length_squared();
        if len2 <= f32::EPSILON {
            return self.a;
        }
        let t = ((point - self.a).dot(ab) / len2).clamp(0.0, 1.0);
        self.a + ab * t
    }
}

/// Collision boundary derived from an occupancy grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    segments: Vec<Segment>,
}

impl Boundary {
    /// A boundary with no edges.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extract the boundary of every solid region in `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::DegenerateBoundary`] if the grid has solid
    /// cells but no edges were produced.
    pub fn extract(grid: &OccupancyGrid, mapping: &GridMapping) -> Result<Self, TerrainError> {
        let (w, h) = (grid.width(), grid.height());

        let mut segments: Vec<Segment> = (0..=h)
            .into_par_iter()
            .flat_map_iter(|line| {
                runs(w, |x| edge_between(grid, (x, i64::from(line) - 1), (x, i64::from(line))))
                    .into_iter()
                    .map(move |(start, end)| {
                        #[allow(clippy::cast_precision_loss)]
                        let (x0, x1, y) = (start as f32, end as f32, line as f32);
                        Segment::new(
                            mapping.grid_to_world(Vec2::new(x0, y)),
                            mapping.grid_to_world(Vec2::new(x1, y)),
                        )
                    })
            })
            .collect();

        let vertical: Vec<Segment> = (0..=w)
            .into_par_iter()
            .flat_map_iter(|line| {
                runs(h, |y| edge_between(grid, (i64::from(line) - 1, y), (i64::from(line), y)))
                    .into_iter()
                    .map(move |(start, end)| {
                        #[allow(clippy::cast_precision_loss)]
                        let (y0, y1, x) = (start as f32, end as f32, line as f32);
                        Segment::new(
                            mapping.grid_to_world(Vec2::new(x, y0)),
                            mapping.grid_to_world(Vec2::new(x, y1)),
                        )
                    })
            })
            .collect();
        segments.extend(vertical);

        if segments.is_empty() && grid.has_solid() {
            return Err(TerrainError::DegenerateBoundary {
                solid_cells: grid.solid_count(),
            });
        }

        Ok(Self { segments })
    }

    /// Boundary edges.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of merged edges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if there are no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total edge length in world units.
    #[must_use]
    pub fn perimeter(&self) -> f32 {
        self.segments.iter().map(Segment::length).sum()
    }
}

fn edge_between(grid: &OccupancyGrid, a: (i64, i64), b: (i64, i64)) -> bool {
    grid.is_solid_signed(a.0, a.1) != grid.is_solid_signed(b.0, b.1)
}

/// Merge consecutive positions where `edge` holds into `[start, end)` runs.
fn runs(len: u32, edge: impl Fn(i64) -> bool) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    let mut start = None;
    for i in 0..len {
        match (edge(i64::from(i)), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, len));
    }
    out
}
