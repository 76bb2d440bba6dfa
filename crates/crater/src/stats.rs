//! Solid-area statistics.

use serde::{Deserialize, Serialize};

use crate::grid::OccupancyGrid;

/// Snapshot of how much of the grid is still solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolidStats {
    /// Solid cells
    pub solid_cells: usize,
    /// All cells
    pub total_cells: usize,
}

impl SolidStats {
    /// Take a snapshot of a grid.
    #[must_use]
    pub fn of(grid: &OccupancyGrid) -> Self {
        Self {
            solid_cells: grid.solid_count(),
            total_cells: grid.len(),
        }
    }

    /// Solid fraction in [0, 1].
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.total_cells == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.solid_cells as f32 / self.total_cells as f32;
        fraction
    }

    /// Solid percentage in [0, 100].
    #[must_use]
    pub fn percent(&self) -> f32 {
        self.fraction() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellCoord;

    #[test]
    fn fraction_of_half_carved_grid() {
        let mut grid = OccupancyGrid::solid(2, 2).unwrap();
        grid.clear(CellCoord::new(0, 0));
        grid.clear(CellCoord::new(1, 0));

        let stats = SolidStats::of(&grid);
        assert_eq!(stats.solid_cells, 2);
        assert!((stats.fraction() - 0.5).abs() < f32::EPSILON);
        assert!((stats.percent() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn empty_stats_are_zero() {
        assert_eq!(SolidStats::default().fraction(), 0.0);
    }
}
