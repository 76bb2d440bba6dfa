//! Occupancy grid: the solid/empty bitmap behind a terrain field.
//!
//! Row 0 is the bottom of the world (smallest y). Image-style masks, whose
//! first row is the top, are flipped on load by [`OccupancyGrid::from_mask`].

use serde::{Deserialize, Serialize};

use crate::error::TerrainError;

/// Integer coordinates of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column, left to right
    pub x: u32,
    /// Row, bottom to top
    pub y: u32,
}

impl CellCoord {
    /// Create a cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Solid/empty occupancy bitmap.
///
/// The solid cell count is maintained incrementally so that solid-fraction
/// checks after each carve are O(1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    solid: usize,
}

impl OccupancyGrid {
    /// Create a grid with every cell empty.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidResolution`] if either dimension is zero.
    pub fn empty(width: u32, height: u32) -> Result<Self, TerrainError> {
        Self::filled_with(width, height, false)
    }

    /// Create a grid with every cell solid.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidResolution`] if either dimension is zero.
    pub fn solid(width: u32, height: u32) -> Result<Self, TerrainError> {
        Self::filled_with(width, height, true)
    }

    fn filled_with(width: u32, height: u32, value: bool) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidResolution { width, height });
        }
        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            cells: vec![value; len],
            solid: if value { len } else { 0 },
        })
    }

    /// Build a grid from an image mask.
    ///
    /// `mask` holds one byte per pixel, rows top-to-bottom as an image
    /// decoder would produce them (typically the alpha channel). A pixel is
    /// solid when its value is strictly greater than `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidResolution`] for a zero dimension and
    /// [`TerrainError::MaskSizeMismatch`] if the mask length is wrong.
    pub fn from_mask(width: u32, height: u32, mask: &[u8], threshold: u8) -> Result<Self, TerrainError> {
        let mut grid = Self::empty(width, height)?;
        let expected = grid.len();
        if mask.len() != expected {
            return Err(TerrainError::MaskSizeMismatch {
                expected,
                actual: mask.len(),
            });
        }

        let w = width as usize;
        for (image_row, pixels) in mask.chunks_exact(w).enumerate() {
            // Flip: image row 0 is the top of the world.
            let y = height as usize - 1 - image_row;
            for (x, &pixel) in pixels.iter().enumerate() {
                if pixel > threshold {
                    grid.cells[y * w + x] = true;
                    grid.solid += 1;
                }
            }
        }
        Ok(grid)
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the grid has no cells (never, for a constructed grid).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of solid cells.
    #[must_use]
    pub const fn solid_count(&self) -> usize {
        self.solid
    }

    /// Returns `true` if at least one cell is solid.
    #[must_use]
    pub const fn has_solid(&self) -> bool {
        self.solid > 0
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        (cell.x < self.width && cell.y < self.height)
            .then(|| cell.y as usize * self.width as usize + cell.x as usize)
    }

    /// Returns whether a cell is solid. Out-of-range cells are empty.
    #[must_use]
    pub fn is_solid(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some_and(|i| self.cells[i])
    }

    /// Signed lookup used by neighbourhood scans. Anything outside is empty.
    #[must_use]
    pub fn is_solid_signed(&self, x: i64, y: i64) -> bool {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.is_solid(CellCoord::new(x, y)),
            _ => false,
        }
    }

    /// Clears a cell. Returns `true` only if the cell was solid before.
    ///
    /// Out-of-range cells are ignored, so a stray coordinate can never write
    /// past the buffer.
    pub fn clear(&mut self, cell: CellCoord) -> bool {
        match self.index(cell) {
            Some(i) if self.cells[i] => {
                self.cells[i] = false;
                self.solid -= 1;
                true
            }
            _ => false,
        }
    }

    /// Fills a cell. Returns `true` only if the cell was empty before.
    pub fn fill(&mut self, cell: CellCoord) -> bool {
        match self.index(cell) {
            Some(i) if !self.cells[i] => {
                self.cells[i] = true;
                self.solid += 1;
                true
            }
            _ => false,
        }
    }

    /// Borrow one row of cells.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[must_use]
    pub fn row(&self, y: u32) -> &[bool] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.cells[start..start + w]
    }

    /// Raw cell buffer in row-major order, bottom row first.
    #[must_use]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }
}
