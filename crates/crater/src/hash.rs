//! State hashing for replica verification.
//!
//! Two fields built from the same config and fed the same carves must hash
//! equal. Replicas compare this against the authority after each turn.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::terrain::{BodyState, TerrainField};

/// Compute a deterministic hash of terrain state.
///
/// This hash includes:
/// - World extents and resolution
/// - Body state
/// - Every cell of the occupancy grid
///
/// Pending (unflushed) edits are already in the grid, so the hash does not
/// depend on flush timing.
#[must_use]
pub fn hash_terrain(terrain: &TerrainField) -> u64 {
    let mut hasher = DefaultHasher::new();

    let mapping = terrain.mapping();
    mapping.origin().x.to_bits().hash(&mut hasher);
    mapping.origin().y.to_bits().hash(&mut hasher);
    mapping.cell_size().x.to_bits().hash(&mut hasher);
    mapping.cell_size().y.to_bits().hash(&mut hasher);

    let grid = terrain.grid();
    grid.width().hash(&mut hasher);
    grid.height().hash(&mut hasher);

    match terrain.body_state() {
        BodyState::Active => 0u8.hash(&mut hasher),
        BodyState::Deactivated => 1u8.hash(&mut hasher),
    }

    // Pack cells so a 400x200 grid hashes 10k words, not 80k bools.
    for chunk in grid.cells().chunks(64) {
        let word = chunk
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &solid)| acc | (u64::from(solid) << i));
        word.hash(&mut hasher);
    }

    hasher.finish()
}
