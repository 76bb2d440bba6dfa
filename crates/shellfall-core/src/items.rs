//! Pickups lying in the world.
//!
//! Items are keyed by id for deterministic iteration. Replicas only learn
//! about a pickup through an `ItemPickup` command carrying the item's name and
//! position, so [`WorldItems::take_matching`] resolves it the same way on
//! every participant.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::weapon::{Ammo, WeaponKind};

/// Positions closer than this are the same item.
const POSITION_EPSILON: f32 = 1e-3;

/// What collecting an item does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ItemEffect {
    /// Add a weapon (or restock it)
    GrantWeapon {
        /// Weapon granted
        kind: WeaponKind,
        /// Shots granted
        ammo: Ammo,
    },
    /// Restore health
    Heal {
        /// Hit points restored
        amount: f32,
    },
}

/// A pickup in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldItem {
    /// Display name, also used to match pickup commands
    pub name: String,
    /// Where it lies
    pub position: Vec2,
    /// What it does
    pub effect: ItemEffect,
}

impl WorldItem {
    /// A weapon crate.
    #[must_use]
    pub fn weapon_crate(kind: WeaponKind, ammo: Ammo, position: Vec2) -> Self {
        Self {
            name: format!("{kind} crate"),
            position,
            effect: ItemEffect::GrantWeapon { kind, ammo },
        }
    }

    /// A health pack.
    #[must_use]
    pub fn health_pack(amount: f32, position: Vec2) -> Self {
        Self {
            name: "Health pack".to_string(),
            position,
            effect: ItemEffect::Heal { amount },
        }
    }
}

/// Items currently in the world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldItems {
    items: BTreeMap<u64, WorldItem>,
    next_id: u64,
}

impl WorldItems {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an item and return its id.
    pub fn spawn(&mut self, item: WorldItem) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.insert(id, item);
        id
    }

    /// Items in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &WorldItem)> + '_ {
        self.items.iter().map(|(&id, item)| (id, item))
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of items within `radius` of `point`, ascending.
    #[must_use]
    pub fn within(&self, point: Vec2, radius: f32) -> Vec<u64> {
        self.items
            .iter()
            .filter(|(_, item)| item.position.distance(point) <= radius)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Remove an item by id.
    pub fn remove(&mut self, id: u64) -> Option<WorldItem> {
        self.items.remove(&id)
    }

    /// Remove the lowest-id item with this name at this position.
    pub fn take_matching(&mut self, name: &str, position: Vec2) -> Option<WorldItem> {
        let id = self
            .items
            .iter()
            .find(|(_, item)| item.name == name && item.position.distance(position) <= POSITION_EPSILON)
            .map(|(&id, _)| id)?;
        self.items.remove(&id)
    }
}
