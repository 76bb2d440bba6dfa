//! Combatants: the players and bots taking turns in a match.
//!
//! - [`CombatantId`]: unique identifier, ordered for deterministic iteration
//! - [`Combatant`]: health, transform, inventory and status of one participant
//! - [`CombatantSpec`]: what the lobby hands over when a combatant joins
//!
//! # Example
//!
//! ```
//! use shellfall_core::entity::{Combatant, CombatantId, CombatantSpec};
//! use shellfall_core::weapon::WeaponTable;
//! use glam::Vec2;
//!
//! let spec = CombatantSpec::human("Ada", Vec2::new(10.0, 40.0));
//! let ada = Combatant::new(CombatantId::new(1), spec, 100.0, &WeaponTable::default(), 5);
//!
//! assert!(ada.is_alive());
//! assert_eq!(ada.health().current(), 100.0);
//! ```

pub mod components;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use components::{Facing, Health, StatusFlags, Transform};

use crate::inventory::Inventory;
use crate::weapon::WeaponTable;

/// Unique identifier for a combatant.
///
/// Ids are assigned in join order and never reused within a match. Their
/// numeric order is the iteration order everywhere state is walked.
///
/// ```
/// use shellfall_core::entity::CombatantId;
///
/// let a = CombatantId::new(1);
/// let b = CombatantId::new(2);
/// assert!(a < b);
/// assert_eq!(b.as_u64(), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CombatantId(u64);

impl CombatantId {
    /// Creates a new `CombatantId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombatantId({})", self.0)
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CombatantId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<CombatantId> for u64 {
    fn from(id: CombatantId) -> Self {
        id.0
    }
}

/// Lobby description of a joining combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSpec {
    /// Display name
    pub name: String,
    /// Controlled by the AI pipeline
    pub is_bot: bool,
    /// Spawn position (body centre)
    pub position: Vec2,
    /// Cosmetic colour slot
    pub color_index: u8,
}

impl CombatantSpec {
    /// A human-controlled combatant.
    #[must_use]
    pub fn human(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            name: name.into(),
            is_bot: false,
            position,
            color_index: 0,
        }
    }

    /// A bot-controlled combatant.
    #[must_use]
    pub fn bot(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            is_bot: true,
            ..Self::human(name, position)
        }
    }

    /// Set the colour slot.
    #[must_use]
    pub const fn with_color(mut self, color_index: u8) -> Self {
        self.color_index = color_index;
        self
    }
}

/// One participant in a match.
///
/// # Invariants
///
/// - `0 <= health <= max_health` at all times
/// - Once eliminated, a combatant never becomes alive again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    id: CombatantId,
    name: String,
    health: Health,
    /// Position and facing
    pub transform: Transform,
    status: StatusFlags,
    /// Owned weapons
    pub inventory: Inventory,
    color_index: u8,
}

impl Combatant {
    /// Build a combatant at full health with the default loadout.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier assigned by the arena
    /// * `spec` - Lobby description
    /// * `max_health` - Starting and maximum health
    /// * `weapons` - Weapon table used for the starting loadout
    /// * `slots` - Inventory capacity
    #[must_use]
    pub fn new(id: CombatantId, spec: CombatantSpec, max_health: f32, weapons: &WeaponTable, slots: usize) -> Self {
        let mut status = StatusFlags::empty();
        status.set(StatusFlags::BOT, spec.is_bot);
        Self {
            id,
            name: spec.name,
            health: Health::full(max_health),
            transform: Transform {
                position: spec.position,
                facing: Facing::default(),
            },
            status,
            inventory: Inventory::starting(weapons, slots),
            color_index: spec.color_index,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Controlled by the AI pipeline.
    #[must_use]
    pub const fn is_bot(&self) -> bool {
        self.status.contains(StatusFlags::BOT)
    }

    /// Health snapshot.
    #[must_use]
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Mutable health. Prefer the damage resolver, which also emits events.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Status flags.
    #[must_use]
    pub const fn status(&self) -> StatusFlags {
        self.status
    }

    /// Alive: not eliminated by damage or by falling.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.status.contains(StatusFlags::ELIMINATED)
    }

    /// Mark the combatant eliminated.
    ///
    /// Returns `true` only on the first call; elimination is terminal.
    pub fn eliminate(&mut self, fell: bool) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.status.insert(StatusFlags::ELIMINATED);
        self.status.set(StatusFlags::FELL, fell);
        true
    }

    /// Body centre.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Cosmetic colour slot.
    #[must_use]
    pub const fn color_index(&self) -> u8 {
        self.color_index
    }

    /// Change the colour slot.
    pub fn set_color_index(&mut self, color_index: u8) {
        self.color_index = color_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combatant() -> Combatant {
        Combatant::new(
            CombatantId::new(7),
            CombatantSpec::bot("Bot", Vec2::new(3.0, 4.0)).with_color(2),
            80.0,
            &WeaponTable::default(),
            5,
        )
    }

    mod combatant_id_tests {
        use super::*;

        #[test]
        fn display_and_debug() {
            let id = CombatantId::new(42);
            assert_eq!(format!("{id}"), "42");
            assert_eq!(format!("{id:?}"), "CombatantId(42)");
        }

        #[test]
        fn conversions() {
            let id: CombatantId = 9.into();
            assert_eq!(u64::from(id), 9);
        }
    }

    mod combatant_tests {
        use super::*;

        #[test]
        fn spec_fields_carried_over() {
            let c = combatant();
            assert!(c.is_bot());
            assert_eq!(c.name(), "Bot");
            assert_eq!(c.color_index(), 2);
            assert_eq!(c.position(), Vec2::new(3.0, 4.0));
            assert!((c.health().max() - 80.0).abs() < f32::EPSILON);
        }

        #[test]
        fn elimination_is_terminal() {
            let mut c = combatant();
            assert!(c.eliminate(false));
            assert!(!c.eliminate(true));
            assert!(!c.is_alive());
            assert!(!c.status().contains(StatusFlags::FELL));
        }

        #[test]
        fn starts_with_default_weapon() {
            let c = combatant();
            assert!(c.inventory.selected().is_some());
        }
    }
}
