//! The match roster.
//!
//! The Arena stores every combatant that joined the match, alive or not.
//! Eliminated combatants are never removed: "alive + eliminated = total" is
//! checked against this map.
//!
//! # Determinism
//!
//! Storage is a `BTreeMap` keyed by [`CombatantId`]. Ids are assigned in join
//! order, so every walk over the roster (radius queries, damage application,
//! win checks) visits combatants in the same order on every participant.
//!
//! # Example
//!
//! ```
//! use shellfall_core::arena::Arena;
//! use shellfall_core::entity::CombatantSpec;
//! use shellfall_core::weapon::WeaponTable;
//! use glam::Vec2;
//!
//! let table = WeaponTable::default();
//! let mut arena = Arena::new();
//! let a = arena.spawn(CombatantSpec::human("A", Vec2::new(0.0, 0.0)), 100.0, &table, 5);
//! let b = arena.spawn(CombatantSpec::bot("B", Vec2::new(30.0, 0.0)), 100.0, &table, 5);
//!
//! assert_eq!(arena.ids().collect::<Vec<_>>(), vec![a, b]);
//! assert_eq!(arena.query_radius(Vec2::ZERO, 10.0), vec![a]);
//! ```

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::{Combatant, CombatantId, CombatantSpec};
use crate::weapon::WeaponTable;

/// Combatant storage with deterministic iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arena {
    /// Next id to hand out.
    next_id: u64,
    /// All combatants, keyed by id.
    combatants: BTreeMap<CombatantId, Combatant>,
}

impl Arena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            combatants: BTreeMap::new(),
        }
    }

    /// Adds a combatant at full health with the default loadout.
    ///
    /// # Arguments
    ///
    /// * `spec` - Lobby description of the combatant
    /// * `max_health` - Starting and maximum health
    /// * `weapons` - Weapon table for the starting loadout
    /// * `slots` - Inventory capacity
    ///
    /// # Returns
    ///
    /// The id assigned to the new combatant.
    pub fn spawn(&mut self, spec: CombatantSpec, max_health: f32, weapons: &WeaponTable, slots: usize) -> CombatantId {
        let id = CombatantId::new(self.next_id.max(1));
        self.next_id = id.as_u64() + 1;
        self.combatants
            .insert(id, Combatant::new(id, spec, max_health, weapons, slots));
        id
    }

    /// Inserts a combatant built elsewhere (replicas mirror the authority's ids).
    pub fn insert(&mut self, combatant: Combatant) {
        let id = combatant.id();
        self.next_id = self.next_id.max(id.as_u64() + 1);
        self.combatants.insert(id, combatant);
    }

    /// Returns a combatant by id.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// Returns a mutable combatant by id.
    #[must_use]
    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(&id)
    }

    /// Whether `id` is in the roster and alive.
    #[must_use]
    pub fn is_alive(&self, id: CombatantId) -> bool {
        self.get(id).is_some_and(Combatant::is_alive)
    }

    /// Ids in join order.
    pub fn ids(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.combatants.keys().copied()
    }

    /// Combatants in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.combatants.values()
    }

    /// Mutable combatants in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Combatant> + '_ {
        self.combatants.values_mut()
    }

    /// Living combatants in id order.
    pub fn alive(&self) -> impl Iterator<Item = &Combatant> + '_ {
        self.combatants.values().filter(|c| c.is_alive())
    }

    /// Number of living combatants.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive().count()
    }

    /// Total number of combatants, alive or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Returns `true` if nobody joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Living combatants whose centre is within `radius` of `center`.
    ///
    /// Returns ids sorted ascending.
    #[must_use]
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<CombatantId> {
        let radius_sq = radius * radius;
        self.alive()
            .filter(|c| center.distance_squared(c.position()) <= radius_sq)
            .map(Combatant::id)
            .collect()
    }

    /// Moves a combatant and turns it toward the movement.
    ///
    /// Returns `false` if the id is unknown.
    pub fn set_position(&mut self, id: CombatantId, position: Vec2) -> bool {
        match self.get_mut(id) {
            Some(combatant) => {
                let dx = position.x - combatant.transform.position.x;
                combatant.transform.facing = combatant.transform.facing.toward(dx);
                combatant.transform.position = position;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Facing;

    fn arena_with(positions: &[Vec2]) -> (Arena, Vec<CombatantId>) {
        let table = WeaponTable::default();
        let mut arena = Arena::new();
        let ids = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| arena.spawn(CombatantSpec::human(format!("c{i}"), p), 100.0, &table, 5))
            .collect();
        (arena, ids)
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn ids_are_sequential_from_one() {
            let (arena, ids) = arena_with(&[Vec2::ZERO, Vec2::ONE, Vec2::X]);
            assert_eq!(ids, vec![CombatantId::new(1), CombatantId::new(2), CombatantId::new(3)]);
            assert_eq!(arena.len(), 3);
        }

        #[test]
        fn default_arena_also_starts_at_one() {
            let mut arena = Arena::default();
            let id = arena.spawn(CombatantSpec::human("x", Vec2::ZERO), 100.0, &WeaponTable::default(), 5);
            assert_eq!(id, CombatantId::new(1));
        }

        #[test]
        fn eliminated_stay_in_roster() {
            let (mut arena, ids) = arena_with(&[Vec2::ZERO, Vec2::ONE]);
            arena.get_mut(ids[0]).unwrap().eliminate(false);

            assert_eq!(arena.len(), 2);
            assert_eq!(arena.alive_count(), 1);
            assert!(!arena.is_alive(ids[0]));
            assert!(arena.is_alive(ids[1]));
        }

        #[test]
        fn insert_keeps_id_counter_ahead() {
            let (mut arena, _) = arena_with(&[Vec2::ZERO]);
            let other = Combatant::new(
                CombatantId::new(10),
                CombatantSpec::human("x", Vec2::ZERO),
                100.0,
                &WeaponTable::default(),
                5,
            );
            arena.insert(other);
            let next = arena.spawn(CombatantSpec::human("y", Vec2::ZERO), 100.0, &WeaponTable::default(), 5);
            assert_eq!(next, CombatantId::new(11));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn query_radius_sorted_and_inclusive() {
            let (arena, ids) = arena_with(&[Vec2::new(5.0, 0.0), Vec2::new(0.0, 3.0), Vec2::new(9.0, 9.0)]);
            assert_eq!(arena.query_radius(Vec2::ZERO, 5.0), vec![ids[0], ids[1]]);
        }

        #[test]
        fn query_radius_skips_dead() {
            let (mut arena, ids) = arena_with(&[Vec2::ZERO, Vec2::ONE]);
            arena.get_mut(ids[1]).unwrap().eliminate(false);
            assert_eq!(arena.query_radius(Vec2::ZERO, 10.0), vec![ids[0]]);
        }

        #[test]
        fn set_position_updates_facing() {
            let (mut arena, ids) = arena_with(&[Vec2::new(10.0, 0.0)]);
            assert!(arena.set_position(ids[0], Vec2::new(4.0, 0.0)));
            let c = arena.get(ids[0]).unwrap();
            assert_eq!(c.position(), Vec2::new(4.0, 0.0));
            assert_eq!(c.transform.facing, Facing::Left);
            assert!(!arena.set_position(CombatantId::new(99), Vec2::ZERO));
        }
    }
}
