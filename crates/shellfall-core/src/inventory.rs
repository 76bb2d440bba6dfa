//! Per-combatant weapon inventory.
//!
//! Slot 0 always holds the table's infinite-ammo default weapon, so the
//! inventory is never empty and the selection always points somewhere.
//!
//! Spent weapons leave in two ways:
//! - ordinary weapons are dropped the moment their last shot is consumed
//! - instant-use weapons (beams, pull fields) stay until [`Inventory::prune_spent`]
//!   runs at turn end, because their effect is still live after the shot

use serde::{Deserialize, Serialize};

use crate::error::FireRejection;
use crate::weapon::{Ammo, WeaponKind, WeaponProfile, WeaponTable};

/// What a pickup did to the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupResult {
    /// New slot appended
    Added,
    /// Existing slot restocked
    Restocked,
    /// No free slot; nothing changed
    Full,
}

/// Ordered weapon slots plus a selection pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<WeaponProfile>,
    selected: usize,
    max_slots: usize,
}

impl Inventory {
    /// Starting loadout: the table's default weapon only.
    #[must_use]
    pub fn starting(table: &WeaponTable, max_slots: usize) -> Self {
        Self {
            slots: table.default_weapon().cloned().into_iter().collect(),
            selected: 0,
            max_slots: max_slots.max(1),
        }
    }

    /// Slot capacity.
    #[must_use]
    pub const fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Owned weapons in slot order.
    #[must_use]
    pub fn slots(&self) -> &[WeaponProfile] {
        &self.slots
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The selected weapon.
    #[must_use]
    pub fn selected(&self) -> Option<&WeaponProfile> {
        self.slots.get(self.selected)
    }

    /// Select a weapon by kind. Returns `false` if it is not owned.
    pub fn select(&mut self, kind: WeaponKind) -> bool {
        match self.slots.iter().position(|w| w.kind == kind) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    /// Find an owned weapon.
    #[must_use]
    pub fn find(&self, kind: WeaponKind) -> Option<&WeaponProfile> {
        self.slots.iter().find(|w| w.kind == kind)
    }

    /// Ammo left for a weapon, if owned.
    #[must_use]
    pub fn ammo(&self, kind: WeaponKind) -> Option<Ammo> {
        self.find(kind).map(|w| w.ammo)
    }

    /// Returns `true` if the weapon is owned and can fire.
    #[must_use]
    pub fn can_fire(&self, kind: WeaponKind) -> bool {
        self.ammo(kind).is_some_and(Ammo::has_ammo)
    }

    /// Add a weapon, or restock it if already owned.
    ///
    /// `ammo` is added to an existing slot; a new slot starts with it.
    pub fn pickup(&mut self, profile: &WeaponProfile, ammo: Ammo) -> PickupResult {
        if let Some(slot) = self.slots.iter_mut().find(|w| w.kind == profile.kind) {
            slot.ammo.add(ammo);
            return PickupResult::Restocked;
        }
        if self.slots.len() >= self.max_slots {
            return PickupResult::Full;
        }
        let mut weapon = profile.clone();
        weapon.ammo = ammo;
        self.slots.push(weapon);
        PickupResult::Added
    }

    /// Use one shot of a weapon.
    ///
    /// Ordinary weapons are dropped when their last shot is used.
    ///
    /// # Errors
    ///
    /// Returns [`FireRejection::WeaponNotOwned`] or [`FireRejection::OutOfAmmo`].
    pub fn consume(&mut self, kind: WeaponKind) -> Result<(), FireRejection> {
        let index = self
            .slots
            .iter()
            .position(|w| w.kind == kind)
            .ok_or(FireRejection::WeaponNotOwned(kind))?;
        let slot = &mut self.slots[index];
        if !slot.ammo.consume() {
            return Err(FireRejection::OutOfAmmo(kind));
        }
        if !slot.ammo.has_ammo() && !slot.instant_use {
            self.remove(index);
        }
        Ok(())
    }

    /// Drop spent instant-use weapons. Called at turn end.
    ///
    /// Returns the number of slots removed.
    pub fn prune_spent(&mut self) -> usize {
        let mut removed = 0;
        while let Some(index) = self.slots.iter().position(|w| !w.ammo.has_ammo()) {
            self.remove(index);
            removed += 1;
        }
        removed
    }

    fn remove(&mut self, index: usize) {
        self.slots.remove(index);
        if self.selected > index || self.selected >= self.slots.len() {
            self.selected = self.selected.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> WeaponTable {
        WeaponTable::default()
    }

    fn profile(kind: WeaponKind) -> WeaponProfile {
        table().get(kind).unwrap().clone()
    }

    #[test]
    fn starts_with_default_weapon_selected() {
        let inv = Inventory::starting(&table(), 5);
        assert_eq!(inv.len(), 1);
        assert_eq!(inv.selected().unwrap().kind, WeaponKind::BasicGun);
        assert!(inv.can_fire(WeaponKind::BasicGun));
    }

    #[test]
    fn pickup_appends_then_restocks() {
        let mut inv = Inventory::starting(&table(), 5);
        assert_eq!(inv.pickup(&profile(WeaponKind::Rpg), Ammo::Count(2)), PickupResult::Added);
        assert_eq!(inv.pickup(&profile(WeaponKind::Rpg), Ammo::Count(1)), PickupResult::Restocked);
        assert_eq!(inv.ammo(WeaponKind::Rpg), Some(Ammo::Count(3)));
    }

    #[test]
    fn pickup_respects_capacity() {
        let mut inv = Inventory::starting(&table(), 2);
        assert_eq!(inv.pickup(&profile(WeaponKind::Rpg), Ammo::Count(1)), PickupResult::Added);
        assert_eq!(inv.pickup(&profile(WeaponKind::Laser), Ammo::Count(1)), PickupResult::Full);
        assert!(inv.find(WeaponKind::Laser).is_none());
    }

    #[test]
    fn ordinary_weapon_dropped_at_zero() {
        let mut inv = Inventory::starting(&table(), 5);
        inv.pickup(&profile(WeaponKind::Rpg), Ammo::Count(1));
        assert!(inv.select(WeaponKind::Rpg));

        inv.consume(WeaponKind::Rpg).unwrap();
        assert!(inv.find(WeaponKind::Rpg).is_none());
        assert_eq!(inv.selected().unwrap().kind, WeaponKind::BasicGun);
        assert_eq!(inv.consume(WeaponKind::Rpg), Err(FireRejection::WeaponNotOwned(WeaponKind::Rpg)));
    }

    #[test]
    fn instant_weapon_kept_until_pruned() {
        let mut inv = Inventory::starting(&table(), 5);
        inv.pickup(&profile(WeaponKind::Laser), Ammo::Count(1));
        inv.consume(WeaponKind::Laser).unwrap();

        assert_eq!(inv.ammo(WeaponKind::Laser), Some(Ammo::Count(0)));
        assert_eq!(inv.consume(WeaponKind::Laser), Err(FireRejection::OutOfAmmo(WeaponKind::Laser)));

        assert_eq!(inv.prune_spent(), 1);
        assert!(inv.find(WeaponKind::Laser).is_none());
    }

    #[test]
    fn selection_survives_removal_of_earlier_slot() {
        let mut inv = Inventory::starting(&table(), 5);
        inv.pickup(&profile(WeaponKind::Rpg), Ammo::Count(1));
        inv.pickup(&profile(WeaponKind::Grenade), Ammo::Count(1));
        inv.select(WeaponKind::Grenade);

        inv.consume(WeaponKind::Rpg).unwrap();
        assert_eq!(inv.selected().unwrap().kind, WeaponKind::Grenade);
    }

    #[test]
    fn default_weapon_never_dropped() {
        let mut inv = Inventory::starting(&table(), 5);
        for _ in 0..10 {
            inv.consume(WeaponKind::BasicGun).unwrap();
        }
        assert_eq!(inv.prune_spent(), 0);
        assert_eq!(inv.len(), 1);
    }
}
