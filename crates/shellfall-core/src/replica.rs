//! Passive participants.
//!
//! A [`Replica`] never simulates. It starts from the same config, terrain and
//! roster as the authority and applies the authority's command log in
//! sequence order. Health arrives as `DamageResult`, so replicas need neither
//! physics nor damage falloff to agree with the authority.

use crater::TerrainField;
use glam::Vec2;
use tracing::{debug, trace};

use crate::arena::Arena;
use crate::command::{CommandEnvelope, NetCommand};
use crate::config::MatchConfig;
use crate::coordinator;
use crate::entity::{CombatantId, CombatantSpec};
use crate::error::ReplicaError;
use crate::items::{ItemEffect, WorldItem, WorldItems};
use crate::weapon::WeaponTable;

/// Mirror of an authority's match state.
#[derive(Debug, Clone)]
pub struct Replica {
    terrain: TerrainField,
    arena: Arena,
    items: WorldItems,
    weapons: WeaponTable,
    max_health: f32,
    slots: usize,
    next_sequence: u64,
}

impl Replica {
    /// Replica over its own copy of the starting terrain.
    #[must_use]
    pub fn new(config: &MatchConfig, terrain: TerrainField) -> Self {
        Self {
            terrain,
            arena: Arena::new(),
            items: WorldItems::new(),
            weapons: config.weapons.clone(),
            max_health: config.combat.max_health,
            slots: config.combat.inventory_slots,
            next_sequence: 0,
        }
    }

    /// Add a combatant. Must be called in the same order as on the authority
    /// so ids line up.
    pub fn add_combatant(&mut self, spec: CombatantSpec) -> CombatantId {
        self.arena.spawn(spec, self.max_health, &self.weapons, self.slots)
    }

    /// Place an item, mirroring the authority's spawner.
    pub fn spawn_item(&mut self, item: WorldItem) -> u64 {
        self.items.spawn(item)
    }

    /// Apply one command.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::OutOfOrder`] unless `envelope.sequence` is the
    /// next expected sequence, and [`ReplicaError::UnknownCombatant`] for a
    /// command naming a combatant this replica never saw. A failed command
    /// is not consumed.
    pub fn apply(&mut self, envelope: &CommandEnvelope) -> Result<(), ReplicaError> {
        if envelope.sequence != self.next_sequence {
            return Err(ReplicaError::OutOfOrder {
                expected: self.next_sequence,
                got: envelope.sequence,
            });
        }
        trace!(sequence = envelope.sequence, turn = envelope.turn, "applying command");

        match &envelope.command {
            NetCommand::Fire { shooter, weapon, .. } => {
                let combatant = self
                    .arena
                    .get_mut(*shooter)
                    .ok_or(ReplicaError::UnknownCombatant(*shooter))?;
                // The authority already validated the shot.
                if combatant.inventory.consume(*weapon).is_err() {
                    debug!(shooter = %shooter, weapon = %weapon, "replica ammo already empty");
                }
            }
            NetCommand::CarveTerrain { x, y, radius } => {
                self.terrain.carve(Vec2::new(*x, *y), *radius);
            }
            NetCommand::CarveRing { x, y, inner, outer } => {
                self.terrain.carve_ring(Vec2::new(*x, *y), *inner, *outer);
            }
            NetCommand::ItemPickup {
                combatant,
                item_name,
                position,
            } => {
                let collector = self
                    .arena
                    .get_mut(*combatant)
                    .ok_or(ReplicaError::UnknownCombatant(*combatant))?;
                match self.items.take_matching(item_name, *position) {
                    Some(WorldItem {
                        effect: ItemEffect::GrantWeapon { kind, ammo },
                        ..
                    }) => {
                        if let Some(profile) = self.weapons.get(kind) {
                            collector.inventory.pickup(profile, ammo);
                        }
                    }
                    // Health follows as a DamageResult.
                    Some(_) => {}
                    None => debug!(item = %item_name, "replica has no matching item"),
                }
            }
            NetCommand::SyncColor {
                combatant,
                color_index,
            } => {
                self.arena
                    .get_mut(*combatant)
                    .ok_or(ReplicaError::UnknownCombatant(*combatant))?
                    .set_color_index(*color_index);
            }
            NetCommand::DamageResult { combatant, health } => {
                let target = self
                    .arena
                    .get_mut(*combatant)
                    .ok_or(ReplicaError::UnknownCombatant(*combatant))?;
                target.health_mut().set(*health);
                if target.health().is_depleted() {
                    target.eliminate(false);
                }
            }
        }
        self.next_sequence += 1;
        Ok(())
    }

    /// Apply a batch, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// See [`Replica::apply`].
    pub fn apply_all<'a>(&mut self, envelopes: impl IntoIterator<Item = &'a CommandEnvelope>) -> Result<usize, ReplicaError> {
        let mut applied = 0;
        for envelope in envelopes {
            self.apply(envelope)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Rebuild the terrain boundary now.
    pub fn flush(&mut self) {
        self.terrain.flush();
    }

    /// Same hash as [`coordinator::MatchCoordinator::state_hash`] for the same state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        coordinator::state_hash(&self.terrain, &self.arena)
    }

    /// Mirrored terrain.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainField {
        &self.terrain
    }

    /// Mirrored roster.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mirrored items.
    #[must_use]
    pub const fn items(&self) -> &WorldItems {
        &self.items
    }

    /// Sequence number the replica expects next.
    #[must_use]
    pub const fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}
