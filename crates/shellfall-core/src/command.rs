//! Logical commands broadcast by the authority.
//!
//! Replicas never receive state snapshots. They apply the same commands the
//! authority applied (carves, pickups, damage results) in sequence order and
//! end up with the same state. The wire encoding is left to the transport;
//! every type here is serde-serializable.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::CombatantId;
use crate::weapon::WeaponKind;

/// One logical command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetCommand {
    /// A shot was fired; every participant spawns the projectile visual
    Fire {
        /// Who fired
        shooter: CombatantId,
        /// Which weapon
        weapon: WeaponKind,
        /// Unit aim direction
        direction: Vec2,
        /// Power in (0, 1]
        power: f32,
        /// Muzzle position
        origin: Vec2,
    },
    /// Clear a disc of terrain
    CarveTerrain {
        /// Centre x
        x: f32,
        /// Centre y
        y: f32,
        /// Radius
        radius: f32,
    },
    /// Clear an annulus of terrain
    CarveRing {
        /// Centre x
        x: f32,
        /// Centre y
        y: f32,
        /// Exclusive inner radius
        inner: f32,
        /// Inclusive outer radius
        outer: f32,
    },
    /// A combatant collected a world item
    ItemPickup {
        /// Collector
        combatant: CombatantId,
        /// Item name
        item_name: String,
        /// Where the item was
        position: Vec2,
    },
    /// Cosmetic colour change
    SyncColor {
        /// Who
        combatant: CombatantId,
        /// New colour slot
        color_index: u8,
    },
    /// Authoritative health after damage or healing
    DamageResult {
        /// Who
        combatant: CombatantId,
        /// Health after the change
        health: f32,
    },
}

/// A command with its ordering metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Strictly increasing, starting at 0
    pub sequence: u64,
    /// Turn during which the command was issued
    pub turn: u64,
    /// The command
    pub command: NetCommand,
}

/// The authority's outbox.
///
/// Every command is kept for the lifetime of the match so a late-joining
/// replica can replay from the start; [`CommandLog::take_pending`] returns
/// only what has not been handed to the transport yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandLog {
    entries: Vec<CommandEnvelope>,
    next_sequence: u64,
    turn: u64,
    sent: usize,
}

impl CommandLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag subsequent commands with this turn number.
    pub fn set_turn(&mut self, turn: u64) {
        self.turn = turn;
    }

    /// Append a command and return its sequence number.
    pub fn push(&mut self, command: NetCommand) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(CommandEnvelope {
            sequence,
            turn: self.turn,
            command,
        });
        sequence
    }

    /// Every command so far.
    #[must_use]
    pub fn entries(&self) -> &[CommandEnvelope] {
        &self.entries
    }

    /// Number of commands logged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commands logged since the previous call.
    pub fn take_pending(&mut self) -> Vec<CommandEnvelope> {
        let pending = self.entries[self.sent..].to_vec();
        self.sent = self.entries.len();
        pending
    }
}
