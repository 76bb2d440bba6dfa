//! Error types for the match core.
//!
//! Every fallible operation returns one of these enums. None of them is
//! fatal on its own: the coordinator decides whether a failure is logged,
//! surfaced as an event, or ends the match.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::CombatantId;
use crate::weapon::WeaponKind;

/// Why a fire request was refused.
///
/// A rejection leaves the scheduler and the shooter's inventory untouched.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
pub enum FireRejection {
    /// No turn is running (between turns or after the match ended)
    #[error("no turn is active")]
    NoActiveTurn,

    /// Someone other than the turn owner tried to fire
    #[error("combatant {shooter} fired out of turn (owner is {owner})")]
    NotYourTurn {
        /// Who tried to fire
        shooter: CombatantId,
        /// Who owns the turn
        owner: CombatantId,
    },

    /// The owner already fired this turn
    #[error("combatant {0} already fired this turn")]
    AlreadyFired(CombatantId),

    /// The shooter is not in the roster
    #[error("unknown combatant {0}")]
    UnknownCombatant(CombatantId),

    /// The shooter has been eliminated
    #[error("combatant {0} is eliminated")]
    ShooterEliminated(CombatantId),

    /// Direction is zero or not finite
    #[error("fire direction must be finite and non-zero")]
    InvalidDirection,

    /// Power outside (0, 1]
    #[error("fire power {0} outside (0, 1]")]
    InvalidPower(f32),

    /// Weapon is not in the shooter's inventory
    #[error("{0} is not in the inventory")]
    WeaponNotOwned(WeaponKind),

    /// Weapon is owned but has no ammo left
    #[error("{0} is out of ammo")]
    OutOfAmmo(WeaponKind),
}

/// Match-integrity failures.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A match cannot run without combatants
    #[error("match roster is empty")]
    EmptyRoster,

    /// `start_turn` found nobody alive to hand the turn to
    #[error("no living combatant can take a turn")]
    NoLivingCombatants,

    /// The match has already ended
    #[error("match is over")]
    MatchOver,

    /// The match was started twice, or configured after it started
    #[error("match already started")]
    AlreadyStarted,

    /// Combatants can only join before the match starts
    #[error("roster is locked once the match starts")]
    RosterLocked,

    /// Config failed validation
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Terrain could not be built from the config
    #[error("terrain error: {0}")]
    Terrain(#[from] crater::TerrainError),
}

/// Configuration validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value that must be positive was not
    #[error("{field} must be positive (got {value})")]
    NonPositive {
        /// Dotted path of the offending field
        field: &'static str,
        /// Value found
        value: f32,
    },

    /// A value outside its allowed range
    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the offending field
        field: &'static str,
        /// Value found
        value: f32,
        /// Inclusive lower bound
        min: f32,
        /// Inclusive upper bound
        max: f32,
    },

    /// World bounds are empty or inverted
    #[error("world bounds are degenerate")]
    InvalidBounds,

    /// Terrain resolution has a zero dimension
    #[error("terrain resolution {width}x{height} has a zero dimension")]
    ZeroResolution {
        /// Cells across
        width: u32,
        /// Cells down
        height: u32,
    },

    /// Inventories need at least the default weapon slot
    #[error("inventory must have at least one slot")]
    NoInventorySlots,

    /// The weapon table has no infinite-ammo fallback
    #[error("weapon table has no infinite-ammo default weapon")]
    MissingDefaultWeapon,

    /// The same weapon kind appears twice in the table
    #[error("weapon {0} listed more than once")]
    DuplicateWeapon(WeaponKind),

    /// JSON could not be parsed
    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons the AI pipeline gives up on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AiError {
    /// The bot is no longer in the roster or is dead
    #[error("bot {0} is not alive")]
    BotUnavailable(CombatantId),

    /// Every other combatant is dead
    #[error("no valid target for bot {0}")]
    NoTarget(CombatantId),

    /// The inventory is empty (cannot happen with a valid weapon table)
    #[error("bot {0} has no usable weapon")]
    NoWeapon(CombatantId),
}

/// Failures while a replica applies the command log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplicaError {
    /// A command arrived with an unexpected sequence number
    #[error("expected command {expected}, got {got}")]
    OutOfOrder {
        /// Next sequence the replica can accept
        expected: u64,
        /// Sequence received
        got: u64,
    },

    /// A command names a combatant the replica does not know
    #[error("command references unknown combatant {0}")]
    UnknownCombatant(CombatantId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_messages_name_the_combatant() {
        let err = FireRejection::NotYourTurn {
            shooter: CombatantId::new(2),
            owner: CombatantId::new(1),
        };
        assert_eq!(err.to_string(), "combatant 2 fired out of turn (owner is 1)");
    }

    #[test]
    fn config_error_wraps_into_match_error() {
        let err: MatchError = ConfigError::NoInventorySlots.into();
        assert!(matches!(err, MatchError::Config(ConfigError::NoInventorySlots)));
    }

    #[test]
    fn json_errors_convert() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ConfigError = json_err.into();
        assert!(err.to_string().starts_with("config JSON"));
    }
}
