//! # Shellfall Core
//!
//! Authoritative simulation of a turn-based artillery match on destructible
//! terrain.
//!
//! ## Architecture
//!
//! One [`coordinator::MatchCoordinator`] owns everything a match needs in a
//! [`context::MatchContext`]. There are no globals.
//!
//! - **Scheduler**: whose turn it is, the countdown, the post-fire grace window
//! - **Resolvers**: fire validation, impacts, radial damage, beams and pull fields
//! - **AI**: a cancellable stage machine that thinks, walks, aims and fires
//! - **Terrain**: the [`crater`] occupancy grid, carved by impacts
//! - **Replication**: a sequenced command log that [`replica::Replica`]s apply
//!
//! Physics sits behind the [`physics::PhysicsWorld`] trait. The bundled
//! [`physics::PointPhysics`] is enough for headless matches and tests.
//!
//! ## Usage
//!
//! ```
//! use glam::Vec2;
//! use shellfall_core::config::MatchConfig;
//! use shellfall_core::coordinator::MatchCoordinator;
//! use shellfall_core::entity::CombatantSpec;
//! use shellfall_core::resolver::FireRequest;
//! use shellfall_core::weapon::WeaponKind;
//!
//! let mut game = MatchCoordinator::with_heightmap(MatchConfig::default().with_seed(7), |_| 40.0).unwrap();
//! let player = game.add_combatant(CombatantSpec::human("Player", Vec2::new(40.0, 41.0))).unwrap();
//! game.add_combatant(CombatantSpec::bot("Bot", Vec2::new(120.0, 41.0))).unwrap();
//! game.start().unwrap();
//!
//! game.submit_fire(&FireRequest {
//!     shooter: player,
//!     weapon: WeaponKind::BasicGun,
//!     direction: Vec2::new(1.0, 0.6),
//!     power: 0.8,
//! })
//! .unwrap();
//! game.advance(5.0);
//!
//! for envelope in game.take_commands() {
//!     println!("{}: {:?}", envelope.sequence, envelope.command);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export crater for terrain types
pub use crater;

pub mod ai;
pub mod arena;
pub mod command;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod events;
pub mod inventory;
pub mod items;
pub mod physics;
pub mod replica;
pub mod resolver;
pub mod scheduler;
pub mod weapon;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use arena::Arena;
pub use config::MatchConfig;
pub use coordinator::MatchCoordinator;
pub use entity::{Combatant, CombatantId, CombatantSpec};
pub use error::{AiError, ConfigError, FireRejection, MatchError, ReplicaError};
pub use events::{MatchEvent, MatchObserver};
pub use replica::Replica;
pub use scheduler::{MatchOutcome, MatchPhase, TurnScheduler, TurnState};
pub use weapon::{Ammo, WeaponKind, WeaponProfile, WeaponTable};
