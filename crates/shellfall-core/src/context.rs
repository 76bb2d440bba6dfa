//! Everything one match owns.
//!
//! There are no globals. The coordinator owns a single [`MatchContext`] and
//! lends it to resolvers, the AI and the scheduler for the duration of a
//! call. Dropping the context drops the match, including every observer.

use std::fmt;

use crater::TerrainField;
use glam::Vec2;

use crate::arena::Arena;
use crate::command::{CommandLog, NetCommand};
use crate::config::MatchConfig;
use crate::events::EventBus;
use crate::items::WorldItems;
use crate::physics::{PhysicsWorld, PointPhysics};
use crate::resolver::ActiveEffect;

/// Match-scoped state shared by every subsystem.
pub struct MatchContext {
    /// Validated configuration
    pub config: MatchConfig,
    /// Roster
    pub arena: Arena,
    /// Destructible ground
    pub terrain: TerrainField,
    /// Physics collaborator
    pub physics: Box<dyn PhysicsWorld>,
    /// Local observers and history
    pub events: EventBus,
    /// Outbox for replicas
    pub commands: CommandLog,
    /// Pickups lying in the world
    pub items: WorldItems,
    /// Beams and pull fields still running
    pub effects: Vec<ActiveEffect>,
}

impl fmt::Debug for MatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchContext")
            .field("arena", &self.arena)
            .field("terrain", &self.terrain.body_state())
            .field("physics", &format!("[{} projectiles]", self.physics.projectile_count()))
            .field("events", &self.events)
            .field("commands", &self.commands.len())
            .field("items", &self.items.len())
            .field("effects", &self.effects.len())
            .finish_non_exhaustive()
    }
}

impl MatchContext {
    /// Context with an empty roster and the reference physics.
    #[must_use]
    pub fn new(config: MatchConfig, terrain: TerrainField) -> Self {
        let physics = Box::new(PointPhysics::new(&config.world));
        Self {
            config,
            arena: Arena::new(),
            terrain,
            physics,
            events: EventBus::new(),
            commands: CommandLog::new(),
            items: WorldItems::new(),
            effects: Vec::new(),
        }
    }

    /// Carve a disc and log it for replicas. Returns the changed cell count.
    ///
    /// Carves that change nothing are not logged; replicas would not change
    /// anything either.
    pub fn carve(&mut self, center: Vec2, radius: f32) -> usize {
        let changed = self.terrain.carve(center, radius).changed;
        if changed > 0 {
            self.commands.push(NetCommand::CarveTerrain {
                x: center.x,
                y: center.y,
                radius,
            });
        }
        changed
    }

    /// Carve an annulus and log it for replicas. Returns the changed cell count.
    pub fn carve_ring(&mut self, center: Vec2, inner: f32, outer: f32) -> usize {
        let changed = self.terrain.carve_ring(center, inner, outer).changed;
        if changed > 0 {
            self.commands.push(NetCommand::CarveRing {
                x: center.x,
                y: center.y,
                inner,
                outer,
            });
        }
        changed
    }
}
