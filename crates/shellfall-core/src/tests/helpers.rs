//! Test setup utilities.

use std::collections::VecDeque;

use crater::TerrainField;
use glam::Vec2;

use crate::config::MatchConfig;
use crate::coordinator::MatchCoordinator;
use crate::entity::{CombatantId, CombatantSpec};
use crate::items::WorldItem;
use crate::physics::{ImpactEvent, PhysicsWorld, PointPhysics, ProjectileId, ProjectileSpec, RayHit, SurfaceTag, FIXED_DT};
use crate::resolver::FireRequest;
use crate::weapon::{Ammo, WeaponKind};

/// Ground height used by every flat test map.
pub const GROUND: f32 = 40.0;

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// =============================================================================
// Scripted physics
// =============================================================================

/// [`PointPhysics`] whose projectiles land where the test says.
///
/// Each spawned projectile consumes the next planned point and turns into a
/// terrain impact there on the following step. Once the plan runs out,
/// projectiles fly normally.
#[derive(Debug)]
pub struct ScriptedImpactPhysics {
    inner: PointPhysics,
    planned: VecDeque<Vec2>,
    pending: Vec<ImpactEvent>,
    next_id: u64,
}

impl ScriptedImpactPhysics {
    pub fn new(config: &MatchConfig, planned: impl IntoIterator<Item = Vec2>) -> Self {
        Self {
            inner: PointPhysics::new(&config.world),
            planned: planned.into_iter().collect(),
            pending: Vec::new(),
            next_id: 1_000_000,
        }
    }
}

impl PhysicsWorld for ScriptedImpactPhysics {
    fn add_body(&mut self, id: CombatantId, position: Vec2, radius: f32) {
        self.inner.add_body(id, position, radius);
    }

    fn remove_body(&mut self, id: CombatantId) -> bool {
        self.inner.remove_body(id)
    }

    fn body_position(&self, id: CombatantId) -> Option<Vec2> {
        self.inner.body_position(id)
    }

    fn body_velocity(&self, id: CombatantId) -> Option<Vec2> {
        self.inner.body_velocity(id)
    }

    fn set_body_velocity(&mut self, id: CombatantId, velocity: Vec2) -> bool {
        self.inner.set_body_velocity(id, velocity)
    }

    fn move_body(&mut self, id: CombatantId, position: Vec2) -> bool {
        self.inner.move_body(id, position)
    }

    fn apply_impulse(&mut self, id: CombatantId, impulse: Vec2) -> bool {
        self.inner.apply_impulse(id, impulse)
    }

    fn overlap_circle(&self, center: Vec2, radius: f32) -> Vec<CombatantId> {
        self.inner.overlap_circle(center, radius)
    }

    fn raycast(&self, terrain: &TerrainField, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<RayHit> {
        self.inner.raycast(terrain, origin, direction, max_distance)
    }

    fn spawn_projectile(&mut self, spec: ProjectileSpec) -> ProjectileId {
        let Some(point) = self.planned.pop_front() else {
            return self.inner.spawn_projectile(spec);
        };
        self.pending.push(ImpactEvent {
            point,
            surface: SurfaceTag::Terrain,
            weapon: spec.weapon,
            shooter: spec.shooter,
        });
        self.next_id += 1;
        ProjectileId::new(self.next_id)
    }

    fn projectile_count(&self) -> usize {
        self.inner.projectile_count() + self.pending.len()
    }

    fn step(&mut self, dt: f32, terrain: &TerrainField) -> Vec<ImpactEvent> {
        let mut impacts = std::mem::take(&mut self.pending);
        impacts.extend(self.inner.step(dt, terrain));
        impacts
    }
}

// =============================================================================
// Match setup
// =============================================================================

/// Flat map at [`GROUND`] with the given physics.
pub fn flat_match(config: MatchConfig, physics: Option<Box<dyn PhysicsWorld>>) -> MatchCoordinator {
    let game = MatchCoordinator::with_heightmap(config, |_| GROUND).unwrap();
    match physics {
        Some(physics) => game.with_physics(physics),
        None => game,
    }
}

/// Add humans standing on the ground at each x.
pub fn add_humans(game: &mut MatchCoordinator, xs: &[f32]) -> Vec<CombatantId> {
    xs.iter()
        .enumerate()
        .map(|(i, &x)| {
            game.add_combatant(CombatantSpec::human(format!("H{i}"), Vec2::new(x, GROUND + 1.0)))
                .unwrap()
        })
        .collect()
}

/// Drop a one-shot crate at a combatant's feet and step once so it is collected.
pub fn arm(game: &mut MatchCoordinator, id: CombatantId, kind: WeaponKind) {
    let position = game.arena().get(id).unwrap().position();
    game.spawn_item(WorldItem::weapon_crate(kind, Ammo::Count(1), position));
    game.step(FIXED_DT);
    assert!(game.arena().get(id).unwrap().inventory.can_fire(kind), "{kind} not collected");
}

/// Fire request with full power.
pub fn shot(shooter: CombatantId, weapon: WeaponKind, direction: Vec2) -> FireRequest {
    FireRequest {
        shooter,
        weapon,
        direction,
        power: 1.0,
    }
}

/// Current health of a combatant.
pub fn health(game: &MatchCoordinator, id: CombatantId) -> f32 {
    game.arena().get(id).unwrap().health().current()
}
