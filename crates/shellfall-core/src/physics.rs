//! Physics collaborator contract.
//!
//! The match core never integrates bodies itself. It talks to a
//! [`PhysicsWorld`]: register bodies, query overlaps, cast rays, push bodies
//! around, launch projectiles, and step the world to collect
//! [`ImpactEvent`]s.
//!
//! [`PointPhysics`] is a small reference implementation: circular bodies
//! resting on the terrain grid and point projectiles swept in short
//! sub-steps. It is deterministic for a fixed sequence of calls and is what
//! headless matches and tests run on.

use std::collections::BTreeMap;
use std::fmt;

use crater::{Bounds, TerrainField};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::WorldConfig;
use crate::entity::CombatantId;
use crate::weapon::WeaponKind;

/// Fixed timestep for match stepping (1/60 second).
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Distance between collision samples along a projectile's path.
const SWEEP_STEP: f32 = 0.25;

/// A projectile ignores its own shooter for this long after launch.
const ARMING_TIME: f32 = 0.15;

/// Velocity kept after a fused projectile bounces.
const RESTITUTION: f32 = 0.4;

/// Identifier of an in-flight projectile.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectileId(u64);

impl ProjectileId {
    /// Creates a projectile id from a raw value.
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

impl fmt::Debug for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectileId({})", self.0)
    }
}

/// What a projectile or ray touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceTag {
    /// Solid ground
    Terrain,
    /// A combatant's body
    Combatant(CombatantId),
    /// Left the world (sides or below the fall threshold)
    OutOfWorld,
}

/// A projectile reaching the end of its flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    /// Contact or detonation point
    pub point: Vec2,
    /// What was hit
    pub surface: SurfaceTag,
    /// Weapon that fired the projectile
    pub weapon: WeaponKind,
    /// Who fired it
    pub shooter: CombatantId,
}

/// Launch parameters for a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    /// Who fired
    pub shooter: CombatantId,
    /// Which weapon
    pub weapon: WeaponKind,
    /// Launch point
    pub position: Vec2,
    /// Launch velocity
    pub velocity: Vec2,
    /// Gravity multiplier (0 for straight-flying shots)
    pub gravity_scale: f32,
    /// Seconds until detonation; fused projectiles bounce off terrain
    pub fuse: Option<f32>,
    /// Collision radius
    pub radius: f32,
}

/// First thing a ray touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Contact point
    pub point: Vec2,
    /// Distance from the ray origin
    pub distance: f32,
    /// What was hit
    pub surface: SurfaceTag,
}

/// The narrow physics contract the match core depends on.
///
/// Implementations must be deterministic: the same calls in the same order
/// produce the same bodies, projectiles and impacts.
pub trait PhysicsWorld {
    /// Register a circular body for a combatant.
    fn add_body(&mut self, id: CombatantId, position: Vec2, radius: f32);

    /// Remove a body. Returns `false` if it was not registered.
    fn remove_body(&mut self, id: CombatantId) -> bool;

    /// Current body centre.
    fn body_position(&self, id: CombatantId) -> Option<Vec2>;

    /// Current body velocity.
    fn body_velocity(&self, id: CombatantId) -> Option<Vec2>;

    /// Overwrite a body's velocity. Returns `false` if unknown.
    fn set_body_velocity(&mut self, id: CombatantId, velocity: Vec2) -> bool;

    /// Teleport a body. Returns `false` if unknown.
    fn move_body(&mut self, id: CombatantId, position: Vec2) -> bool;

    /// Add an instantaneous velocity change. Returns `false` if unknown.
    fn apply_impulse(&mut self, id: CombatantId, impulse: Vec2) -> bool;

    /// Bodies whose circle overlaps the query circle, sorted by id.
    fn overlap_circle(&self, center: Vec2, radius: f32) -> Vec<CombatantId>;

    /// First terrain cell or body along a ray.
    fn raycast(&self, terrain: &TerrainField, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<RayHit>;

    /// Launch a projectile.
    fn spawn_projectile(&mut self, spec: ProjectileSpec) -> ProjectileId;

    /// Projectiles still in flight.
    fn projectile_count(&self) -> usize;

    /// Advance the world by `dt` and report projectile impacts in a
    /// deterministic order.
    fn step(&mut self, dt: f32, terrain: &TerrainField) -> Vec<ImpactEvent>;
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    grounded: bool,
}

#[derive(Debug, Clone, Copy)]
struct Projectile {
    spec: ProjectileSpec,
    age: f32,
}

/// Reference [`PhysicsWorld`]: circle bodies on a grid terrain.
#[derive(Debug, Clone)]
pub struct PointPhysics {
    gravity: f32,
    bounds: Bounds,
    kill_y: f32,
    friction: f32,
    bodies: BTreeMap<CombatantId, Body>,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    next_projectile: u64,
}

impl PointPhysics {
    /// Create an empty world using the match's world settings.
    #[must_use]
    pub fn new(world: &WorldConfig) -> Self {
        Self {
            gravity: world.gravity,
            bounds: world.bounds,
            kill_y: world.fall_threshold_y,
            friction: world.ground_friction,
            bodies: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            next_projectile: 0,
        }
    }

    /// Whether a body is resting on terrain.
    #[must_use]
    pub fn is_grounded(&self, id: CombatantId) -> bool {
        self.bodies.get(&id).is_some_and(|b| b.grounded)
    }

    fn out_of_world(&self, point: Vec2) -> bool {
        point.x < self.bounds.min.x || point.x > self.bounds.max.x || point.y < self.kill_y
    }

    fn step_bodies(&mut self, dt: f32, terrain: &TerrainField) {
        for body in self.bodies.values_mut() {
            body.velocity.y -= self.gravity * dt;
            body.position += body.velocity * dt;
            settle(body, terrain, self.friction);
        }
    }

    fn step_projectile(&self, projectile: &mut Projectile, dt: f32, terrain: &TerrainField) -> Option<ImpactEvent> {
        projectile.age += dt;
        let armed = projectile.age >= ARMING_TIME;
        let spec = &mut projectile.spec;
        let (weapon, shooter) = (spec.weapon, spec.shooter);
        let impact = move |point: Vec2, surface: SurfaceTag| ImpactEvent {
            point,
            surface,
            weapon,
            shooter,
        };

        if let Some(fuse) = spec.fuse.as_mut() {
            *fuse -= dt;
            if *fuse <= 0.0 {
                return Some(impact(spec.position, SurfaceTag::Terrain));
            }
        }

        spec.velocity.y -= self.gravity * spec.gravity_scale * dt;
        let from = spec.position;
        let travel = spec.velocity * dt;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let samples = ((travel.length() / SWEEP_STEP).ceil() as usize).max(1);
        let mut last_free = from;
        for i in 1..=samples {
            #[allow(clippy::cast_precision_loss)]
            let point = from + travel * (i as f32 / samples as f32);

            if self.out_of_world(point) {
                return Some(impact(point, SurfaceTag::OutOfWorld));
            }

            let radius = spec.radius;
            if let Some((&id, _)) = self.bodies.iter().find(|(&id, body)| {
                (armed || id != shooter) && point.distance(body.position) <= body.radius + radius
            }) {
                return Some(impact(point, SurfaceTag::Combatant(id)));
            }

            if terrain.is_solid_world(point) {
                if spec.fuse.is_some() {
                    spec.position = last_free;
                    spec.velocity = Vec2::new(spec.velocity.x, -spec.velocity.y) * RESTITUTION;
                    return None;
                }
                return Some(impact(point, SurfaceTag::Terrain));
            }
            last_free = point;
        }
        spec.position = from + travel;
        None
    }
}

/// Rest a body on the ground beneath it, if it has sunk into terrain.
fn settle(body: &mut Body, terrain: &TerrainField, friction: f32) {
    let feet = body.position - Vec2::new(0.0, body.radius);
    let solid_under = terrain
        .mapping()
        .cell_at(feet)
        .filter(|&c| terrain.is_active() && terrain.grid().is_solid(c));
    let Some(mut cell) = solid_under else {
        body.grounded = false;
        return;
    };

    // Climb to the top of the solid run under the feet.
    while cell.y + 1 < terrain.grid().height() && terrain.grid().is_solid(crater::CellCoord::new(cell.x, cell.y + 1)) {
        cell.y += 1;
    }
    let top = terrain.mapping().cell_center(cell).y + terrain.mapping().cell_size().y * 0.5;
    body.position.y = top + body.radius;
    body.velocity.y = body.velocity.y.max(0.0);
    body.velocity.x *= friction;
    if body.velocity.x.abs() < 0.05 {
        body.velocity.x = 0.0;
    }
    body.grounded = true;
}

impl PhysicsWorld for PointPhysics {
    fn add_body(&mut self, id: CombatantId, position: Vec2, radius: f32) {
        self.bodies.insert(
            id,
            Body {
                position,
                velocity: Vec2::ZERO,
                radius,
                grounded: false,
            },
        );
    }

    fn remove_body(&mut self, id: CombatantId) -> bool {
        self.bodies.remove(&id).is_some()
    }

    fn body_position(&self, id: CombatantId) -> Option<Vec2> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn body_velocity(&self, id: CombatantId) -> Option<Vec2> {
        self.bodies.get(&id).map(|b| b.velocity)
    }

    fn set_body_velocity(&mut self, id: CombatantId, velocity: Vec2) -> bool {
        self.bodies.get_mut(&id).map(|b| b.velocity = velocity).is_some()
    }

    fn move_body(&mut self, id: CombatantId, position: Vec2) -> bool {
        self.bodies.get_mut(&id).map(|b| b.position = position).is_some()
    }

    fn apply_impulse(&mut self, id: CombatantId, impulse: Vec2) -> bool {
        self.bodies
            .get_mut(&id)
            .map(|b| {
                b.velocity += impulse;
                b.grounded = false;
            })
            .is_some()
    }

    fn overlap_circle(&self, center: Vec2, radius: f32) -> Vec<CombatantId> {
        self.bodies
            .iter()
            .filter(|(_, b)| center.distance(b.position) <= radius + b.radius)
            .map(|(&id, _)| id)
            .collect()
    }

    fn raycast(&self, terrain: &TerrainField, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<RayHit> {
        let dir = direction.try_normalize()?;
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return None;
        }
        let step = (terrain.mapping().cell_size().min_element() * 0.5).max(0.01);
        let mut distance = 0.0;
        while distance <= max_distance {
            let point = origin + dir * distance;
            if let Some((&id, _)) = self
                .bodies
                .iter()
                .find(|(_, b)| point.distance(b.position) <= b.radius)
            {
                return Some(RayHit {
                    point,
                    distance,
                    surface: SurfaceTag::Combatant(id),
                });
            }
            if terrain.is_solid_world(point) {
                return Some(RayHit {
                    point,
                    distance,
                    surface: SurfaceTag::Terrain,
                });
            }
            distance += step;
        }
        None
    }

    fn spawn_projectile(&mut self, spec: ProjectileSpec) -> ProjectileId {
        let id = ProjectileId::new(self.next_projectile);
        self.next_projectile += 1;
        self.projectiles.insert(id, Projectile { spec, age: 0.0 });
        id
    }

    fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    fn step(&mut self, dt: f32, terrain: &TerrainField) -> Vec<ImpactEvent> {
        self.step_bodies(dt, terrain);

        let mut impacts = Vec::new();
        let mut finished = Vec::new();
        let mut projectiles = std::mem::take(&mut self.projectiles);
        for (&id, projectile) in &mut projectiles {
            if let Some(impact) = self.step_projectile(projectile, dt, terrain) {
                impacts.push(impact);
                finished.push(id);
            }
        }
        for id in finished {
            projectiles.remove(&id);
        }
        self.projectiles = projectiles;
        impacts
    }
}
