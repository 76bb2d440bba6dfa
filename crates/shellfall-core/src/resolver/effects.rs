//! Weapon effects that keep running after the shot.
//!
//! Beams extend from the muzzle over several steps, carving as they go.
//! Pull fields drag bodies toward their centre while an expanding ring of
//! terrain is eaten away. Both live in the context's effect list until they
//! expire.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::context::MatchContext;
use crate::entity::CombatantId;
use crate::weapon::{WeaponEffect, WeaponProfile};

use super::{DamageResolver, FalloffCurve};

/// Spacing between carve stamps along a beam, as a fraction of its width.
const BEAM_STAMP_SPACING: f32 = 0.5;

/// A laser beam growing from the muzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamEffect {
    shooter: CombatantId,
    origin: Vec2,
    direction: Vec2,
    length: f32,
    width: f32,
    extend_speed: f32,
    duration: f32,
    damage: f32,
    elapsed: f32,
    reach: f32,
    hit: BTreeSet<CombatantId>,
}

impl BeamEffect {
    /// Beam for a profile with a `Beam` effect; `None` for any other effect.
    #[must_use]
    pub fn new(shooter: CombatantId, origin: Vec2, direction: Vec2, profile: &WeaponProfile) -> Option<Self> {
        let WeaponEffect::Beam {
            length,
            width,
            extend_speed,
            duration,
        } = profile.effect
        else {
            return None;
        };
        Some(Self {
            shooter,
            origin,
            direction: direction.try_normalize()?,
            length,
            width,
            extend_speed,
            duration,
            damage: profile.damage,
            elapsed: 0.0,
            reach: 0.0,
            hit: BTreeSet::new(),
        })
    }

    /// Current tip distance from the origin.
    #[must_use]
    pub const fn reach(&self) -> f32 {
        self.reach
    }

    /// Combatants already damaged by this beam.
    #[must_use]
    pub fn hit(&self) -> &BTreeSet<CombatantId> {
        &self.hit
    }

    /// Advance the beam. Returns `true` once it has expired.
    pub fn step(&mut self, ctx: &mut MatchContext, dt: f32) -> bool {
        self.elapsed += dt;
        let reach = (self.extend_speed * self.elapsed).min(self.length);
        if reach > self.reach {
            self.carve_segment(ctx, self.reach, reach);
            self.reach = reach;
        }
        self.damage_inside(ctx);
        trace!(shooter = %self.shooter, reach = self.reach, "beam step");
        self.elapsed >= self.duration
    }

    fn carve_segment(&self, ctx: &mut MatchContext, from: f32, to: f32) {
        let radius = self.width * 0.5;
        let spacing = (self.width * BEAM_STAMP_SPACING).max(0.05);
        let mut distance = from;
        loop {
            ctx.carve(self.origin + self.direction * distance, radius);
            if distance >= to {
                break;
            }
            distance = (distance + spacing).min(to);
        }
    }

    fn damage_inside(&mut self, ctx: &mut MatchContext) {
        let tip = self.origin + self.direction * self.reach;
        let reach = ctx.config.world.body_radius + self.width * 0.5;
        let inside: Vec<CombatantId> = ctx
            .arena
            .alive()
            .filter(|c| c.id() != self.shooter && !self.hit.contains(&c.id()))
            .filter(|c| distance_to_segment(c.position(), self.origin, tip) <= reach)
            .map(crate::entity::Combatant::id)
            .collect();
        for id in inside {
            self.hit.insert(id);
            debug!(shooter = %self.shooter, target = %id, "beam hit");
            DamageResolver::apply_direct(ctx, id, self.damage);
        }
    }
}

/// A field pulling bodies toward its centre while carving outward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullField {
    center: Vec2,
    range: f32,
    max_force: f32,
    max_velocity: f32,
    duration: f32,
    carve_rate: f32,
    max_carve_radius: f32,
    curve: FalloffCurve,
    elapsed: f32,
    carved_radius: f32,
}

impl PullField {
    /// Field for a profile with an `AreaPull` effect; `None` for any other effect.
    #[must_use]
    pub fn new(center: Vec2, profile: &WeaponProfile) -> Option<Self> {
        let WeaponEffect::AreaPull {
            range,
            max_force,
            max_velocity,
            duration,
            carve_rate,
            max_carve_radius,
            curve,
        } = profile.effect
        else {
            return None;
        };
        Some(Self {
            center,
            range,
            max_force,
            max_velocity,
            duration,
            carve_rate,
            max_carve_radius,
            curve,
            elapsed: 0.0,
            carved_radius: 0.0,
        })
    }

    /// Field centre.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Radius carved so far.
    #[must_use]
    pub const fn carved_radius(&self) -> f32 {
        self.carved_radius
    }

    /// Advance the field. Returns `true` once it has expired.
    pub fn step(&mut self, ctx: &mut MatchContext, dt: f32) -> bool {
        self.elapsed += dt;
        self.pull_bodies(ctx, dt);

        let target = (self.carve_rate * self.elapsed).min(self.max_carve_radius);
        if target > self.carved_radius {
            if self.carved_radius <= 0.0 {
                ctx.carve(self.center, target);
            } else {
                ctx.carve_ring(self.center, self.carved_radius, target);
            }
            self.carved_radius = target;
        }

        if self.elapsed < self.duration {
            return false;
        }
        let report = ctx.terrain.flush();
        debug!(center = ?self.center, cells = report.cells, outcome = ?report.outcome, "pull field expired");
        true
    }

    fn pull_bodies(&self, ctx: &mut MatchContext, dt: f32) {
        let ids: Vec<CombatantId> = ctx.arena.alive().map(crate::entity::Combatant::id).collect();
        for id in ids {
            let Some(position) = ctx.physics.body_position(id) else {
                continue;
            };
            let offset = self.center - position;
            let distance = offset.length();
            if distance >= self.range || distance <= f32::EPSILON {
                continue;
            }
            let force = self.max_force * self.curve.shape(1.0 - distance / self.range);
            let velocity = ctx.physics.body_velocity(id).unwrap_or(Vec2::ZERO) + offset / distance * force * dt;
            ctx.physics
                .set_body_velocity(id, velocity.clamp_length_max(self.max_velocity));
        }
    }
}

/// An effect in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActiveEffect {
    /// Laser beam
    Beam(BeamEffect),
    /// Blackhole pull field
    Pull(PullField),
}

impl ActiveEffect {
    /// Advance the effect. Returns `true` once it has expired.
    pub fn step(&mut self, ctx: &mut MatchContext, dt: f32) -> bool {
        match self {
            Self::Beam(beam) => beam.step(ctx, dt),
            Self::Pull(field) => field.step(ctx, dt),
        }
    }
}

/// Steps every running effect and drops the expired ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectsResolver;

impl EffectsResolver {
    /// Advance all effects by `dt`. Returns how many expired.
    pub fn step(ctx: &mut MatchContext, dt: f32) -> usize {
        let mut running = std::mem::take(&mut ctx.effects);
        let before = running.len();
        running.retain_mut(|effect| !effect.step(ctx, dt));
        let expired = before - running.len();
        // Effects spawned while stepping go after the survivors.
        running.append(&mut ctx.effects);
        ctx.effects = running;
        expired
    }
}

fn distance_to_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::entity::CombatantSpec;
    use crate::physics::FIXED_DT;
    use crate::weapon::{WeaponKind, WeaponTable};
    use crater::TerrainField;

    fn context() -> MatchContext {
        let config = MatchConfig::default();
        let terrain = TerrainField::from_heightmap(config.terrain_config(), |_| 50.0).unwrap();
        MatchContext::new(config, terrain)
    }

    fn spawn(ctx: &mut MatchContext, position: Vec2) -> CombatantId {
        let id = ctx
            .arena
            .spawn(CombatantSpec::human("P", position), 100.0, &WeaponTable::default(), 5);
        ctx.physics.add_body(id, position, 1.0);
        id
    }

    fn profile(kind: WeaponKind) -> WeaponProfile {
        WeaponTable::default().get(kind).unwrap().clone()
    }

    fn run(effect: &mut ActiveEffect, ctx: &mut MatchContext, seconds: f32) -> bool {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (seconds / FIXED_DT).ceil() as usize;
        (0..steps).any(|_| effect.step(ctx, FIXED_DT))
    }

    mod beam_tests {
        use super::*;

        #[test]
        fn distance_to_segment_clamps_to_ends() {
            let (a, b) = (Vec2::ZERO, Vec2::new(10.0, 0.0));
            assert_eq!(distance_to_segment(Vec2::new(5.0, 3.0), a, b), 3.0);
            assert_eq!(distance_to_segment(Vec2::new(-4.0, 0.0), a, b), 4.0);
            assert_eq!(distance_to_segment(Vec2::new(13.0, 4.0), a, b), 5.0);
        }

        #[test]
        fn non_beam_profile_is_rejected() {
            assert!(BeamEffect::new(CombatantId::new(1), Vec2::ZERO, Vec2::X, &profile(WeaponKind::Rpg)).is_none());
            assert!(BeamEffect::new(CombatantId::new(1), Vec2::ZERO, Vec2::ZERO, &profile(WeaponKind::Laser)).is_none());
        }

        #[test]
        fn beam_extends_then_expires() {
            let mut ctx = context();
            let beam = BeamEffect::new(CombatantId::new(9), Vec2::new(20.0, 40.0), Vec2::X, &profile(WeaponKind::Laser)).unwrap();
            let mut effect = ActiveEffect::Beam(beam);

            assert!(!effect.step(&mut ctx, 0.25));
            if let ActiveEffect::Beam(beam) = &effect {
                assert!((beam.reach() - 30.0).abs() < 1e-4);
            }
            assert!(run(&mut effect, &mut ctx, 1.0));
            if let ActiveEffect::Beam(beam) = &effect {
                assert_eq!(beam.reach(), 80.0);
            }
        }

        #[test]
        fn beam_cuts_a_tunnel() {
            let mut ctx = context();
            let origin = Vec2::new(20.0, 40.0);
            let mut effect = ActiveEffect::Beam(BeamEffect::new(CombatantId::new(9), origin, Vec2::X, &profile(WeaponKind::Laser)).unwrap());
            run(&mut effect, &mut ctx, 1.0);

            for x in [21.0, 50.0, 99.0] {
                assert!(!ctx.terrain.is_solid_world(Vec2::new(x, 40.0)), "x = {x}");
            }
            assert!(ctx.terrain.is_solid_world(Vec2::new(101.0, 40.0)));
            assert!(ctx.terrain.is_solid_world(Vec2::new(50.0, 43.0)));
            assert!(!ctx.commands.is_empty());
        }

        #[test]
        fn beam_damages_each_target_once_and_spares_shooter() {
            let mut ctx = context();
            let shooter = spawn(&mut ctx, Vec2::new(20.0, 40.0));
            let near = spawn(&mut ctx, Vec2::new(40.0, 41.0));
            let off_line = spawn(&mut ctx, Vec2::new(60.0, 46.0));
            let mut effect = ActiveEffect::Beam(BeamEffect::new(shooter, Vec2::new(21.5, 40.0), Vec2::X, &profile(WeaponKind::Laser)).unwrap());
            run(&mut effect, &mut ctx, 1.0);

            let health = |id| ctx.arena.get(id).unwrap().health().current();
            assert_eq!(health(shooter), 100.0);
            assert_eq!(health(near), 70.0);
            assert_eq!(health(off_line), 100.0);
        }
    }

    mod pull_tests {
        use super::*;

        #[test]
        fn ring_grows_to_maximum() {
            let mut ctx = context();
            let center = Vec2::new(100.0, 45.0);
            let mut effect = ActiveEffect::Pull(PullField::new(center, &profile(WeaponKind::Blackhole)).unwrap());

            assert!(!run(&mut effect, &mut ctx, 1.0));
            if let ActiveEffect::Pull(field) = &effect {
                assert!((field.carved_radius() - 4.0).abs() < 0.1);
            }
            assert!(run(&mut effect, &mut ctx, 2.1));
            if let ActiveEffect::Pull(field) = &effect {
                assert_eq!(field.carved_radius(), 9.0);
            }
            assert!(!ctx.terrain.is_solid_world(center + Vec2::new(8.5, 0.0)));
            assert!(ctx.terrain.is_solid_world(center + Vec2::new(0.0, -9.5)));
            assert_eq!(ctx.terrain.pending_cells(), 0);
        }

        #[test]
        fn bodies_in_range_are_pulled_and_capped() {
            let mut ctx = context();
            let center = Vec2::new(100.0, 70.0);
            let inside = spawn(&mut ctx, Vec2::new(110.0, 70.0));
            let outside = spawn(&mut ctx, Vec2::new(130.0, 70.0));
            let mut field = PullField::new(center, &profile(WeaponKind::Blackhole)).unwrap();

            for _ in 0..120 {
                field.step(&mut ctx, FIXED_DT);
            }

            let v = ctx.physics.body_velocity(inside).unwrap();
            assert!(v.x < 0.0);
            assert!(v.length() <= 12.0 + 1e-3);
            assert_eq!(ctx.physics.body_velocity(outside).unwrap(), Vec2::ZERO);
        }
    }

    mod resolver_tests {
        use super::*;

        #[test]
        fn expired_effects_are_dropped() {
            let mut ctx = context();
            ctx.effects.push(ActiveEffect::Beam(
                BeamEffect::new(CombatantId::new(1), Vec2::new(10.0, 80.0), Vec2::X, &profile(WeaponKind::Laser)).unwrap(),
            ));
            ctx.effects.push(ActiveEffect::Pull(PullField::new(Vec2::new(150.0, 45.0), &profile(WeaponKind::Blackhole)).unwrap()));

            let mut expired = 0;
            for _ in 0..70 {
                expired += EffectsResolver::step(&mut ctx, FIXED_DT);
            }
            assert_eq!(expired, 1);
            assert_eq!(ctx.effects.len(), 1);
            assert!(matches!(ctx.effects[0], ActiveEffect::Pull(_)));
        }
    }
}
