//! Combat resolver: fire validation and impact resolution.
//!
//! The `CombatResolver` handles:
//! - Fire requests: validate against the turn, inventory and input, then
//!   consume ammo, force-end the turn and launch the shot
//! - Impacts reported by the physics collaborator: carve terrain, apply
//!   radial or direct damage, push bodies away, or open a pull field
//!
//! # Rejections
//!
//! A rejected fire request changes nothing: the scheduler, the inventory and
//! the command log are untouched.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::command::NetCommand;
use crate::context::MatchContext;
use crate::entity::CombatantId;
use crate::error::FireRejection;
use crate::physics::{ImpactEvent, ProjectileSpec, SurfaceTag};
use crate::scheduler::{TurnScheduler, TurnState};
use crate::weapon::{WeaponEffect, WeaponKind, WeaponProfile};

use super::{ActiveEffect, BeamEffect, DamageResolver, PullField};

/// Collision radius of launched projectiles.
const PROJECTILE_RADIUS: f32 = 0.1;

/// A request to fire the turn owner's weapon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireRequest {
    /// Who is firing
    pub shooter: CombatantId,
    /// Which weapon
    pub weapon: WeaponKind,
    /// Aim direction; normalised on acceptance
    pub direction: Vec2,
    /// Power in (0, 1]
    pub power: f32,
}

/// Validates fire requests and resolves impacts.
#[derive(Debug, Default)]
pub struct CombatResolver {
    damage: DamageResolver,
}

impl CombatResolver {
    /// Resolver using `damage` for radial falloff.
    #[must_use]
    pub fn new(damage: DamageResolver) -> Self {
        Self { damage }
    }

    /// The damage resolver in use.
    #[must_use]
    pub const fn damage(&self) -> &DamageResolver {
        &self.damage
    }

    /// Check a fire request without changing anything.
    ///
    /// Returns the shooter's copy of the weapon profile and the normalised
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns the first [`FireRejection`] that applies, checked in this
    /// order: no active turn, not the owner, already fired, unknown shooter,
    /// shooter eliminated, bad direction, bad power, weapon not owned, out
    /// of ammo.
    pub fn validate(
        ctx: &MatchContext,
        scheduler: &TurnScheduler,
        request: &FireRequest,
    ) -> Result<(WeaponProfile, Vec2), FireRejection> {
        if !matches!(scheduler.state(), TurnState::Active | TurnState::EndingByAction) {
            return Err(FireRejection::NoActiveTurn);
        }
        let owner = scheduler.current_owner().ok_or(FireRejection::NoActiveTurn)?;
        if owner != request.shooter {
            return Err(FireRejection::NotYourTurn {
                shooter: request.shooter,
                owner,
            });
        }
        if scheduler.has_fired() {
            return Err(FireRejection::AlreadyFired(request.shooter));
        }
        let shooter = ctx
            .arena
            .get(request.shooter)
            .ok_or(FireRejection::UnknownCombatant(request.shooter))?;
        if !shooter.is_alive() {
            return Err(FireRejection::ShooterEliminated(request.shooter));
        }
        let direction = request
            .direction
            .try_normalize()
            .ok_or(FireRejection::InvalidDirection)?;
        if !(request.power.is_finite() && request.power > 0.0 && request.power <= 1.0) {
            return Err(FireRejection::InvalidPower(request.power));
        }
        let profile = shooter
            .inventory
            .find(request.weapon)
            .ok_or(FireRejection::WeaponNotOwned(request.weapon))?;
        if !shooter.inventory.can_fire(request.weapon) {
            return Err(FireRejection::OutOfAmmo(request.weapon));
        }
        Ok((profile.clone(), direction))
    }

    /// Validate and execute a fire request.
    ///
    /// On acceptance the shooter's ammo is consumed, the turn is marked as
    /// fired and force-ended, a `Fire` command is logged and the projectile
    /// (or beam) is launched.
    ///
    /// # Errors
    ///
    /// See [`CombatResolver::validate`].
    pub fn submit_fire(
        ctx: &mut MatchContext,
        scheduler: &mut TurnScheduler,
        request: &FireRequest,
    ) -> Result<(), FireRejection> {
        let (profile, direction) = Self::validate(ctx, scheduler, request)?;
        let shooter = ctx
            .arena
            .get_mut(request.shooter)
            .ok_or(FireRejection::UnknownCombatant(request.shooter))?;
        shooter.inventory.consume(request.weapon)?;
        let dx = direction.x;
        shooter.transform.facing = shooter.transform.facing.toward(dx);
        let origin = shooter.position() + direction * ctx.config.combat.muzzle_offset;

        scheduler.mark_fired();
        scheduler.force_end_turn();

        debug!(
            shooter = %request.shooter,
            weapon = %request.weapon,
            power = request.power,
            ?direction,
            "shot fired"
        );
        ctx.commands.push(NetCommand::Fire {
            shooter: request.shooter,
            weapon: request.weapon,
            direction,
            power: request.power,
            origin,
        });

        if let Some(beam) = BeamEffect::new(request.shooter, origin, direction, &profile) {
            ctx.effects.push(ActiveEffect::Beam(beam));
            return Ok(());
        }
        let fuse = match profile.effect {
            WeaponEffect::Radial { fuse } => fuse,
            _ => None,
        };
        ctx.physics.spawn_projectile(ProjectileSpec {
            shooter: request.shooter,
            weapon: request.weapon,
            position: origin,
            velocity: direction * profile.projectile_speed * request.power,
            gravity_scale: if profile.gravity_affected { 1.0 } else { 0.0 },
            fuse,
            radius: PROJECTILE_RADIUS,
        });
        Ok(())
    }

    /// Apply the consequences of a projectile impact.
    pub fn resolve_impact(&self, ctx: &mut MatchContext, impact: &ImpactEvent) {
        if impact.surface == SurfaceTag::OutOfWorld {
            debug!(weapon = %impact.weapon, point = ?impact.point, "shot left the world");
            return;
        }
        let Some(profile) = ctx.config.weapons.get(impact.weapon).cloned() else {
            warn!(weapon = %impact.weapon, "impact from a weapon missing from the table; ignoring");
            return;
        };
        debug!(weapon = %impact.weapon, point = ?impact.point, surface = ?impact.surface, "impact");

        if let Some(field) = PullField::new(impact.point, &profile) {
            ctx.effects.push(ActiveEffect::Pull(field));
            return;
        }

        if profile.explosion_radius > 0.0 {
            let radius = profile.explosion_radius;
            if impact.surface == SurfaceTag::Terrain {
                ctx.carve(impact.point, radius);
            }
            self.damage.apply_radial(ctx, impact.point, radius, profile.damage);
            self.apply_knockback(ctx, impact.point, radius);
            return;
        }

        match impact.surface {
            SurfaceTag::Terrain => {
                ctx.carve(impact.point, ctx.config.terrain.fixed_carve_radius);
            }
            SurfaceTag::Combatant(id) => {
                DamageResolver::apply_direct(ctx, id, profile.damage);
            }
            SurfaceTag::OutOfWorld => {}
        }
    }

    /// Push every living body within `radius` away from `center`.
    ///
    /// Candidates come from the physics overlap query; falloff is measured
    /// from the body centre, so a body that only grazes the blast is not moved.
    pub fn apply_knockback(&self, ctx: &mut MatchContext, center: Vec2, radius: f32) {
        let force = ctx.config.combat.knockback_force;
        if force <= 0.0 {
            return;
        }
        for id in ctx.physics.overlap_circle(center, radius) {
            if !ctx.arena.is_alive(id) {
                continue;
            }
            let Some(position) = ctx.physics.body_position(id) else {
                continue;
            };
            let multiplier = self.damage.multiplier(center.distance(position), radius);
            if multiplier <= 0.0 {
                continue;
            }
            let away = (position - center).try_normalize().unwrap_or(Vec2::Y);
            ctx.physics.apply_impulse(id, away * force * multiplier);
        }
    }
}
