//! Damage resolver: the single writer of combatant health.
//!
//! Every health change emits `HealthChanged` and logs a `DamageResult`
//! command. Health reaching zero eliminates the combatant exactly once,
//! emits `CombatantEliminated` and removes its physics body. The win check is
//! left to the coordinator.

use std::fmt;

use glam::Vec2;
use tracing::{debug, info};

use crate::command::NetCommand;
use crate::context::MatchContext;
use crate::entity::CombatantId;
use crate::events::{EliminationCause, MatchEvent};

use super::{Falloff, FalloffCurve};

/// One application of damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageApplied {
    /// Who was hit
    pub combatant: CombatantId,
    /// Hit points actually removed
    pub amount: f32,
    /// Health afterwards
    pub health: f32,
    /// This hit eliminated the combatant
    pub eliminated: bool,
}

/// Applies radial and direct damage, healing and fall deaths.
///
/// The radial curve is pluggable through the [`Falloff`] trait; the default
/// is linear.
///
/// # Example
///
/// ```
/// use shellfall_core::resolver::{DamageResolver, FalloffCurve};
///
/// let resolver = DamageResolver::new(FalloffCurve::Linear);
/// assert_eq!(resolver.multiplier(2.5, 5.0) * 18.0, 9.0);
/// ```
pub struct DamageResolver {
    falloff: Box<dyn Falloff>,
}

impl fmt::Debug for DamageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DamageResolver").finish_non_exhaustive()
    }
}

impl Default for DamageResolver {
    fn default() -> Self {
        Self::new(FalloffCurve::default())
    }
}

impl DamageResolver {
    /// Resolver using one of the built-in curves.
    #[must_use]
    pub fn new(curve: FalloffCurve) -> Self {
        Self::with_falloff(curve)
    }

    /// Resolver using a custom falloff rule.
    #[must_use]
    pub fn with_falloff(falloff: impl Falloff + 'static) -> Self {
        Self {
            falloff: Box::new(falloff),
        }
    }

    /// Falloff multiplier at `distance` inside `radius`.
    #[must_use]
    pub fn multiplier(&self, distance: f32, radius: f32) -> f32 {
        self.falloff.multiplier(distance, radius).clamp(0.0, 1.0)
    }

    /// Damage every living combatant within `radius` of `center`.
    ///
    /// Each takes `max_damage * multiplier(distance, radius)`; combatants at
    /// or beyond the radius are untouched. Results are in id order.
    pub fn apply_radial(&self, ctx: &mut MatchContext, center: Vec2, radius: f32, max_damage: f32) -> Vec<DamageApplied> {
        if radius <= 0.0 || max_damage <= 0.0 {
            return Vec::new();
        }
        let mut applied = Vec::new();
        for id in ctx.arena.query_radius(center, radius) {
            let Some(position) = ctx.arena.get(id).map(crate::entity::Combatant::position) else {
                continue;
            };
            let multiplier = self.multiplier(center.distance(position), radius);
            if multiplier <= 0.0 {
                continue;
            }
            if let Some(result) = Self::apply_direct(ctx, id, max_damage * multiplier) {
                applied.push(result);
            }
        }
        applied
    }

    /// Damage one combatant, clamped so health stays within `[0, max]`.
    ///
    /// Returns `None` if the combatant is unknown, already eliminated, or the
    /// damage removed nothing.
    pub fn apply_direct(ctx: &mut MatchContext, id: CombatantId, damage: f32) -> Option<DamageApplied> {
        let combatant = ctx.arena.get_mut(id).filter(|c| c.is_alive())?;
        let amount = combatant.health_mut().damage(damage);
        if amount <= 0.0 {
            return None;
        }
        let health = *combatant.health();
        let eliminated = health.is_depleted() && combatant.eliminate(false);

        debug!(combatant = %id, amount, health = health.current(), "damage applied");
        ctx.events.emit(MatchEvent::HealthChanged {
            combatant: id,
            health_percent: health.percent(),
        });
        ctx.commands.push(NetCommand::DamageResult {
            combatant: id,
            health: health.current(),
        });
        if eliminated {
            Self::finish_elimination(ctx, id, EliminationCause::Damage);
        }

        Some(DamageApplied {
            combatant: id,
            amount,
            health: health.current(),
            eliminated,
        })
    }

    /// Restore health to a living combatant. Returns the amount restored.
    pub fn apply_heal(ctx: &mut MatchContext, id: CombatantId, amount: f32) -> Option<f32> {
        let combatant = ctx.arena.get_mut(id).filter(|c| c.is_alive())?;
        let restored = combatant.health_mut().heal(amount);
        if restored <= 0.0 {
            return None;
        }
        let health = *combatant.health();
        ctx.events.emit(MatchEvent::HealthChanged {
            combatant: id,
            health_percent: health.percent(),
        });
        ctx.commands.push(NetCommand::DamageResult {
            combatant: id,
            health: health.current(),
        });
        Some(restored)
    }

    /// Kill a combatant that fell out of the world.
    ///
    /// Returns `false` if it was already eliminated.
    pub fn kill_by_fall(ctx: &mut MatchContext, id: CombatantId) -> bool {
        let Some(combatant) = ctx.arena.get_mut(id).filter(|c| c.is_alive()) else {
            return false;
        };
        combatant.health_mut().set(0.0);
        combatant.eliminate(true);

        ctx.events.emit(MatchEvent::HealthChanged {
            combatant: id,
            health_percent: 0.0,
        });
        ctx.commands.push(NetCommand::DamageResult {
            combatant: id,
            health: 0.0,
        });
        Self::finish_elimination(ctx, id, EliminationCause::Fall);
        true
    }

    fn finish_elimination(ctx: &mut MatchContext, id: CombatantId, cause: EliminationCause) {
        info!(combatant = %id, ?cause, "combatant eliminated");
        ctx.physics.remove_body(id);
        ctx.events.emit(MatchEvent::CombatantEliminated { combatant: id, cause });
    }
}
