//! Resolvers turn shots and impacts into state changes.
//!
//! Resolvers are the only writers of combatant health, terrain occupancy and
//! ammo. Each works against the [`MatchContext`](crate::context::MatchContext)
//! and records what it did twice: as [`MatchEvent`](crate::events::MatchEvent)s
//! for local observers and as [`NetCommand`](crate::command::NetCommand)s for
//! replicas.
//!
//! # Invariants
//!
//! - Resolvers iterate combatants in id order so every participant applies
//!   the same changes in the same sequence
//! - Health is changed only through [`DamageResolver`]
//!
//! # Available Resolvers
//!
//! - [`DamageResolver`]: radial and direct damage, healing, fall deaths
//! - [`CombatResolver`]: fire validation, impacts, knockback
//! - [`EffectsResolver`]: beams and pull fields that run over several steps

mod combat;
mod damage;
mod effects;

pub use combat::{CombatResolver, FireRequest};
pub use damage::{DamageApplied, DamageResolver};
pub use effects::{ActiveEffect, BeamEffect, EffectsResolver, PullField};

use serde::{Deserialize, Serialize};

/// Shape of a falloff over normalised closeness `t` in [0, 1].
///
/// `t = 1` is the centre, `t = 0` the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FalloffCurve {
    /// `t`
    #[default]
    Linear,
    /// `t * t`
    Quadratic,
    /// `3t² - 2t³`
    Smoothstep,
}

impl FalloffCurve {
    /// Evaluate the curve at `t`, clamped to [0, 1].
    #[must_use]
    pub fn shape(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Quadratic => t * t,
            Self::Smoothstep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// Distance-to-multiplier rule for radial effects.
///
/// # Example
///
/// ```
/// use shellfall_core::resolver::{Falloff, FalloffCurve};
///
/// let linear = FalloffCurve::Linear;
/// assert_eq!(linear.multiplier(0.0, 5.0), 1.0);
/// assert_eq!(linear.multiplier(2.5, 5.0), 0.5);
/// assert_eq!(linear.multiplier(5.0, 5.0), 0.0);
/// ```
pub trait Falloff {
    /// Multiplier in [0, 1] at `distance` from the centre of a `radius` effect.
    ///
    /// Must return 0 for `distance >= radius` and 1 at the centre.
    fn multiplier(&self, distance: f32, radius: f32) -> f32;
}

impl Falloff for FalloffCurve {
    fn multiplier(&self, distance: f32, radius: f32) -> f32 {
        if radius.is_nan() || radius <= 0.0 || !distance.is_finite() || distance >= radius {
            return 0.0;
        }
        self.shape(1.0 - distance.max(0.0) / radius)
    }
}
