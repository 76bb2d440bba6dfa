//! State components carried by every combatant.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Hit points, always within `[0, max]`.
///
/// The only ways to change `current` are [`Health::damage`] and
/// [`Health::heal`], both of which clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Full health.
    ///
    /// A non-positive or non-finite `max` falls back to 1.
    #[must_use]
    pub fn full(max: f32) -> Self {
        let max = if max.is_finite() && max > 0.0 { max } else { 1.0 };
        Self { current: max, max }
    }

    /// Current hit points.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Health as a percentage of max, in [0, 100].
    #[must_use]
    pub fn percent(&self) -> f32 {
        self.current / self.max * 100.0
    }

    /// Returns `true` once health has reached zero.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Subtract `amount`, clamping at zero. Returns the amount actually removed.
    pub fn damage(&mut self, amount: f32) -> f32 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current - amount).clamp(0.0, self.max);
        before - self.current
    }

    /// Add `amount`, clamping at max. Returns the amount actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + amount).clamp(0.0, self.max);
        self.current - before
    }

    /// Overwrite current health, clamped into range. Used by replicas.
    pub fn set(&mut self, value: f32) {
        if value.is_finite() {
            self.current = value.clamp(0.0, self.max);
        }
    }
}

/// Which way a combatant is looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Towards negative x
    Left,
    /// Towards positive x
    #[default]
    Right,
}

impl Facing {
    /// Facing toward a horizontal offset; zero keeps `self`.
    #[must_use]
    pub fn toward(self, dx: f32) -> Self {
        if dx < 0.0 {
            Self::Left
        } else if dx > 0.0 {
            Self::Right
        } else {
            self
        }
    }

    /// Unit x sign for this facing.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Position and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Body centre in world space
    pub position: Vec2,
    /// Look direction
    pub facing: Facing,
}

bitflags! {
    /// Combatant status flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StatusFlags: u8 {
        /// Health reached zero or the body fell out of the world (terminal)
        const ELIMINATED = 1 << 0;
        /// Elimination was caused by falling below the world
        const FELL = 1 << 1;
        /// Controlled by the AI pipeline
        const BOT = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_at_zero() {
        let mut hp = Health::full(100.0);
        assert!((hp.damage(30.0) - 30.0).abs() < f32::EPSILON);
        assert!((hp.damage(500.0) - 70.0).abs() < f32::EPSILON);
        assert!(hp.is_depleted());
        assert_eq!(hp.current(), 0.0);
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut hp = Health::full(50.0);
        hp.damage(10.0);
        assert!((hp.heal(100.0) - 10.0).abs() < f32::EPSILON);
        assert!((hp.current() - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn negative_and_nan_amounts_ignored() {
        let mut hp = Health::full(100.0);
        assert_eq!(hp.damage(-5.0), 0.0);
        assert_eq!(hp.damage(f32::NAN), 0.0);
        assert_eq!(hp.heal(f32::INFINITY), 0.0);
        assert!((hp.current() - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn facing_follows_offset() {
        assert_eq!(Facing::Right.toward(-2.0), Facing::Left);
        assert_eq!(Facing::Left.toward(0.0), Facing::Left);
        assert!((Facing::Left.sign() + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn status_flags_serialize() {
        let flags = StatusFlags::ELIMINATED | StatusFlags::FELL;
        let json = serde_json::to_string(&flags).unwrap();
        let back: StatusFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
