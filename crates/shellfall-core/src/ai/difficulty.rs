//! Bot tuning: timing, accuracy, fairness and difficulty presets.

use serde::{Deserialize, Serialize};

use crate::config::{in_range, positive};
use crate::error::ConfigError;

use super::targeting::TargetStrategy;
use super::weapon_select::WeaponStrategy;

/// Extra inaccuracy against humans who are about to die.
///
/// With probability `probability`, a shot at a human at or below
/// `critical_health_percent` gets `extra_error_deg` more aim error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessPolicy {
    /// Master switch
    pub enabled: bool,
    /// Health percentage at or below which the policy applies
    pub critical_health_percent: f32,
    /// Chance per shot
    pub probability: f32,
    /// Added error in degrees
    pub extra_error_deg: f32,
}

impl Default for FairnessPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_health_percent: 25.0,
            probability: 0.5,
            extra_error_deg: 12.0,
        }
    }
}

/// Running hit-rate feedback.
///
/// After each bot turn the hit rate is folded into an exponential moving
/// average. A bot hitting more often than `target_accuracy` gets more aim
/// error and thinks for less time; one missing too often gets the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveAccuracy {
    /// Master switch
    pub enabled: bool,
    /// Hit rate the bot steers toward
    pub target_accuracy: f32,
    /// EMA weight of the latest shot
    pub smoothing: f32,
    /// How strongly the accuracy gap scales the error
    pub gain: f32,
    /// Lowest error multiplier
    pub min_scale: f32,
    /// Highest error multiplier
    pub max_scale: f32,
}

impl Default for AdaptiveAccuracy {
    fn default() -> Self {
        Self {
            enabled: true,
            target_accuracy: 0.5,
            smoothing: 0.3,
            gain: 2.0,
            min_scale: 0.5,
            max_scale: 2.0,
        }
    }
}

impl AdaptiveAccuracy {
    /// Aim error multiplier for a running accuracy.
    #[must_use]
    pub fn error_scale(&self, accuracy: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        (1.0 + (accuracy - self.target_accuracy) * self.gain).clamp(self.min_scale, self.max_scale)
    }

    /// Think time multiplier for a running accuracy.
    #[must_use]
    pub fn think_scale(&self, accuracy: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        (1.0 - (accuracy - self.target_accuracy) * self.gain * 0.5).clamp(self.min_scale, self.max_scale)
    }

    /// Fold one outcome into the running accuracy.
    #[must_use]
    pub fn update(&self, accuracy: f32, hit: bool) -> f32 {
        let sample = if hit { 1.0 } else { 0.0 };
        accuracy + (sample - accuracy) * self.smoothing
    }
}

/// Optional walk before shooting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositionSettings {
    /// Chance per turn of trying to move
    pub chance: f32,
    /// Largest lateral offset in world units
    pub max_offset: f32,
    /// Give up walking after this many seconds
    pub timeout: f32,
}

impl Default for RepositionSettings {
    fn default() -> Self {
        Self {
            chance: 0.3,
            max_offset: 8.0,
            timeout: 4.0,
        }
    }
}

/// Everything that shapes a bot's behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiProfile {
    /// Seconds spent thinking before acting
    pub think_time: f32,
    /// Seconds spent aiming before firing
    pub aim_time: f32,
    /// Largest random aim error in degrees
    pub aim_error_deg: f32,
    /// Preferred power for ballistic shots
    pub base_power: f32,
    /// Target selection
    pub target_strategy: TargetStrategy,
    /// Weapon selection
    pub weapon_strategy: WeaponStrategy,
    /// Walk before shooting
    pub reposition: RepositionSettings,
    /// Mercy toward nearly dead humans
    pub fairness: FairnessPolicy,
    /// Hit-rate feedback
    pub adaptive: AdaptiveAccuracy,
}

impl Default for AiProfile {
    fn default() -> Self {
        Difficulty::Normal.profile()
    }
}

impl AiProfile {
    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        in_range("ai.think_time", self.think_time, 0.0, f32::MAX)?;
        in_range("ai.aim_time", self.aim_time, 0.0, f32::MAX)?;
        in_range("ai.aim_error_deg", self.aim_error_deg, 0.0, 90.0)?;
        if !(self.base_power > 0.0 && self.base_power <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "ai.base_power",
                value: self.base_power,
                min: f32::EPSILON,
                max: 1.0,
            });
        }
        in_range("ai.reposition.chance", self.reposition.chance, 0.0, 1.0)?;
        in_range("ai.reposition.max_offset", self.reposition.max_offset, 0.0, f32::MAX)?;
        positive("ai.reposition.timeout", self.reposition.timeout)?;
        in_range(
            "ai.fairness.critical_health_percent",
            self.fairness.critical_health_percent,
            0.0,
            100.0,
        )?;
        in_range("ai.fairness.probability", self.fairness.probability, 0.0, 1.0)?;
        in_range("ai.fairness.extra_error_deg", self.fairness.extra_error_deg, 0.0, 90.0)?;
        in_range("ai.adaptive.target_accuracy", self.adaptive.target_accuracy, 0.0, 1.0)?;
        in_range("ai.adaptive.smoothing", self.adaptive.smoothing, 0.0, 1.0)?;
        in_range("ai.adaptive.gain", self.adaptive.gain, 0.0, f32::MAX)?;
        positive("ai.adaptive.min_scale", self.adaptive.min_scale)?;
        in_range("ai.adaptive.max_scale", self.adaptive.max_scale, self.adaptive.min_scale, f32::MAX)
    }
}

/// Difficulty presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Slow and sloppy
    Easy,
    /// Balanced
    #[default]
    Normal,
    /// Quick and precise
    Hard,
}

impl Difficulty {
    /// Build the profile for this preset.
    #[must_use]
    pub fn profile(self) -> AiProfile {
        let base = AiProfile {
            think_time: 1.5,
            aim_time: 1.0,
            aim_error_deg: 6.0,
            base_power: 0.8,
            target_strategy: TargetStrategy::Nearest,
            weapon_strategy: WeaponStrategy::Priority,
            reposition: RepositionSettings::default(),
            fairness: FairnessPolicy::default(),
            adaptive: AdaptiveAccuracy::default(),
        };
        match self {
            Self::Easy => AiProfile {
                think_time: 2.5,
                aim_time: 1.5,
                aim_error_deg: 14.0,
                target_strategy: TargetStrategy::Farthest,
                fairness: FairnessPolicy {
                    probability: 0.8,
                    ..FairnessPolicy::default()
                },
                ..base
            },
            Self::Normal => base,
            Self::Hard => AiProfile {
                think_time: 0.8,
                aim_time: 0.5,
                aim_error_deg: 2.0,
                base_power: 0.9,
                target_strategy: TargetStrategy::LowestHealth,
                weapon_strategy: WeaponStrategy::Strategic,
                fairness: FairnessPolicy {
                    probability: 0.2,
                    ..FairnessPolicy::default()
                },
                ..base
            },
        }
    }
}
