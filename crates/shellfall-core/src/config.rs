//! Match configuration.
//!
//! Everything tunable about a match lives in one serde struct tree handed to
//! the coordinator at match start. Every section has defaults, so a JSON
//! document only needs the fields it changes:
//!
//! ```
//! use shellfall_core::config::MatchConfig;
//!
//! let config = MatchConfig::from_json(r#"{ "turn": { "duration": 20.0 }, "seed": 7 }"#).unwrap();
//! assert_eq!(config.turn.duration, 20.0);
//! assert_eq!(config.turn.post_action_grace, 3.0);
//! assert_eq!(config.seed, 7);
//! ```

use crater::{Bounds, TerrainConfig};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ai::AiProfile;
use crate::error::ConfigError;
use crate::resolver::FalloffCurve;
use crate::weapon::WeaponTable;

/// Turn timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Seconds per turn
    pub duration: f32,
    /// Seconds left after firing (never raises the remaining time)
    pub post_action_grace: f32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            duration: 30.0,
            post_action_grace: 3.0,
        }
    }
}

/// World extents and body physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Playable region; the terrain grid covers exactly this
    pub bounds: Bounds,
    /// Downward acceleration
    pub gravity: f32,
    /// Bodies below this height are killed outright
    pub fall_threshold_y: f32,
    /// Combatant body radius
    pub body_radius: f32,
    /// Horizontal walking speed for repositioning
    pub walk_speed: f32,
    /// Horizontal velocity kept per grounded physics step
    pub ground_friction: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::from_min_max(Vec2::ZERO, Vec2::new(200.0, 100.0)),
            gravity: 9.8,
            fall_threshold_y: -10.0,
            body_radius: 1.0,
            walk_speed: 4.0,
            ground_friction: 0.85,
        }
    }
}

/// Terrain grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Cells across
    pub width: u32,
    /// Cells down
    pub height: u32,
    /// Seconds between batched boundary rebuilds
    pub flush_interval: f32,
    /// Below this solid percentage the terrain body is deactivated
    pub min_solid_percent: f32,
    /// Carve radius for terrain hits by non-explosive weapons
    pub fixed_carve_radius: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            width: 400,
            height: 200,
            flush_interval: 0.1,
            min_solid_percent: 1.0,
            fixed_carve_radius: 1.5,
        }
    }
}

impl TerrainSettings {
    /// Terrain field config for the given world bounds.
    #[must_use]
    pub fn to_terrain_config(&self, bounds: Bounds) -> TerrainConfig {
        TerrainConfig {
            flush_interval: self.flush_interval,
            min_solid_percent: self.min_solid_percent,
            ..TerrainConfig::new(bounds, self.width, self.height)
        }
    }
}

/// Damage, knockback and inventory settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Starting and maximum health
    pub max_health: f32,
    /// Inventory capacity
    pub inventory_slots: usize,
    /// Impulse at the centre of an explosion
    pub knockback_force: f32,
    /// Distance from body centre to the muzzle
    pub muzzle_offset: f32,
    /// Radius within which a combatant collects a world item
    pub pickup_radius: f32,
    /// Radial damage curve
    pub falloff: FalloffCurve,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            inventory_slots: 5,
            knockback_force: 8.0,
            muzzle_offset: 1.5,
            pickup_radius: 1.5,
            falloff: FalloffCurve::Linear,
        }
    }
}

/// Complete match configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Turn timing
    pub turn: TurnConfig,
    /// World extents and body physics
    pub world: WorldConfig,
    /// Terrain grid
    pub terrain: TerrainSettings,
    /// Damage and inventory
    pub combat: CombatConfig,
    /// Weapon table
    pub weapons: WeaponTable,
    /// Bot behaviour
    pub ai: AiProfile,
    /// Seed for turn-order shuffling and AI randomness
    pub seed: u64,
    /// Shuffle turn order with the seed at match start
    pub shuffle_turn_order: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            turn: TurnConfig::default(),
            world: WorldConfig::default(),
            terrain: TerrainSettings::default(),
            combat: CombatConfig::default(),
            weapons: WeaponTable::default(),
            ai: AiProfile::default(),
            seed: 0,
            shuffle_turn_order: false,
        }
    }
}

impl MatchConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input, or the first
    /// validation failure.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set turn duration and grace window.
    #[must_use]
    pub fn with_turn_timing(mut self, duration: f32, post_action_grace: f32) -> Self {
        self.turn = TurnConfig {
            duration,
            post_action_grace,
        };
        self
    }

    /// Set world bounds.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.world.bounds = bounds;
        self
    }

    /// Set terrain resolution.
    #[must_use]
    pub fn with_terrain_resolution(mut self, width: u32, height: u32) -> Self {
        self.terrain.width = width;
        self.terrain.height = height;
        self
    }

    /// Replace the weapon table.
    #[must_use]
    pub fn with_weapons(mut self, weapons: WeaponTable) -> Self {
        self.weapons = weapons;
        self
    }

    /// Replace the AI profile.
    #[must_use]
    pub fn with_ai(mut self, ai: AiProfile) -> Self {
        self.ai = ai;
        self
    }

    /// Enable or disable turn-order shuffling.
    #[must_use]
    pub fn with_shuffled_turns(mut self, shuffle: bool) -> Self {
        self.shuffle_turn_order = shuffle;
        self
    }

    /// Terrain field config derived from the world and terrain sections.
    #[must_use]
    pub fn terrain_config(&self) -> TerrainConfig {
        self.terrain.to_terrain_config(self.world.bounds)
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("turn.duration", self.turn.duration)?;
        in_range("turn.post_action_grace", self.turn.post_action_grace, 0.0, self.turn.duration)?;

        if !self.world.bounds.is_valid() {
            return Err(ConfigError::InvalidBounds);
        }
        positive("world.gravity", self.world.gravity)?;
        positive("world.body_radius", self.world.body_radius)?;
        positive("world.walk_speed", self.world.walk_speed)?;
        in_range("world.ground_friction", self.world.ground_friction, 0.0, 1.0)?;
        if !self.world.fall_threshold_y.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "world.fall_threshold_y",
                value: self.world.fall_threshold_y,
                min: f32::MIN,
                max: f32::MAX,
            });
        }

        if self.terrain.width == 0 || self.terrain.height == 0 {
            return Err(ConfigError::ZeroResolution {
                width: self.terrain.width,
                height: self.terrain.height,
            });
        }
        positive("terrain.flush_interval", self.terrain.flush_interval)?;
        in_range("terrain.min_solid_percent", self.terrain.min_solid_percent, 0.0, 100.0)?;
        positive("terrain.fixed_carve_radius", self.terrain.fixed_carve_radius)?;

        positive("combat.max_health", self.combat.max_health)?;
        if self.combat.inventory_slots == 0 {
            return Err(ConfigError::NoInventorySlots);
        }
        in_range("combat.knockback_force", self.combat.knockback_force, 0.0, f32::MAX)?;
        in_range("combat.muzzle_offset", self.combat.muzzle_offset, 0.0, f32::MAX)?;
        in_range("combat.pickup_radius", self.combat.pickup_radius, 0.0, f32::MAX)?;

        self.weapons.validate()?;
        self.ai.validate()
    }
}

pub(crate) fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

pub(crate) fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}
