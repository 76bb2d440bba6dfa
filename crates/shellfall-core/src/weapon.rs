//! Weapon templates.
//!
//! A [`WeaponProfile`] is an immutable template from the match's
//! [`WeaponTable`]. Inventories hold per-combatant clones whose only mutable
//! part is the ammo count.
//!
//! What a weapon does on impact is carried by its [`WeaponEffect`], a tagged
//! variant dispatched by the combat resolver. Each variant carries only the
//! parameters it needs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{in_range, positive};
use crate::error::ConfigError;
use crate::resolver::FalloffCurve;

/// Weapon identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Infinite-ammo direct-hit gun
    BasicGun,
    /// Rocket with a large explosion
    Rpg,
    /// Bouncing explosive on a fuse
    Grenade,
    /// Instant beam that cuts through terrain
    Laser,
    /// Pull field that swallows ground and bodies
    Blackhole,
}

impl WeaponKind {
    /// Every kind, in table order.
    pub const ALL: [Self; 5] = [Self::BasicGun, Self::Rpg, Self::Grenade, Self::Laser, Self::Blackhole];
}

impl fmt::Display for WeaponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasicGun => write!(f, "BasicGun"),
            Self::Rpg => write!(f, "Rpg"),
            Self::Grenade => write!(f, "Grenade"),
            Self::Laser => write!(f, "Laser"),
            Self::Blackhole => write!(f, "Blackhole"),
        }
    }
}

/// Ammo remaining for one inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ammo {
    /// Never runs out
    Infinite,
    /// Shots left
    Count(u32),
}

impl Ammo {
    /// Can fire at least once more.
    #[must_use]
    pub const fn has_ammo(self) -> bool {
        match self {
            Self::Infinite => true,
            Self::Count(n) => n > 0,
        }
    }

    /// Use one shot. Returns `false` if already empty.
    pub fn consume(&mut self) -> bool {
        match self {
            Self::Infinite => true,
            Self::Count(0) => false,
            Self::Count(n) => {
                *n -= 1;
                true
            }
        }
    }

    /// Add shots from a pickup. Infinite stays infinite.
    pub fn add(&mut self, other: Self) {
        *self = match (*self, other) {
            (Self::Infinite, _) | (_, Self::Infinite) => Self::Infinite,
            (Self::Count(a), Self::Count(b)) => Self::Count(a.saturating_add(b)),
        };
    }
}

/// Impact behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WeaponEffect {
    /// Full damage to the combatant hit, nothing else
    Direct,
    /// Explosion with distance falloff
    Radial {
        /// Seconds before detonating; `None` detonates on contact
        fuse: Option<f32>,
    },
    /// Beam extending from the muzzle along the aim direction
    Beam {
        /// Maximum reach in world units
        length: f32,
        /// Full width of the cut
        width: f32,
        /// How fast the beam tip advances (units per second)
        extend_speed: f32,
        /// Seconds the beam stays active
        duration: f32,
    },
    /// Field pulling bodies toward its centre while eating terrain
    AreaPull {
        /// Pull radius
        range: f32,
        /// Force at the centre
        max_force: f32,
        /// Cap on pulled body speed
        max_velocity: f32,
        /// Field lifetime in seconds
        duration: f32,
        /// Ring carve growth (units per second)
        carve_rate: f32,
        /// Final carve radius
        max_carve_radius: f32,
        /// Shape of the pull over normalised distance
        curve: FalloffCurve,
    },
}

/// Immutable weapon template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Identity
    pub kind: WeaponKind,
    /// Damage per shot (maximum for explosions)
    pub damage: f32,
    /// Launch speed at full power
    pub projectile_speed: f32,
    /// Projectile follows gravity
    pub gravity_affected: bool,
    /// Explosion radius; zero for non-explosive weapons
    pub explosion_radius: f32,
    /// Ammo granted with the weapon
    pub ammo: Ammo,
    /// Effect keeps running after the shot (beams, pull fields)
    pub instant_use: bool,
    /// Impact behaviour
    pub effect: WeaponEffect,
    /// AI preference; higher is picked first
    pub ai_priority: u8,
}

impl WeaponProfile {
    /// Whether the shot spawns a physics projectile.
    #[must_use]
    pub const fn spawns_projectile(&self) -> bool {
        !matches!(self.effect, WeaponEffect::Beam { .. })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        in_range("weapons.damage", self.damage, 0.0, f32::MAX)?;
        in_range("weapons.explosion_radius", self.explosion_radius, 0.0, f32::MAX)?;
        if self.spawns_projectile() && (!self.projectile_speed.is_finite() || self.projectile_speed <= 0.0) {
            return Err(ConfigError::NonPositive {
                field: "weapons.projectile_speed",
                value: self.projectile_speed,
            });
        }
        match self.effect {
            WeaponEffect::Direct | WeaponEffect::Radial { fuse: None } => Ok(()),
            WeaponEffect::Radial { fuse: Some(fuse) } => positive("weapons.effect.fuse", fuse),
            WeaponEffect::Beam {
                length,
                width,
                extend_speed,
                duration,
            } => {
                positive("weapons.effect.length", length)?;
                positive("weapons.effect.width", width)?;
                positive("weapons.effect.extend_speed", extend_speed)?;
                positive("weapons.effect.duration", duration)
            }
            WeaponEffect::AreaPull {
                range,
                max_velocity,
                duration,
                carve_rate,
                ..
            } => {
                positive("weapons.effect.range", range)?;
                positive("weapons.effect.max_velocity", max_velocity)?;
                positive("weapons.effect.duration", duration)?;
                in_range("weapons.effect.carve_rate", carve_rate, 0.0, f32::MAX)
            }
        }
    }
}

/// The set of weapons available in a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponTable {
    profiles: Vec<WeaponProfile>,
}

impl WeaponTable {
    /// Build a table from profiles.
    #[must_use]
    pub fn new(profiles: Vec<WeaponProfile>) -> Self {
        Self { profiles }
    }

    /// Look up a weapon by kind.
    #[must_use]
    pub fn get(&self, kind: WeaponKind) -> Option<&WeaponProfile> {
        self.profiles.iter().find(|p| p.kind == kind)
    }

    /// Replace (or add) one profile.
    pub fn set(&mut self, profile: WeaponProfile) {
        match self.profiles.iter_mut().find(|p| p.kind == profile.kind) {
            Some(slot) => *slot = profile,
            None => self.profiles.push(profile),
        }
    }

    /// The first infinite-ammo weapon: every inventory starts with it.
    #[must_use]
    pub fn default_weapon(&self) -> Option<&WeaponProfile> {
        self.profiles.iter().find(|p| p.ammo == Ammo::Infinite)
    }

    /// All profiles in table order.
    pub fn iter(&self) -> impl Iterator<Item = &WeaponProfile> {
        self.profiles.iter()
    }

    /// Check every profile and the table as a whole.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field, a duplicate kind, or
    /// [`ConfigError::MissingDefaultWeapon`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, profile) in self.profiles.iter().enumerate() {
            if self.profiles[..i].iter().any(|p| p.kind == profile.kind) {
                return Err(ConfigError::DuplicateWeapon(profile.kind));
            }
            profile.validate()?;
        }
        if self.default_weapon().is_none() {
            return Err(ConfigError::MissingDefaultWeapon);
        }
        Ok(())
    }
}

impl Default for WeaponTable {
    fn default() -> Self {
        Self::new(vec![
            WeaponProfile {
                kind: WeaponKind::BasicGun,
                damage: 12.0,
                projectile_speed: 40.0,
                gravity_affected: true,
                explosion_radius: 0.0,
                ammo: Ammo::Infinite,
                instant_use: false,
                effect: WeaponEffect::Direct,
                ai_priority: 0,
            },
            WeaponProfile {
                kind: WeaponKind::Rpg,
                damage: 28.0,
                projectile_speed: 30.0,
                gravity_affected: true,
                explosion_radius: 10.0,
                ammo: Ammo::Count(2),
                instant_use: false,
                effect: WeaponEffect::Radial { fuse: None },
                ai_priority: 3,
            },
            WeaponProfile {
                kind: WeaponKind::Grenade,
                damage: 35.0,
                projectile_speed: 20.0,
                gravity_affected: true,
                explosion_radius: 6.0,
                ammo: Ammo::Count(2),
                instant_use: false,
                effect: WeaponEffect::Radial { fuse: Some(3.0) },
                ai_priority: 2,
            },
            WeaponProfile {
                kind: WeaponKind::Laser,
                damage: 30.0,
                projectile_speed: 0.0,
                gravity_affected: false,
                explosion_radius: 0.0,
                ammo: Ammo::Count(1),
                instant_use: true,
                effect: WeaponEffect::Beam {
                    length: 80.0,
                    width: 1.5,
                    extend_speed: 120.0,
                    duration: 1.0,
                },
                ai_priority: 4,
            },
            WeaponProfile {
                kind: WeaponKind::Blackhole,
                damage: 0.0,
                projectile_speed: 18.0,
                gravity_affected: false,
                explosion_radius: 0.0,
                ammo: Ammo::Count(1),
                instant_use: true,
                effect: WeaponEffect::AreaPull {
                    range: 15.0,
                    max_force: 40.0,
                    max_velocity: 12.0,
                    duration: 3.0,
                    carve_rate: 4.0,
                    max_carve_radius: 9.0,
                    curve: FalloffCurve::Quadratic,
                },
                ai_priority: 5,
            },
        ])
    }
}
