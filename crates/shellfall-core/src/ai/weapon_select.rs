//! Weapon selection.

use serde::{Deserialize, Serialize};

use crate::inventory::Inventory;
use crate::weapon::{Ammo, WeaponEffect, WeaponKind, WeaponProfile};

/// How a bot picks a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeaponStrategy {
    /// Highest `ai_priority` that can fire
    #[default]
    Priority,
    /// Score each weapon against the current target
    Strategic,
}

/// Own health (hit points) at or below which a bot stops saving ammo.
const LOW_HEALTH: f32 = 35.0;

/// Distance at which splash gets its full bonus for forgiving aim.
const SPLASH_FULL_BONUS_DISTANCE: f32 = 60.0;

/// Pick a weapon from the inventory. Ties go to the earlier slot.
///
/// # Arguments
///
/// * `strategy` - Selection rule
/// * `inventory` - Bot's inventory
/// * `distance` - Distance to the target
/// * `own_health` - The bot's own current hit points
#[must_use]
pub fn select_weapon(strategy: WeaponStrategy, inventory: &Inventory, distance: f32, own_health: f32) -> Option<WeaponKind> {
    let mut best: Option<(f32, WeaponKind)> = None;
    for profile in inventory.slots().iter().filter(|w| w.ammo.has_ammo()) {
        let score = match strategy {
            WeaponStrategy::Priority => f32::from(profile.ai_priority),
            WeaponStrategy::Strategic => strategic_score(profile, distance, own_health),
        };
        match best {
            Some((top, _)) if score <= top => {}
            _ => best = Some((score, profile.kind)),
        }
    }
    best.map(|(_, kind)| kind)
}

/// Splash damage the shooter takes from its own blast at `distance`.
fn self_damage(profile: &WeaponProfile, distance: f32) -> f32 {
    if profile.explosion_radius <= 0.0 {
        return 0.0;
    }
    profile.damage * (1.0 - distance / profile.explosion_radius).clamp(0.0, 1.0)
}

/// Expected usefulness of a weapon from where the bot stands.
///
/// Splash gains value with distance; a beam past its reach scores zero. A
/// blast that would catch the shooter is discounted by the share of its own
/// health at stake, and scores zero if it would be fatal. Healthy bots hold
/// limited ammo back; wounded bots spend it.
fn strategic_score(profile: &WeaponProfile, distance: f32, own_health: f32) -> f32 {
    let mut score = match profile.effect {
        WeaponEffect::Direct => profile.damage,
        WeaponEffect::Radial { .. } => {
            let reach = (distance / SPLASH_FULL_BONUS_DISTANCE).clamp(0.0, 1.0);
            profile.damage + profile.explosion_radius * reach
        }
        WeaponEffect::Beam { length, .. } => {
            if distance > length {
                return 0.0;
            }
            profile.damage + 5.0
        }
        WeaponEffect::AreaPull { range, .. } => range * 0.5,
    };
    if matches!(profile.ammo, Ammo::Count(_)) {
        score *= if own_health <= LOW_HEALTH { 1.2 } else { 0.8 };
    }

    let risk = self_damage(profile, distance);
    if risk > 0.0 {
        if risk >= own_health {
            return 0.0;
        }
        score *= 1.0 - risk / own_health;
    }
    score + f32::from(profile.ai_priority) * 0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::WeaponTable;

    fn inventory(kinds: &[WeaponKind]) -> Inventory {
        let table = WeaponTable::default();
        let mut inventory = Inventory::starting(&table, 5);
        for &kind in kinds {
            inventory.pickup(table.get(kind).unwrap(), Ammo::Count(1));
        }
        inventory
    }

    #[test]
    fn priority_prefers_highest_value() {
        let inv = inventory(&[WeaponKind::Rpg, WeaponKind::Laser]);
        assert_eq!(select_weapon(WeaponStrategy::Priority, &inv, 20.0, 100.0), Some(WeaponKind::Laser));
    }

    #[test]
    fn empty_weapons_are_skipped() {
        let table = WeaponTable::default();
        let mut inv = Inventory::starting(&table, 5);
        inv.pickup(table.get(WeaponKind::Blackhole).unwrap(), Ammo::Count(0));
        assert_eq!(select_weapon(WeaponStrategy::Priority, &inv, 20.0, 100.0), Some(WeaponKind::BasicGun));
    }

    #[test]
    fn strategic_skips_out_of_reach_beam() {
        let inv = inventory(&[WeaponKind::Laser, WeaponKind::Rpg]);
        assert_eq!(select_weapon(WeaponStrategy::Strategic, &inv, 30.0, 100.0), Some(WeaponKind::Laser));
        assert_eq!(select_weapon(WeaponStrategy::Strategic, &inv, 120.0, 100.0), Some(WeaponKind::Rpg));
    }

    #[test]
    fn wounded_bot_avoids_close_splash() {
        // At 6 units an Rpg blast would cost the shooter 11.2 hit points.
        let inv = inventory(&[WeaponKind::Rpg]);
        assert_eq!(select_weapon(WeaponStrategy::Strategic, &inv, 6.0, 100.0), Some(WeaponKind::Rpg));
        assert_eq!(select_weapon(WeaponStrategy::Strategic, &inv, 6.0, 15.0), Some(WeaponKind::BasicGun));
        assert_eq!(select_weapon(WeaponStrategy::Strategic, &inv, 6.0, 10.0), Some(WeaponKind::BasicGun));
    }

    #[test]
    fn wounded_bot_spends_limited_ammo() {
        let table = WeaponTable::default();
        let grenade = table.get(WeaponKind::Grenade).unwrap();
        assert!(strategic_score(grenade, 40.0, 20.0) > strategic_score(grenade, 40.0, 100.0));
    }
}
