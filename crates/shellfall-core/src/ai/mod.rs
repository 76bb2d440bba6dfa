//! Bot decision pipeline.
//!
//! A bot turn is a stage machine stepped once per match step:
//!
//! 1. **Think**: wait, then pick a target and a weapon
//! 2. **Reposition** (optional): walk a random lateral offset, skipped if the
//!    destination is outside the world or has no ground
//! 3. **Aim**: compute the firing solution, wait, then fire
//!
//! Each stage returns at most one [`AiAction`] for the coordinator to carry
//! out. The pipeline checks its cancellation flag before every stage, so a
//! bot that dies mid-turn simply stops.
//!
//! The controller owns its own seeded RNG. Given the same seed and the same
//! sequence of match states, a bot makes the same decisions.

pub mod ballistics;
pub mod difficulty;
pub mod targeting;
pub mod weapon_select;

pub use difficulty::{AdaptiveAccuracy, AiProfile, Difficulty, FairnessPolicy, RepositionSettings};
pub use targeting::{TargetCandidate, TargetStrategy};
pub use weapon_select::WeaponStrategy;

use std::collections::BTreeMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::context::MatchContext;
use crate::entity::CombatantId;
use crate::error::AiError;
use crate::resolver::FireRequest;
use crate::weapon::WeaponKind;

use ballistics::FiringSolution;

/// Re-solves from the muzzle point implied by the previous aim.
const MUZZLE_PASSES: usize = 3;

/// Where the pipeline is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStage {
    /// No bot turn in progress
    Idle,
    /// Waiting before deciding
    Think,
    /// Walking; waiting for the coordinator to report arrival
    Reposition,
    /// Waiting before firing
    Aim,
    /// Fired, aborted or cancelled
    Done,
}

/// Something the coordinator should do for the bot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiAction {
    /// Walk horizontally to `target_x`
    Walk {
        /// Destination x
        target_x: f32,
    },
    /// Fire
    Fire(FireRequest),
    /// Give up on this turn
    Abort(AiError),
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    target: CombatantId,
    weapon: WeaponKind,
}

#[derive(Debug, Clone, Copy)]
struct PendingShot {
    bot: CombatantId,
    target: CombatantId,
    target_health: f32,
}

/// Runs bot turns.
#[derive(Debug, Clone)]
pub struct AiController {
    profile: AiProfile,
    rng: ChaCha8Rng,
    bot: Option<CombatantId>,
    stage: AiStage,
    timer: f32,
    cancelled: bool,
    plan: Option<Plan>,
    pending: Option<PendingShot>,
    accuracy: BTreeMap<CombatantId, f32>,
}

impl AiController {
    /// Controller with its own RNG stream derived from `seed`.
    #[must_use]
    pub fn new(profile: AiProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: ChaCha8Rng::seed_from_u64(seed),
            bot: None,
            stage: AiStage::Idle,
            timer: 0.0,
            cancelled: false,
            plan: None,
            pending: None,
            accuracy: BTreeMap::new(),
        }
    }

    /// Profile in use.
    #[must_use]
    pub const fn profile(&self) -> &AiProfile {
        &self.profile
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> AiStage {
        self.stage
    }

    /// Bot whose turn is running.
    #[must_use]
    pub const fn bot(&self) -> Option<CombatantId> {
        self.bot
    }

    /// Running accuracy of a bot (starts at the target accuracy).
    #[must_use]
    pub fn accuracy(&self, bot: CombatantId) -> f32 {
        self.accuracy
            .get(&bot)
            .copied()
            .unwrap_or(self.profile.adaptive.target_accuracy)
    }

    /// Start a bot turn.
    pub fn begin_turn(&mut self, bot: CombatantId) {
        let think = self.profile.think_time * self.profile.adaptive.think_scale(self.accuracy(bot));
        debug!(bot = %bot, think, "bot turn begins");
        self.bot = Some(bot);
        self.stage = AiStage::Think;
        self.timer = think;
        self.cancelled = false;
        self.plan = None;
    }

    /// Stop the pipeline; no further actions are produced this turn.
    pub fn cancel(&mut self) {
        if self.stage != AiStage::Idle && self.stage != AiStage::Done {
            debug!(bot = ?self.bot, stage = ?self.stage, "bot turn cancelled");
        }
        self.cancelled = true;
        self.stage = AiStage::Done;
    }

    /// The coordinator finished (or gave up) the requested walk.
    pub fn walk_finished(&mut self) {
        if self.stage == AiStage::Reposition && !self.cancelled {
            self.enter_aim();
        }
    }

    /// Advance the pipeline by `dt`.
    pub fn step(&mut self, dt: f32, ctx: &MatchContext) -> Option<AiAction> {
        if self.cancelled {
            return None;
        }
        let bot = self.bot?;
        match self.stage {
            AiStage::Idle | AiStage::Done => None,
            AiStage::Think => {
                self.timer -= dt;
                if self.timer > 0.0 {
                    return None;
                }
                self.decide(bot, ctx)
            }
            AiStage::Reposition => {
                self.timer -= dt;
                if self.timer <= 0.0 {
                    trace!(bot = %bot, "reposition timed out");
                    self.enter_aim();
                }
                None
            }
            AiStage::Aim => {
                self.timer -= dt;
                if self.timer > 0.0 {
                    return None;
                }
                self.stage = AiStage::Done;
                Some(self.fire(bot, ctx))
            }
        }
    }

    /// Fold the result of the bot's shot into its running accuracy.
    ///
    /// Called at turn end. A shot counts as a hit if the chosen target lost
    /// health. Turns without a shot leave the accuracy unchanged.
    pub fn finish_turn(&mut self, ctx: &MatchContext) {
        if let Some(shot) = self.pending.take() {
            let health_now = ctx.arena.get(shot.target).map_or(0.0, |c| c.health().current());
            let hit = health_now < shot.target_health;
            let updated = self.profile.adaptive.update(self.accuracy(shot.bot), hit);
            debug!(bot = %shot.bot, hit, accuracy = updated, "bot accuracy updated");
            self.accuracy.insert(shot.bot, updated);
        }
        self.bot = None;
        self.stage = AiStage::Idle;
        self.plan = None;
    }

    fn decide(&mut self, bot: CombatantId, ctx: &MatchContext) -> Option<AiAction> {
        let Some(me) = ctx.arena.get(bot).filter(|c| c.is_alive()) else {
            self.stage = AiStage::Done;
            return Some(AiAction::Abort(AiError::BotUnavailable(bot)));
        };
        let pool = targeting::candidates(&ctx.arena, bot, me.position());
        let Some(target) = targeting::select_target(self.profile.target_strategy, &pool) else {
            self.stage = AiStage::Done;
            return Some(AiAction::Abort(AiError::NoTarget(bot)));
        };
        let own_health = me.health().current();
        let Some(weapon) =
            weapon_select::select_weapon(self.profile.weapon_strategy, &me.inventory, target.distance, own_health)
        else {
            self.stage = AiStage::Done;
            return Some(AiAction::Abort(AiError::NoWeapon(bot)));
        };
        debug!(bot = %bot, target = %target.id, weapon = %weapon, "bot decided");
        self.plan = Some(Plan {
            target: target.id,
            weapon,
        });

        if let Some(target_x) = self.pick_reposition(me.position(), ctx) {
            self.stage = AiStage::Reposition;
            self.timer = self.profile.reposition.timeout;
            return Some(AiAction::Walk { target_x });
        }
        self.enter_aim();
        None
    }

    fn pick_reposition(&mut self, position: Vec2, ctx: &MatchContext) -> Option<f32> {
        let settings = self.profile.reposition;
        if settings.max_offset <= 0.0 || self.rng.gen::<f32>() >= settings.chance {
            return None;
        }
        let target_x = position.x + self.rng.gen_range(-settings.max_offset..=settings.max_offset);
        let bounds = ctx.config.world.bounds;
        let margin = ctx.config.world.body_radius;
        if target_x < bounds.min.x + margin || target_x > bounds.max.x - margin {
            trace!(target_x, "reposition would cross the world edge");
            return None;
        }
        if ctx.terrain.surface_y(target_x).is_none() {
            trace!(target_x, "no ground at reposition target");
            return None;
        }
        Some(target_x)
    }

    fn enter_aim(&mut self) {
        self.stage = AiStage::Aim;
        self.timer = self.profile.aim_time;
    }

    fn fire(&mut self, bot: CombatantId, ctx: &MatchContext) -> AiAction {
        let Some(plan) = self.plan else {
            return AiAction::Abort(AiError::NoWeapon(bot));
        };
        let (Some(me), Some(target)) = (
            ctx.arena.get(bot).filter(|c| c.is_alive()),
            ctx.arena.get(plan.target).filter(|c| c.is_alive()),
        ) else {
            return AiAction::Abort(AiError::NoTarget(bot));
        };
        let Some(profile) = me.inventory.find(plan.weapon) else {
            return AiAction::Abort(AiError::NoWeapon(bot));
        };

        let mut error = self.profile.aim_error_deg * self.profile.adaptive.error_scale(self.accuracy(bot));
        let fairness = self.profile.fairness;
        if fairness.enabled
            && !target.is_bot()
            && target.health().percent() <= fairness.critical_health_percent
            && self.rng.gen::<f32>() < fairness.probability
        {
            trace!(bot = %bot, target = %plan.target, "fairness error applied");
            error += fairness.extra_error_deg;
        }
        let offset = if error > 0.0 { self.rng.gen_range(-error..=error) } else { 0.0 };

        let position = me.position();
        let aim_point = target.position();
        let (direction, power) = if profile.gravity_affected {
            let base_power = self.profile.base_power;
            let solve_from =
                |origin: Vec2| ballistics::solve(origin, aim_point, ctx.config.world.gravity, profile.projectile_speed, base_power);
            // The muzzle sits along the aim, so re-solve from where the last aim puts it.
            let mut solution: FiringSolution = solve_from(position);
            for _ in 0..MUZZLE_PASSES {
                solution = solve_from(position + solution.direction() * ctx.config.combat.muzzle_offset);
            }
            let solution = solution.with_error(offset);
            (solution.direction(), solution.power)
        } else {
            // Straight shots leave along the line, so the muzzle never bends the aim.
            let straight = ballistics::direct_aim(position, aim_point).unwrap_or(Vec2::X);
            (ballistics::rotate_deg(straight, offset), 1.0)
        };

        self.pending = Some(PendingShot {
            bot,
            target: plan.target,
            target_health: target.health().current(),
        });
        AiAction::Fire(FireRequest {
            shooter: bot,
            weapon: plan.weapon,
            direction,
            power,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::entity::CombatantSpec;
    use crate::physics::FIXED_DT;
    use crater::TerrainField;

    fn quiet_profile() -> AiProfile {
        AiProfile {
            think_time: 0.5,
            aim_time: 0.5,
            aim_error_deg: 0.0,
            reposition: RepositionSettings {
                chance: 0.0,
                ..RepositionSettings::default()
            },
            fairness: FairnessPolicy {
                enabled: false,
                ..FairnessPolicy::default()
            },
            ..AiProfile::default()
        }
    }

    fn context(specs: Vec<CombatantSpec>) -> (MatchContext, Vec<CombatantId>) {
        let config = MatchConfig::default();
        let terrain = TerrainField::from_heightmap(config.terrain_config(), |_| 40.0).unwrap();
        let mut ctx = MatchContext::new(config, terrain);
        let weapons = ctx.config.weapons.clone();
        let ids = specs
            .into_iter()
            .map(|spec| ctx.arena.spawn(spec, 100.0, &weapons, 5))
            .collect();
        (ctx, ids)
    }

    fn run(ai: &mut AiController, ctx: &MatchContext, seconds: f32) -> Vec<AiAction> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (seconds / FIXED_DT).ceil() as usize;
        (0..steps).filter_map(|_| ai.step(FIXED_DT, ctx)).collect()
    }

    #[test]
    fn fires_once_after_think_and_aim() {
        let (ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(50.0, 41.0)),
            CombatantSpec::human("Near", Vec2::new(80.0, 41.0)),
            CombatantSpec::human("Far", Vec2::new(150.0, 41.0)),
        ]);
        let mut ai = AiController::new(quiet_profile(), 7);
        ai.begin_turn(ids[0]);

        assert!(run(&mut ai, &ctx, 0.9).is_empty());
        let actions = run(&mut ai, &ctx, 1.0);
        assert_eq!(actions.len(), 1);
        let AiAction::Fire(request) = actions[0] else {
            panic!("expected fire, got {:?}", actions[0]);
        };
        assert_eq!(request.shooter, ids[0]);
        assert_eq!(request.weapon, WeaponKind::BasicGun);
        assert!(request.direction.x > 0.0);
        assert_eq!(ai.stage(), AiStage::Done);
    }

    #[test]
    fn lob_leaves_the_muzzle_on_a_path_through_the_target() {
        let target = Vec2::new(62.0, 41.0);
        let (ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(50.0, 41.0)),
            CombatantSpec::human("Target", target),
        ]);
        let mut ai = AiController::new(quiet_profile(), 5);
        ai.begin_turn(ids[0]);
        let actions = run(&mut ai, &ctx, 2.0);
        let AiAction::Fire(request) = actions[0] else {
            panic!("expected fire, got {actions:?}");
        };

        let gun = ctx.config.weapons.get(WeaponKind::BasicGun).unwrap();
        let muzzle = Vec2::new(50.0, 41.0) + request.direction * ctx.config.combat.muzzle_offset;
        let velocity = request.direction * gun.projectile_speed * request.power;
        let t = (target.x - muzzle.x) / velocity.x;
        let y = muzzle.y + velocity.y * t - 0.5 * ctx.config.world.gravity * t * t;
        assert!((y - target.y).abs() < 0.25, "passes at y = {y}");
    }

    #[test]
    fn straight_weapon_aims_along_the_line() {
        let (mut ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(50.0, 41.0)),
            CombatantSpec::human("Target", Vec2::new(20.0, 41.0)),
        ]);
        let mut weapons = ctx.config.weapons.clone();
        let mut gun = weapons.get(WeaponKind::BasicGun).unwrap().clone();
        gun.gravity_affected = false;
        weapons.set(gun);
        ctx.config.weapons = weapons.clone();
        let bot = ctx.arena.get_mut(ids[0]).unwrap();
        bot.inventory = crate::inventory::Inventory::starting(&weapons, 5);

        let mut ai = AiController::new(quiet_profile(), 1);
        ai.begin_turn(ids[0]);
        let actions = run(&mut ai, &ctx, 2.0);
        let AiAction::Fire(request) = actions[0] else {
            panic!("expected fire");
        };
        assert!((request.direction - Vec2::new(-1.0, 0.0)).length() < 1e-5);
        assert_eq!(request.power, 1.0);
    }

    #[test]
    fn no_target_aborts() {
        let (ctx, ids) = context(vec![CombatantSpec::bot("Alone", Vec2::new(50.0, 41.0))]);
        let mut ai = AiController::new(quiet_profile(), 1);
        ai.begin_turn(ids[0]);
        assert_eq!(run(&mut ai, &ctx, 2.0), vec![AiAction::Abort(AiError::NoTarget(ids[0]))]);
    }

    #[test]
    fn cancel_stops_everything() {
        let (ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(50.0, 41.0)),
            CombatantSpec::human("Target", Vec2::new(80.0, 41.0)),
        ]);
        let mut ai = AiController::new(quiet_profile(), 1);
        ai.begin_turn(ids[0]);
        run(&mut ai, &ctx, 0.2);
        ai.cancel();
        assert!(run(&mut ai, &ctx, 5.0).is_empty());
    }

    #[test]
    fn reposition_requests_walk_then_fires() {
        let (ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(100.0, 41.0)),
            CombatantSpec::human("Target", Vec2::new(140.0, 41.0)),
        ]);
        let profile = AiProfile {
            reposition: RepositionSettings {
                chance: 1.0,
                max_offset: 5.0,
                timeout: 3.0,
            },
            ..quiet_profile()
        };
        let mut ai = AiController::new(profile, 3);
        ai.begin_turn(ids[0]);
        let actions = run(&mut ai, &ctx, 0.6);
        let [AiAction::Walk { target_x }] = actions[..] else {
            panic!("expected walk, got {actions:?}");
        };
        assert!((95.0..=105.0).contains(&target_x));
        assert_eq!(ai.stage(), AiStage::Reposition);

        ai.walk_finished();
        let actions = run(&mut ai, &ctx, 1.0);
        assert!(matches!(actions[..], [AiAction::Fire(_)]));
    }

    #[test]
    fn same_seed_same_decisions() {
        let (ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(100.0, 41.0)),
            CombatantSpec::human("Target", Vec2::new(140.0, 41.0)),
        ]);
        let profile = AiProfile {
            aim_error_deg: 10.0,
            ..AiProfile::default()
        };
        let mut a = AiController::new(profile, 99);
        let mut b = AiController::new(profile, 99);
        a.begin_turn(ids[0]);
        b.begin_turn(ids[0]);
        let mut actions_a = run(&mut a, &ctx, 3.0);
        let mut actions_b = run(&mut b, &ctx, 3.0);
        a.walk_finished();
        b.walk_finished();
        actions_a.extend(run(&mut a, &ctx, 6.0));
        actions_b.extend(run(&mut b, &ctx, 6.0));
        assert_eq!(actions_a, actions_b);
        assert!(!actions_a.is_empty());
    }

    #[test]
    fn accuracy_tracks_hits() {
        let (mut ctx, ids) = context(vec![
            CombatantSpec::bot("Bot", Vec2::new(50.0, 41.0)),
            CombatantSpec::human("Target", Vec2::new(80.0, 41.0)),
        ]);
        let mut ai = AiController::new(quiet_profile(), 1);
        let start = ai.accuracy(ids[0]);

        ai.begin_turn(ids[0]);
        run(&mut ai, &ctx, 2.0);
        ctx.arena.get_mut(ids[1]).unwrap().health_mut().damage(10.0);
        ai.finish_turn(&ctx);
        assert!(ai.accuracy(ids[0]) > start);

        ai.begin_turn(ids[0]);
        run(&mut ai, &ctx, 2.0);
        ai.finish_turn(&ctx);
        assert!(ai.accuracy(ids[0]) < start + 0.15);
        assert_eq!(ai.stage(), AiStage::Idle);
    }
}
