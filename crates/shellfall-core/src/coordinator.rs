//! The match authority.
//!
//! `MatchCoordinator` owns the [`MatchContext`] and the [`TurnScheduler`] and
//! drives everything else from a fixed-step loop. Each [`MatchCoordinator::step`]
//! runs, in order:
//!
//! 1. **TURN**: tick the countdown; run the end-of-turn hook if it expired
//! 2. **AI**: advance the bot pipeline and carry out its action
//! 3. **WALK**: move a repositioning combatant along the ground
//! 4. **PHYSICS**: step the physics collaborator and resolve its impacts
//! 5. **EFFECTS**: extend beams and pull fields
//! 6. **TERRAIN**: flush batched carves; report deactivation
//! 7. **SYNC**: copy body positions into the arena; kill fallen bodies
//! 8. **PICKUPS**: hand out world items within reach
//! 9. **RULES**: end the turn of a dead owner, check for a winner, start the
//!    next turn
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use shellfall_core::config::MatchConfig;
//! use shellfall_core::coordinator::MatchCoordinator;
//! use shellfall_core::entity::CombatantSpec;
//!
//! let mut game = MatchCoordinator::with_heightmap(MatchConfig::default(), |_| 40.0).unwrap();
//! let alice = game.add_combatant(CombatantSpec::human("Alice", Vec2::new(40.0, 41.0))).unwrap();
//! game.add_combatant(CombatantSpec::human("Bob", Vec2::new(160.0, 41.0))).unwrap();
//! game.start().unwrap();
//!
//! assert_eq!(game.current_owner(), Some(alice));
//! game.advance(31.0);
//! assert_ne!(game.current_owner(), Some(alice));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crater::TerrainField;
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, trace, warn};

use crate::ai::{AiAction, AiController};
use crate::arena::Arena;
use crate::command::{CommandEnvelope, NetCommand};
use crate::config::MatchConfig;
use crate::context::MatchContext;
use crate::entity::{CombatantId, CombatantSpec};
use crate::error::{FireRejection, MatchError};
use crate::events::{MatchEvent, MatchObserver, SubscriptionId, TurnEndReason};
use crate::inventory::PickupResult;
use crate::items::{ItemEffect, WorldItem};
use crate::physics::{PhysicsWorld, SurfaceTag, FIXED_DT};
use crate::resolver::{CombatResolver, DamageResolver, EffectsResolver, FireRequest};
use crate::scheduler::{MatchOutcome, MatchPhase, TurnScheduler, TurnState};
use crate::weapon::WeaponKind;

/// Stream offset so the shuffle and the AI do not share random numbers.
const AI_SEED_OFFSET: u64 = 0x5EED_0A11;

#[derive(Debug, Clone, Copy)]
struct Walk {
    combatant: CombatantId,
    target_x: f32,
}

/// Runs one match.
#[derive(Debug)]
pub struct MatchCoordinator {
    ctx: MatchContext,
    scheduler: Option<TurnScheduler>,
    phase: MatchPhase,
    combat: CombatResolver,
    ai: AiController,
    walk: Option<Walk>,
    terrain_active: bool,
    elapsed: f32,
}

impl MatchCoordinator {
    /// Coordinator over an existing terrain field.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] if the config fails validation.
    pub fn new(config: MatchConfig, terrain: TerrainField) -> Result<Self, MatchError> {
        config.validate()?;
        let combat = CombatResolver::new(DamageResolver::new(config.combat.falloff));
        let ai = AiController::new(config.ai, config.seed.wrapping_add(AI_SEED_OFFSET));
        let terrain_active = terrain.is_active();
        Ok(Self {
            ctx: MatchContext::new(config, terrain),
            scheduler: None,
            phase: MatchPhase::LobbyDone,
            combat,
            ai,
            walk: None,
            terrain_active,
            elapsed: 0.0,
        })
    }

    /// Coordinator over ground solid up to `surface(x)`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] for an invalid config and
    /// [`MatchError::Terrain`] if the terrain cannot be built.
    pub fn with_heightmap(config: MatchConfig, surface: impl Fn(f32) -> f32) -> Result<Self, MatchError> {
        config.validate()?;
        let terrain = TerrainField::from_heightmap(config.terrain_config(), surface)?;
        Self::new(config, terrain)
    }

    /// Swap in a different physics collaborator.
    ///
    /// After the match started, living bodies are re-registered at their
    /// current positions.
    #[must_use]
    pub fn with_physics(mut self, physics: Box<dyn PhysicsWorld>) -> Self {
        self.ctx.physics = physics;
        if self.phase != MatchPhase::LobbyDone {
            let radius = self.ctx.config.world.body_radius;
            for combatant in self.ctx.arena.alive() {
                self.ctx.physics.add_body(combatant.id(), combatant.position(), radius);
            }
        }
        self
    }

    // =========================================================================
    // Lobby
    // =========================================================================

    /// Add a combatant before the match starts.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::RosterLocked`] once the match has started.
    pub fn add_combatant(&mut self, spec: CombatantSpec) -> Result<CombatantId, MatchError> {
        if self.phase != MatchPhase::LobbyDone {
            return Err(MatchError::RosterLocked);
        }
        let combat = &self.ctx.config.combat;
        let id = self
            .ctx
            .arena
            .spawn(spec, combat.max_health, &self.ctx.config.weapons, combat.inventory_slots);
        debug!(combatant = %id, "combatant joined");
        Ok(id)
    }

    /// Fix the turn order, place bodies on the ground and start the first turn.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::AlreadyStarted`] on a second call and
    /// [`MatchError::EmptyRoster`] without combatants.
    pub fn start(&mut self) -> Result<(), MatchError> {
        if self.phase != MatchPhase::LobbyDone {
            return Err(MatchError::AlreadyStarted);
        }
        let mut order: Vec<CombatantId> = self.ctx.arena.ids().collect();
        if self.ctx.config.shuffle_turn_order {
            let mut rng = ChaCha8Rng::seed_from_u64(self.ctx.config.seed);
            order.shuffle(&mut rng);
        }
        let scheduler = TurnScheduler::new(order, self.ctx.config.turn)?;

        let radius = self.ctx.config.world.body_radius;
        let ids: Vec<CombatantId> = self.ctx.arena.ids().collect();
        for id in ids {
            let Some(spawn) = self.ctx.arena.get(id).map(crate::entity::Combatant::position) else {
                continue;
            };
            let position = self.settle(spawn, radius);
            self.ctx.arena.set_position(id, position);
            self.ctx.physics.add_body(id, position, radius);
        }

        info!(
            combatants = self.ctx.arena.len(),
            order = ?scheduler.order(),
            seed = self.ctx.config.seed,
            "match started"
        );
        self.scheduler = Some(scheduler);
        self.phase = MatchPhase::Active;
        self.apply_rules();
        Ok(())
    }

    /// Drop a spawn point onto the first ground below it.
    ///
    /// A spawn inside solid terrain, or with nothing under it, is lifted to
    /// the column's surface instead.
    fn settle(&self, spawn: Vec2, radius: f32) -> Vec2 {
        let terrain = &self.ctx.terrain;
        let mapping = terrain.mapping();
        let depth = spawn.y - mapping.bounds().min.y;
        let ground = self
            .ctx
            .physics
            .raycast(terrain, spawn, Vec2::NEG_Y, depth)
            .filter(|hit| hit.surface == SurfaceTag::Terrain && hit.distance > 0.0)
            .and_then(|hit| mapping.cell_at(hit.point))
            .map(|cell| mapping.cell_center(cell).y + mapping.cell_size().y * 0.5)
            .or_else(|| terrain.surface_y(spawn.x));
        ground.map_or(spawn, |ground| Vec2::new(spawn.x, ground + radius))
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Run whole fixed steps covering `seconds`. Returns the steps run.
    pub fn advance(&mut self, seconds: f32) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (seconds.max(0.0) / FIXED_DT).round() as usize;
        let mut ran = 0;
        for _ in 0..steps {
            if self.phase != MatchPhase::Active {
                break;
            }
            self.step(FIXED_DT);
            ran += 1;
        }
        ran
    }

    /// Advance the match by one step of `dt` seconds.
    ///
    /// Does nothing unless the match is active.
    pub fn step(&mut self, dt: f32) {
        if self.phase != MatchPhase::Active || dt <= 0.0 {
            return;
        }
        self.elapsed += dt;

        // TURN
        let owner = self.current_owner();
        let expired = match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.tick(dt, &mut self.ctx.events),
            None => None,
        };
        if let (Some(reason), Some(owner)) = (expired, owner) {
            trace!(combatant = %owner, ?reason, "turn expired");
            self.on_turn_end(owner);
        }

        // AI
        if let Some(action) = self.ai.step(dt, &self.ctx) {
            self.perform_ai_action(action);
        }

        // WALK
        self.step_walk(dt);

        // PHYSICS
        let impacts = self.ctx.physics.step(dt, &self.ctx.terrain);
        for impact in &impacts {
            self.combat.resolve_impact(&mut self.ctx, impact);
        }

        // EFFECTS
        EffectsResolver::step(&mut self.ctx, dt);

        // TERRAIN
        self.ctx.terrain.tick(dt);
        self.check_terrain_state();

        // SYNC
        self.sync_positions();

        // PICKUPS
        self.collect_items();

        // RULES
        self.apply_rules();
    }

    fn perform_ai_action(&mut self, action: AiAction) {
        match action {
            AiAction::Walk { target_x } => {
                let Some(bot) = self.ai.bot() else {
                    return;
                };
                if !self.begin_walk(bot, target_x) {
                    self.ai.walk_finished();
                }
            }
            AiAction::Fire(request) => {
                if let Err(reason) = self.submit_fire(&request) {
                    warn!(bot = %request.shooter, %reason, "bot shot rejected; ending turn");
                    self.force_end_turn();
                }
            }
            AiAction::Abort(err) => {
                warn!(%err, "bot gave up its turn");
                self.force_end_turn();
            }
        }
    }

    fn force_end_turn(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.force_end_turn();
        }
    }

    fn on_turn_end(&mut self, owner: CombatantId) {
        self.walk = None;
        if let Some(combatant) = self.ctx.arena.get_mut(owner) {
            let dropped = combatant.inventory.prune_spent();
            if dropped > 0 {
                trace!(combatant = %owner, dropped, "spent weapons dropped");
            }
        }
        if self.ai.bot() == Some(owner) {
            self.ai.finish_turn(&self.ctx);
        }
    }

    fn begin_walk(&mut self, combatant: CombatantId, target_x: f32) -> bool {
        let bounds = self.ctx.config.world.bounds;
        let margin = self.ctx.config.world.body_radius;
        if target_x < bounds.min.x + margin || target_x > bounds.max.x - margin {
            debug!(combatant = %combatant, target_x, "walk target outside the world");
            return false;
        }
        if self.ctx.terrain.surface_y(target_x).is_none() {
            debug!(combatant = %combatant, target_x, "no ground at walk target");
            return false;
        }
        self.walk = Some(Walk { combatant, target_x });
        true
    }

    fn step_walk(&mut self, dt: f32) {
        let Some(walk) = self.walk else {
            return;
        };
        let id = walk.combatant;
        let Some(current) = self
            .ctx
            .physics
            .body_position(id)
            .or_else(|| self.ctx.arena.get(id).map(crate::entity::Combatant::position))
        else {
            self.finish_walk();
            return;
        };
        if !self.ctx.arena.is_alive(id) {
            self.finish_walk();
            return;
        }

        let dx = walk.target_x - current.x;
        let stride = self.ctx.config.world.walk_speed * dt;
        let arrived = dx.abs() <= stride;
        let x = if arrived { walk.target_x } else { current.x + stride * dx.signum() };
        let Some(ground) = self.ctx.terrain.surface_y(x) else {
            debug!(combatant = %id, x, "walk stopped at a gap");
            self.finish_walk();
            return;
        };
        let position = Vec2::new(x, ground + self.ctx.config.world.body_radius);
        self.ctx.physics.move_body(id, position);
        self.ctx.physics.set_body_velocity(id, Vec2::ZERO);
        self.ctx.arena.set_position(id, position);
        if arrived {
            self.finish_walk();
        }
    }

    fn finish_walk(&mut self) {
        if let Some(walk) = self.walk.take() {
            if self.ai.bot() == Some(walk.combatant) {
                self.ai.walk_finished();
            }
        }
    }

    fn check_terrain_state(&mut self) {
        let active = self.ctx.terrain.is_active();
        if self.terrain_active && !active {
            let solid_percent = self.ctx.terrain.stats().percent();
            warn!(solid_percent, "terrain deactivated");
            self.ctx.events.emit(MatchEvent::TerrainDeactivated { solid_percent });
        }
        self.terrain_active = active;
    }

    fn sync_positions(&mut self) {
        let kill_y = self.ctx.config.world.fall_threshold_y;
        let ids: Vec<CombatantId> = self.ctx.arena.alive().map(crate::entity::Combatant::id).collect();
        for id in ids {
            if let Some(position) = self.ctx.physics.body_position(id) {
                self.ctx.arena.set_position(id, position);
            }
            let fell = self.ctx.arena.get(id).is_some_and(|c| c.position().y < kill_y);
            if fell {
                DamageResolver::kill_by_fall(&mut self.ctx, id);
            }
        }
    }

    fn collect_items(&mut self) {
        if self.ctx.items.is_empty() {
            return;
        }
        let reach = self.ctx.config.combat.pickup_radius;
        let ids: Vec<CombatantId> = self.ctx.arena.alive().map(crate::entity::Combatant::id).collect();
        for id in ids {
            let Some(position) = self.ctx.arena.get(id).map(crate::entity::Combatant::position) else {
                continue;
            };
            for item_id in self.ctx.items.within(position, reach) {
                self.try_pickup(id, item_id);
            }
        }
    }

    fn try_pickup(&mut self, id: CombatantId, item_id: u64) {
        let Some(item) = self.ctx.items.iter().find(|(i, _)| *i == item_id).map(|(_, item)| item.clone()) else {
            return;
        };
        let Some(combatant) = self.ctx.arena.get_mut(id).filter(|c| c.is_alive()) else {
            return;
        };

        match item.effect {
            ItemEffect::GrantWeapon { kind, ammo } => {
                let Some(profile) = self.ctx.config.weapons.get(kind) else {
                    warn!(item = %item.name, weapon = %kind, "crate holds a weapon missing from the table; removing");
                    self.ctx.items.remove(item_id);
                    return;
                };
                if combatant.inventory.pickup(profile, ammo) == PickupResult::Full {
                    trace!(combatant = %id, item = %item.name, "inventory full");
                    return;
                }
                self.ctx.items.remove(item_id);
                self.log_pickup(id, &item);
            }
            ItemEffect::Heal { amount } => {
                let health = combatant.health();
                if health.current() >= health.max() {
                    return;
                }
                self.ctx.items.remove(item_id);
                self.log_pickup(id, &item);
                DamageResolver::apply_heal(&mut self.ctx, id, amount);
            }
        }
    }

    fn log_pickup(&mut self, id: CombatantId, item: &WorldItem) {
        debug!(combatant = %id, item = %item.name, "item collected");
        self.ctx.commands.push(NetCommand::ItemPickup {
            combatant: id,
            item_name: item.name.clone(),
            position: item.position,
        });
    }

    /// End a dead owner's turn, check the win condition, start the next turn.
    fn apply_rules(&mut self) {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };

        if let Some(owner) = scheduler.current_owner() {
            if !self.ctx.arena.is_alive(owner) && scheduler.state() != TurnState::MatchOver {
                debug!(combatant = %owner, "turn owner eliminated");
                self.ai.cancel();
                scheduler.end_turn(TurnEndReason::OwnerEliminated, &mut self.ctx.events);
                self.on_turn_end(owner);
            }
        }

        let Some(scheduler) = self.scheduler.as_mut() else {
            return;
        };
        if scheduler.check_win_condition(&self.ctx.arena, &mut self.ctx.events).is_some() {
            self.finish_match();
            return;
        }

        if scheduler.state() != TurnState::AwaitingStart {
            return;
        }
        match scheduler.start_turn(&self.ctx.arena, &mut self.ctx.events) {
            Ok(owner) => {
                self.ctx.commands.set_turn(scheduler.turn_number());
                if self.ctx.arena.get(owner).is_some_and(crate::entity::Combatant::is_bot) {
                    self.ai.begin_turn(owner);
                }
            }
            Err(MatchError::MatchOver) => self.finish_match(),
            Err(err) => {
                error!(%err, "cannot start the next turn; ending the match as a draw");
                scheduler.declare_outcome(MatchOutcome::Draw, &mut self.ctx.events);
                self.finish_match();
            }
        }
    }

    fn finish_match(&mut self) {
        self.ai.cancel();
        self.walk = None;
        self.phase = MatchPhase::Ended;
    }

    // =========================================================================
    // Player input
    // =========================================================================

    /// Fire on behalf of a combatant.
    ///
    /// A rejection changes nothing except that a `FireRejected` event is
    /// emitted.
    ///
    /// # Errors
    ///
    /// Returns the [`FireRejection`] explaining why the shot was refused.
    pub fn submit_fire(&mut self, request: &FireRequest) -> Result<(), FireRejection> {
        let result = match self.scheduler.as_mut() {
            Some(scheduler) => CombatResolver::submit_fire(&mut self.ctx, scheduler, request),
            None => Err(FireRejection::NoActiveTurn),
        };
        if let Err(reason) = result {
            debug!(combatant = %request.shooter, %reason, "fire rejected");
            self.ctx.events.emit(MatchEvent::FireRejected {
                combatant: request.shooter,
                reason,
            });
        }
        result
    }

    /// Select a weapon in a combatant's inventory. Returns `false` if not owned.
    pub fn select_weapon(&mut self, combatant: CombatantId, kind: WeaponKind) -> bool {
        self.ctx
            .arena
            .get_mut(combatant)
            .filter(|c| c.is_alive())
            .is_some_and(|c| c.inventory.select(kind))
    }

    /// Walk the turn owner to `target_x` before firing.
    ///
    /// Returns `false` if `combatant` does not own the running turn, already
    /// fired, or the destination is outside the world or has no ground.
    pub fn reposition(&mut self, combatant: CombatantId, target_x: f32) -> bool {
        let allowed = self.scheduler.as_ref().is_some_and(|s| {
            s.state() == TurnState::Active && s.current_owner() == Some(combatant) && !s.has_fired()
        });
        allowed && self.begin_walk(combatant, target_x)
    }

    /// Place an item in the world. Returns its id.
    pub fn spawn_item(&mut self, item: WorldItem) -> u64 {
        debug!(item = %item.name, position = ?item.position, "item spawned");
        self.ctx.items.spawn(item)
    }

    /// Change a combatant's colour and tell replicas.
    pub fn sync_color(&mut self, combatant: CombatantId, color_index: u8) -> bool {
        let Some(c) = self.ctx.arena.get_mut(combatant) else {
            return false;
        };
        c.set_color_index(color_index);
        self.ctx.commands.push(NetCommand::SyncColor { combatant, color_index });
        true
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Register an observer for match events.
    pub fn subscribe(&mut self, observer: impl MatchObserver + 'static) -> SubscriptionId {
        self.ctx.events.subscribe(observer)
    }

    /// Remove an observer. Returns `false` if unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.ctx.events.unsubscribe(id)
    }

    /// Drain the event history.
    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        self.ctx.events.take_events()
    }

    /// Commands not yet handed to the transport.
    pub fn take_commands(&mut self) -> Vec<CommandEnvelope> {
        self.ctx.commands.take_pending()
    }

    /// Shared match state.
    #[must_use]
    pub const fn context(&self) -> &MatchContext {
        &self.ctx
    }

    /// Roster.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.ctx.arena
    }

    /// Destructible ground.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainField {
        &self.ctx.terrain
    }

    /// Mutable ground, for flushing before a hash comparison.
    pub fn terrain_mut(&mut self) -> &mut TerrainField {
        &mut self.ctx.terrain
    }

    /// Turn scheduler, once the match has started.
    #[must_use]
    pub const fn scheduler(&self) -> Option<&TurnScheduler> {
        self.scheduler.as_ref()
    }

    /// Bot pipeline.
    #[must_use]
    pub const fn ai(&self) -> &AiController {
        &self.ai
    }

    /// Match lifecycle.
    #[must_use]
    pub const fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Seconds of match time simulated so far.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Winner or draw, once decided.
    #[must_use]
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.scheduler.as_ref().and_then(TurnScheduler::outcome)
    }

    /// Owner of the running turn.
    #[must_use]
    pub fn current_owner(&self) -> Option<CombatantId> {
        self.scheduler.as_ref().and_then(TurnScheduler::current_owner)
    }

    /// Hash of the state replicas must agree on.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        state_hash(&self.ctx.terrain, &self.ctx.arena)
    }
}

/// Terrain cells plus every combatant's health, liveness and ammo.
///
/// Positions are left out since replicas do not run physics. Spent slots are
/// skipped: the authority prunes them at turn end, replicas never do.
#[must_use]
pub fn state_hash(terrain: &TerrainField, arena: &Arena) -> u64 {
    let mut hasher = DefaultHasher::new();
    terrain.state_hash().hash(&mut hasher);
    for combatant in arena.iter() {
        combatant.id().hash(&mut hasher);
        combatant.health().current().to_bits().hash(&mut hasher);
        combatant.is_alive().hash(&mut hasher);
        combatant.color_index().hash(&mut hasher);
        for slot in combatant.inventory.slots().iter().filter(|s| s.ammo.has_ammo()) {
            slot.kind.hash(&mut hasher);
            match slot.ammo {
                crate::weapon::Ammo::Infinite => u32::MAX.hash(&mut hasher),
                crate::weapon::Ammo::Count(n) => n.hash(&mut hasher),
            }
        }
    }
    hasher.finish()
}
