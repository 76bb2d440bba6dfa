//! The authoritative turn state machine.
//!
//! ```text
//! AwaitingStart ──start_turn──▶ Active ──force_end_turn──▶ EndingByAction
//!       ▲                         │                              │
//!       │                     countdown 0                   grace runs out
//!       │                         ▼                              │
//!       └────────end_turn──── EndingByTimeout ◀──────────────────┘
//!
//! any state ──check_win_condition──▶ MatchOver (terminal)
//! ```
//!
//! The scheduler only decides whose turn it is and for how long. It reads the
//! arena to skip eliminated combatants and never mutates it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::arena::Arena;
use crate::config::TurnConfig;
use crate::entity::CombatantId;
use crate::error::MatchError;
use crate::events::{EventBus, MatchEvent, TurnEndReason};

/// Turn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Between turns
    AwaitingStart,
    /// Owner may act; countdown running
    Active,
    /// Owner fired; the grace window is running
    EndingByAction,
    /// Countdown reached zero
    EndingByTimeout,
    /// Terminal
    MatchOver,
}

/// Lifecycle of the whole match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Roster assembled, not started
    LobbyDone,
    /// Turns are running
    Active,
    /// Outcome decided
    Ended,
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// Exactly one combatant survived
    Winner(CombatantId),
    /// Nobody survived
    Draw,
}

/// Decides whose turn it is and when it ends.
///
/// # Invariants
///
/// - While a turn is running, [`TurnScheduler::current_owner`] is `Some`
/// - "Has fired" is reset only in [`TurnScheduler::start_turn`]
/// - [`TurnScheduler::force_end_turn`] never raises the remaining time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnScheduler {
    order: Vec<CombatantId>,
    cursor: Option<usize>,
    state: TurnState,
    config: TurnConfig,
    remaining: f32,
    last_whole_seconds: u32,
    has_fired: bool,
    force_ended: bool,
    turn_number: u64,
    outcome: Option<MatchOutcome>,
}

impl TurnScheduler {
    /// Scheduler over a fixed turn order.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::EmptyRoster`] if `order` is empty.
    pub fn new(order: Vec<CombatantId>, config: TurnConfig) -> Result<Self, MatchError> {
        if order.is_empty() {
            return Err(MatchError::EmptyRoster);
        }
        Ok(Self {
            order,
            cursor: None,
            state: TurnState::AwaitingStart,
            config,
            remaining: 0.0,
            last_whole_seconds: 0,
            has_fired: false,
            force_ended: false,
            turn_number: 0,
            outcome: None,
        })
    }

    /// Hand the turn to the next living combatant after the previous owner.
    ///
    /// Eliminated combatants are skipped without a `TurnStarted` event. If a
    /// turn is already running its owner is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::MatchOver`] after the match ended and
    /// [`MatchError::NoLivingCombatants`] if nobody in the order is alive.
    pub fn start_turn(&mut self, arena: &Arena, events: &mut EventBus) -> Result<CombatantId, MatchError> {
        match self.state {
            TurnState::MatchOver => return Err(MatchError::MatchOver),
            TurnState::AwaitingStart => {}
            _ => {
                if let Some(owner) = self.current_owner() {
                    return Ok(owner);
                }
            }
        }

        let len = self.order.len();
        let first = self.cursor.map_or(0, |i| (i + 1) % len);
        let index = (0..len)
            .map(|offset| (first + offset) % len)
            .find(|&i| {
                let alive = arena.is_alive(self.order[i]);
                if !alive {
                    trace!(combatant = %self.order[i], "skipping eliminated combatant");
                }
                alive
            })
            .ok_or(MatchError::NoLivingCombatants)?;

        let owner = self.order[index];
        self.cursor = Some(index);
        self.state = TurnState::Active;
        self.remaining = self.config.duration;
        self.last_whole_seconds = whole_seconds(self.remaining);
        self.has_fired = false;
        self.force_ended = false;
        self.turn_number += 1;

        info!(combatant = %owner, turn = self.turn_number, "turn started");
        events.emit(MatchEvent::TurnStarted {
            combatant: owner,
            turn: self.turn_number,
        });
        Ok(owner)
    }

    /// Advance the countdown. Ends the turn when it reaches zero.
    ///
    /// Emits `TurnTimeUpdate` whenever the whole-second value changes.
    /// Returns the end reason if the turn ended during this tick.
    pub fn tick(&mut self, dt: f32, events: &mut EventBus) -> Option<TurnEndReason> {
        if !self.turn_running() {
            return None;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        let whole = whole_seconds(self.remaining);
        if whole != self.last_whole_seconds {
            self.last_whole_seconds = whole;
            events.emit(MatchEvent::TurnTimeUpdate { remaining: whole });
        }
        if self.remaining > 0.0 {
            return None;
        }

        let reason = if self.state == TurnState::EndingByAction {
            TurnEndReason::Action
        } else {
            self.state = TurnState::EndingByTimeout;
            TurnEndReason::Timeout
        };
        self.end_turn(reason, events);
        Some(reason)
    }

    /// Shorten the turn to the grace window after the owner acted.
    ///
    /// Works once per turn and only while the turn is `Active`. Returns
    /// `false` if it had no effect.
    pub fn force_end_turn(&mut self) -> bool {
        if self.state != TurnState::Active || self.force_ended {
            return false;
        }
        self.force_ended = true;
        self.remaining = self.remaining.min(self.config.post_action_grace);
        self.state = TurnState::EndingByAction;
        debug!(remaining = self.remaining, "turn force-ended");
        true
    }

    /// Close the running turn and wait for the next `start_turn`.
    ///
    /// Returns the owner whose turn ended, or `None` if no turn was running.
    pub fn end_turn(&mut self, reason: TurnEndReason, events: &mut EventBus) -> Option<CombatantId> {
        let owner = self.current_owner()?;
        self.state = TurnState::AwaitingStart;
        info!(combatant = %owner, turn = self.turn_number, ?reason, "turn ended");
        events.emit(MatchEvent::TurnEnded {
            combatant: owner,
            turn: self.turn_number,
            reason,
        });
        Some(owner)
    }

    /// End the match if at most one combatant is alive.
    ///
    /// One survivor wins; none is a draw. A running turn is closed first.
    /// Returns the outcome once the match is over.
    pub fn check_win_condition(&mut self, arena: &Arena, events: &mut EventBus) -> Option<MatchOutcome> {
        if self.state == TurnState::MatchOver {
            return self.outcome;
        }
        let mut alive = arena.alive();
        let outcome = match (alive.next(), alive.next()) {
            (Some(_), Some(_)) => return None,
            (Some(winner), None) => MatchOutcome::Winner(winner.id()),
            (None, _) => MatchOutcome::Draw,
        };
        self.declare_outcome(outcome, events);
        Some(outcome)
    }

    /// Force the match to end with the given outcome.
    pub fn declare_outcome(&mut self, outcome: MatchOutcome, events: &mut EventBus) {
        if self.state == TurnState::MatchOver {
            return;
        }
        self.end_turn(TurnEndReason::MatchOver, events);
        self.state = TurnState::MatchOver;
        self.outcome = Some(outcome);
        info!(?outcome, turns = self.turn_number, "match over");
        events.emit(MatchEvent::MatchEnded { outcome });
    }

    /// Owner of the running turn.
    #[must_use]
    pub fn current_owner(&self) -> Option<CombatantId> {
        if self.turn_running() || self.state == TurnState::EndingByTimeout {
            self.cursor.map(|i| self.order[i])
        } else {
            None
        }
    }

    /// Record that the owner fired this turn.
    pub fn mark_fired(&mut self) {
        self.has_fired = true;
    }

    /// Whether the owner already fired this turn.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.has_fired
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Seconds left in the running turn.
    #[must_use]
    pub const fn remaining(&self) -> f32 {
        self.remaining
    }

    /// 1-based number of the latest turn; 0 before the first.
    #[must_use]
    pub const fn turn_number(&self) -> u64 {
        self.turn_number
    }

    /// Turn order fixed at match start.
    #[must_use]
    pub fn order(&self) -> &[CombatantId] {
        &self.order
    }

    /// Outcome once the match is over.
    #[must_use]
    pub const fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Turn timing in use.
    #[must_use]
    pub const fn config(&self) -> &TurnConfig {
        &self.config
    }

    fn turn_running(&self) -> bool {
        matches!(self.state, TurnState::Active | TurnState::EndingByAction)
    }
}

fn whole_seconds(remaining: f32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = remaining.max(0.0).ceil() as u32;
    whole
}
