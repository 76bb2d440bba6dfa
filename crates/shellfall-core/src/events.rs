//! Match notifications.
//!
//! The [`EventBus`] is owned by the match context. External collaborators
//! (UI, spawners, audio) subscribe an observer and get every [`MatchEvent`]
//! synchronously, in emission order. The bus also keeps a history that can
//! be drained with [`EventBus::take_events`]; tests and replay tooling use it
//! instead of subscribing.
//!
//! Subscriptions live and die with the match: dropping the coordinator
//! drops every observer.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use shellfall_core::entity::CombatantId;
//! use shellfall_core::events::{EventBus, MatchEvent};
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//!
//! let mut bus = EventBus::new();
//! let sub = bus.subscribe(move |event: &MatchEvent| sink.borrow_mut().push(event.clone()));
//! bus.emit(MatchEvent::TurnStarted { combatant: CombatantId::new(1), turn: 1 });
//! bus.unsubscribe(sub);
//! bus.emit(MatchEvent::TurnTimeUpdate { remaining: 29 });
//!
//! assert_eq!(seen.borrow().len(), 1);
//! assert_eq!(bus.take_events().len(), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::CombatantId;
use crate::error::FireRejection;
use crate::scheduler::MatchOutcome;

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEndReason {
    /// The countdown ran out without an action
    Timeout,
    /// The owner fired and the grace window ran out
    Action,
    /// The owner was eliminated mid-turn
    OwnerEliminated,
    /// The match ended mid-turn
    MatchOver,
}

/// How a combatant was eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationCause {
    /// Health reached zero
    Damage,
    /// Fell below the world
    Fall,
}

/// Notification emitted by the match core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A combatant's turn began
    TurnStarted {
        /// Turn owner
        combatant: CombatantId,
        /// 1-based turn counter
        turn: u64,
    },
    /// A combatant's turn ended
    TurnEnded {
        /// Turn owner
        combatant: CombatantId,
        /// 1-based turn counter
        turn: u64,
        /// Why
        reason: TurnEndReason,
    },
    /// Whole seconds left in the turn changed
    TurnTimeUpdate {
        /// Seconds remaining, rounded up
        remaining: u32,
    },
    /// Health went up or down
    HealthChanged {
        /// Who
        combatant: CombatantId,
        /// New health as a percentage of max
        health_percent: f32,
    },
    /// A combatant left the match
    CombatantEliminated {
        /// Who
        combatant: CombatantId,
        /// How
        cause: EliminationCause,
    },
    /// The match is over
    MatchEnded {
        /// Winner or draw
        outcome: MatchOutcome,
    },
    /// A fire request was refused
    FireRejected {
        /// Who tried to fire
        combatant: CombatantId,
        /// Why it was refused
        reason: FireRejection,
    },
    /// The terrain body was switched off
    TerrainDeactivated {
        /// Solid percentage when it happened
        solid_percent: f32,
    },
}

/// Receiver of match notifications.
///
/// Any `FnMut(&MatchEvent)` closure is an observer.
pub trait MatchObserver {
    /// Called once per event, in emission order.
    fn on_event(&mut self, event: &MatchEvent);
}

impl<F: FnMut(&MatchEvent)> MatchObserver for F {
    fn on_event(&mut self, event: &MatchEvent) {
        self(event);
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Match-scoped observer registry plus drainable history.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Box<dyn MatchObserver>)>,
    history: Vec<MatchEvent>,
    next_subscription: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &format!("[{} observers]", self.observers.len()))
            .field("history", &self.history.len())
            .finish()
    }
}

impl EventBus {
    /// Creates a bus with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It receives events emitted from now on.
    pub fn subscribe(&mut self, observer: impl MatchObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver an event to every observer, then record it.
    pub fn emit(&mut self, event: MatchEvent) {
        for (_, observer) in &mut self.observers {
            observer.on_event(&event);
        }
        self.history.push(event);
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn history(&self) -> &[MatchEvent] {
        &self.history
    }

    /// Drain and return the recorded events.
    pub fn take_events(&mut self) -> Vec<MatchEvent> {
        std::mem::take(&mut self.history)
    }
}
