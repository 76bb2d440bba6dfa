//! Target selection.

use std::cmp::Ordering;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::entity::CombatantId;

/// How a bot picks whom to shoot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetStrategy {
    /// Closest living opponent
    #[default]
    Nearest,
    /// Farthest living opponent
    Farthest,
    /// Opponent at the median distance
    MedianDistance,
    /// Opponent with the least health
    LowestHealth,
}

/// What the selector knows about a potential target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    /// Who
    pub id: CombatantId,
    /// Where
    pub position: Vec2,
    /// Distance from the bot
    pub distance: f32,
    /// Health percentage
    pub health_percent: f32,
    /// Controlled by the AI
    pub is_bot: bool,
}

/// Every living opponent of `bot`, in id order.
#[must_use]
pub fn candidates(arena: &Arena, bot: CombatantId, from: Vec2) -> Vec<TargetCandidate> {
    arena
        .alive()
        .filter(|c| c.id() != bot)
        .map(|c| TargetCandidate {
            id: c.id(),
            position: c.position(),
            distance: from.distance(c.position()),
            health_percent: c.health().percent(),
            is_bot: c.is_bot(),
        })
        .collect()
}

/// Pick a target. Ties go to the lower id.
#[must_use]
pub fn select_target(strategy: TargetStrategy, candidates: &[TargetCandidate]) -> Option<TargetCandidate> {
    let by_distance = |a: &&TargetCandidate, b: &&TargetCandidate| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id));
    match strategy {
        TargetStrategy::Nearest => candidates.iter().min_by(by_distance).copied(),
        TargetStrategy::Farthest => candidates
            .iter()
            .max_by(|a, b| a.distance.total_cmp(&b.distance).then(b.id.cmp(&a.id)))
            .copied(),
        TargetStrategy::MedianDistance => {
            let mut sorted: Vec<&TargetCandidate> = candidates.iter().collect();
            sorted.sort_by(by_distance);
            sorted.get(sorted.len().saturating_sub(1) / 2).copied().copied()
        }
        TargetStrategy::LowestHealth => candidates
            .iter()
            .min_by(|a, b| match a.health_percent.total_cmp(&b.health_percent) {
                Ordering::Equal => a.id.cmp(&b.id),
                other => other,
            })
            .copied(),
    }
}
