//! Integration tests for whole matches.
//!
//! These drive the coordinator the way a game loop would and check what
//! observers, replicas and the roster see:
//! - Explosive impacts (damage falloff, carving, grace window)
//! - Beams and pull fields
//! - Bot turns
//! - Fire rejections
//! - Terrain deactivation and draws

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::ai::{AiProfile, FairnessPolicy, RepositionSettings};
use crate::command::NetCommand;
use crate::config::MatchConfig;
use crate::coordinator::MatchCoordinator;
use crate::entity::CombatantSpec;
use crate::error::FireRejection;
use crate::events::{MatchEvent, TurnEndReason};
use crate::physics::FIXED_DT;
use crate::scheduler::{MatchOutcome, MatchPhase, TurnState};
use crate::weapon::WeaponKind;

use super::helpers::{add_humans, arm, flat_match, health, init_tracing, shot, ScriptedImpactPhysics, GROUND};

fn steady_bots() -> AiProfile {
    AiProfile {
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

// =============================================================================
// Explosions
// =============================================================================

#[test]
fn rpg_blast_four_combatants() {
    init_tracing();
    let config = MatchConfig::default();
    let impact = Vec2::new(97.0, GROUND + 1.0);
    let physics = ScriptedImpactPhysics::new(&config, [impact]);
    let mut game = flat_match(config, Some(Box::new(physics)));
    let ids = add_humans(&mut game, &[40.0, 100.0, 109.0, 170.0]);
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    game.subscribe(move |event: &MatchEvent| sink.borrow_mut().push(event.clone()));

    game.start().unwrap();
    arm(&mut game, a, WeaponKind::Rpg);
    game.submit_fire(&shot(a, WeaponKind::Rpg, Vec2::new(1.0, 0.5))).unwrap();
    game.step(FIXED_DT);

    // B at 3 m: 28 * (1 - 3/10); C at 12 m is outside the radius.
    assert!((health(&game, b) - 80.4).abs() < 1e-3, "B = {}", health(&game, b));
    assert!((health(&game, c) - 100.0).abs() < f32::EPSILON);
    assert!((health(&game, a) - 100.0).abs() < f32::EPSILON);
    assert!((health(&game, d) - 100.0).abs() < f32::EPSILON);

    let terrain = game.terrain();
    assert!(!terrain.is_solid_world(Vec2::new(97.0, 35.0)));
    assert!(!terrain.is_solid_world(Vec2::new(90.0, 39.0)));
    assert!(terrain.is_solid_world(Vec2::new(97.0, 30.0)));
    assert!(terrain.is_solid_world(Vec2::new(85.0, 39.0)));

    // The grace window ends A's turn.
    assert!(game.scheduler().unwrap().remaining() <= 3.0);
    game.advance(3.1);
    assert_ne!(game.current_owner(), Some(a));

    let events = seen.borrow();
    assert!(events.contains(&MatchEvent::TurnEnded {
        combatant: a,
        turn: 1,
        reason: TurnEndReason::Action,
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, MatchEvent::HealthChanged { combatant, .. } if *combatant == b)));
    assert!(!events
        .iter()
        .any(|e| matches!(e, MatchEvent::HealthChanged { combatant, .. } if *combatant == c)));

    let commands = game.take_commands();
    assert!(commands
        .iter()
        .any(|e| matches!(e.command, NetCommand::Fire { shooter, weapon: WeaponKind::Rpg, .. } if shooter == a)));
    assert!(commands
        .iter()
        .any(|e| matches!(e.command, NetCommand::CarveTerrain { radius, .. } if (radius - 10.0).abs() < f32::EPSILON)));
    assert!(commands
        .windows(2)
        .all(|pair| pair[1].sequence == pair[0].sequence + 1));
}

#[test]
fn blast_that_kills_everyone_is_a_draw() {
    init_tracing();
    let mut config = MatchConfig::default();
    config.combat.max_health = 20.0;
    let physics = ScriptedImpactPhysics::new(&config, [Vec2::new(100.0, GROUND + 1.0)]);
    let mut game = flat_match(config, Some(Box::new(physics)));
    let ids = add_humans(&mut game, &[98.0, 102.0]);
    let (a, b) = (ids[0], ids[1]);

    game.start().unwrap();
    arm(&mut game, a, WeaponKind::Rpg);
    game.submit_fire(&shot(a, WeaponKind::Rpg, Vec2::X)).unwrap();
    game.step(FIXED_DT);

    // Both stand 2 m from the blast: 28 * 0.8 = 22.4 against 20 hit points.
    assert!(!game.arena().is_alive(a));
    assert!(!game.arena().is_alive(b));
    assert_eq!(game.outcome(), Some(MatchOutcome::Draw));
    assert_eq!(game.phase(), MatchPhase::Ended);
}

#[test]
fn knockback_pushes_bodies_away() {
    let config = MatchConfig::default();
    let physics = ScriptedImpactPhysics::new(&config, [Vec2::new(97.0, GROUND + 1.0)]);
    let mut game = flat_match(config, Some(Box::new(physics)));
    let ids = add_humans(&mut game, &[40.0, 100.0]);
    game.start().unwrap();
    arm(&mut game, ids[0], WeaponKind::Rpg);
    game.submit_fire(&shot(ids[0], WeaponKind::Rpg, Vec2::X)).unwrap();
    game.advance(0.5);
    assert!(game.arena().get(ids[1]).unwrap().position().x > 100.0);
}

// =============================================================================
// Beams and pull fields
// =============================================================================

#[test]
fn laser_hits_once_and_is_dropped_at_turn_end() {
    let mut game = flat_match(MatchConfig::default(), None);
    let ids = add_humans(&mut game, &[40.0, 60.0, 150.0]);
    game.start().unwrap();
    arm(&mut game, ids[0], WeaponKind::Laser);

    game.submit_fire(&shot(ids[0], WeaponKind::Laser, Vec2::X)).unwrap();
    game.advance(1.5);
    assert!((health(&game, ids[1]) - 70.0).abs() < 1e-4);
    assert!((health(&game, ids[2]) - 100.0).abs() < f32::EPSILON);
    assert!((health(&game, ids[0]) - 100.0).abs() < f32::EPSILON);

    game.advance(2.0);
    assert_ne!(game.current_owner(), Some(ids[0]));
    assert!(game.arena().get(ids[0]).unwrap().inventory.find(WeaponKind::Laser).is_none());
}

#[test]
fn blackhole_pulls_and_carves() {
    let config = MatchConfig::default();
    let center = Vec2::new(100.0, GROUND + 1.0);
    let physics = ScriptedImpactPhysics::new(&config, [center]);
    let mut game = flat_match(config, Some(Box::new(physics)));
    let ids = add_humans(&mut game, &[40.0, 105.0]);
    game.start().unwrap();
    arm(&mut game, ids[0], WeaponKind::Blackhole);

    game.submit_fire(&shot(ids[0], WeaponKind::Blackhole, Vec2::X)).unwrap();
    game.advance(3.5);

    // B ends up in the crater, not blown out of range.
    let position = game.arena().get(ids[1]).unwrap().position();
    assert!(position.y < GROUND, "B at {position:?}");
    assert!(position.distance(center) < 15.0);
    assert!(!game.terrain().is_solid_world(Vec2::new(100.0, GROUND - 4.0)));
    assert!(game.context().effects.is_empty());
    assert!(game
        .take_commands()
        .iter()
        .any(|e| matches!(e.command, NetCommand::CarveRing { .. })));
}

// =============================================================================
// Bots
// =============================================================================

#[test]
fn bot_takes_its_turn() {
    init_tracing();
    let config = MatchConfig::default().with_turn_timing(5.0, 1.0).with_ai(steady_bots());
    let mut game = flat_match(config, None);
    let human = game
        .add_combatant(CombatantSpec::human("Human", Vec2::new(60.0, GROUND + 1.0)))
        .unwrap();
    let bot = game
        .add_combatant(CombatantSpec::bot("Bot", Vec2::new(90.0, GROUND + 1.0)))
        .unwrap();
    game.start().unwrap();

    game.advance(5.1);
    assert_eq!(game.current_owner(), Some(bot));
    game.advance(4.0);

    let events = game.take_events();
    assert!(events.contains(&MatchEvent::TurnEnded {
        combatant: human,
        turn: 1,
        reason: TurnEndReason::Timeout,
    }));
    assert!(events.contains(&MatchEvent::TurnEnded {
        combatant: bot,
        turn: 2,
        reason: TurnEndReason::Action,
    }));
    assert!(game
        .take_commands()
        .iter()
        .any(|e| matches!(e.command, NetCommand::Fire { shooter, .. } if shooter == bot)));
}

#[test]
fn bots_play_a_match_to_the_end() {
    let config = MatchConfig::default().with_seed(3).with_turn_timing(6.0, 1.0);
    let mut game = flat_match(config, None);
    game.add_combatant(CombatantSpec::bot("Left", Vec2::new(80.0, GROUND + 1.0)))
        .unwrap();
    game.add_combatant(CombatantSpec::bot("Right", Vec2::new(100.0, GROUND + 1.0)))
        .unwrap();
    game.start().unwrap();

    // Each turn is at most 6 s; BasicGun needs 9 hits to kill from full health.
    for _ in 0..60 {
        game.advance(6.0);
        if game.phase() == MatchPhase::Ended {
            break;
        }
    }
    let alive = game.arena().alive_count();
    assert!(alive <= 2);
    if game.phase() == MatchPhase::Ended {
        assert!(game.outcome().is_some());
        assert_eq!(game.scheduler().unwrap().state(), TurnState::MatchOver);
    }
    for combatant in game.arena().iter() {
        let health = combatant.health();
        assert!(health.current() >= 0.0 && health.current() <= health.max());
    }
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn rejections_leave_the_turn_alone() {
    let mut game = flat_match(MatchConfig::default(), None);
    let ids = add_humans(&mut game, &[40.0, 160.0]);
    let (a, b) = (ids[0], ids[1]);

    assert_eq!(
        game.submit_fire(&shot(a, WeaponKind::BasicGun, Vec2::X)),
        Err(FireRejection::NoActiveTurn)
    );
    game.start().unwrap();

    let cases = [
        (shot(b, WeaponKind::BasicGun, Vec2::X), FireRejection::NotYourTurn { shooter: b, owner: a }),
        (shot(a, WeaponKind::Laser, Vec2::X), FireRejection::WeaponNotOwned(WeaponKind::Laser)),
        (shot(a, WeaponKind::BasicGun, Vec2::ZERO), FireRejection::InvalidDirection),
        (
            shot(a, WeaponKind::BasicGun, Vec2::new(f32::NAN, 1.0)),
            FireRejection::InvalidDirection,
        ),
    ];
    for (request, expected) in cases {
        assert_eq!(game.submit_fire(&request), Err(expected));
    }
    let mut weak = shot(a, WeaponKind::BasicGun, Vec2::X);
    weak.power = 0.0;
    assert_eq!(game.submit_fire(&weak), Err(FireRejection::InvalidPower(0.0)));

    let scheduler = game.scheduler().unwrap();
    assert_eq!(scheduler.state(), TurnState::Active);
    assert!(!scheduler.has_fired());
    assert!((scheduler.remaining() - 30.0).abs() < f32::EPSILON);
    assert!(game.take_commands().is_empty());

    let rejected = game
        .take_events()
        .iter()
        .filter(|e| matches!(e, MatchEvent::FireRejected { .. }))
        .count();
    assert_eq!(rejected, 6);
}

#[test]
fn spent_weapon_is_out_of_ammo() {
    let mut game = flat_match(MatchConfig::default(), None);
    let ids = add_humans(&mut game, &[40.0, 160.0]);
    game.start().unwrap();
    arm(&mut game, ids[0], WeaponKind::Laser);
    game.submit_fire(&shot(ids[0], WeaponKind::Laser, Vec2::X)).unwrap();
    assert_eq!(
        game.submit_fire(&shot(ids[0], WeaponKind::Laser, Vec2::X)),
        Err(FireRejection::AlreadyFired(ids[0]))
    );
    assert!(!game.arena().get(ids[0]).unwrap().inventory.can_fire(WeaponKind::Laser));
}

// =============================================================================
// Terrain collapse
// =============================================================================

#[test]
fn thin_ground_collapses_into_a_draw() {
    init_tracing();
    let mut config = MatchConfig::default();
    config.terrain.min_solid_percent = 1.9;
    let physics = ScriptedImpactPhysics::new(&config, [Vec2::new(100.0, 2.0)]);
    let mut game = MatchCoordinator::with_heightmap(config, |_| 2.0)
        .unwrap()
        .with_physics(Box::new(physics));
    let a = game
        .add_combatant(CombatantSpec::human("A", Vec2::new(40.0, 3.0)))
        .unwrap();
    game.add_combatant(CombatantSpec::human("B", Vec2::new(160.0, 3.0)))
        .unwrap();
    game.start().unwrap();
    arm(&mut game, a, WeaponKind::Rpg);
    game.submit_fire(&shot(a, WeaponKind::Rpg, Vec2::X)).unwrap();
    game.advance(3.0);

    assert!(!game.terrain().is_active());
    assert_eq!(game.outcome(), Some(MatchOutcome::Draw));
    let events = game.take_events();
    let deactivated = events
        .iter()
        .position(|e| matches!(e, MatchEvent::TerrainDeactivated { .. }))
        .unwrap();
    let ended = events
        .iter()
        .position(|e| matches!(e, MatchEvent::MatchEnded { outcome: MatchOutcome::Draw }))
        .unwrap();
    assert!(deactivated < ended);
}
