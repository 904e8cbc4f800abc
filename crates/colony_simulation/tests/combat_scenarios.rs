//! Combat integration test
//!
//! Полный App (SimulationPlugin): hostile против игрока headless.
//!
//! Проверяем:
//! - Kill-then-freeze: убийца стоит на месте stand_down_duration
//! - Passive: не нападает первым, мстит после урона, остывает после aggro
//! - Territorial: игнорирует чужаков за пределами territory + margin

use bevy::prelude::*;
use colony_simulation::spawn::spawn_hostile;
use colony_simulation::*;

/// Helper: полный App с SimulationPlugin
fn create_combat_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.add_plugins(SimulationPlugin);
    app
}

/// Helper: неподвижный игрок (без контроллера)
fn spawn_player(app: &mut App, position: Vec3, hp: u32) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_translation(position),
            GroundHeight(position.y),
            Actor::new(Faction::Player),
            Health::new(hp),
        ))
        .id()
}

fn spawn_hostile_at(app: &mut App, position: Vec3, territory: Option<Territory>, mode: BehaviorMode) -> Entity {
    let config = app.world().resource::<SimulationConfig>().clone();
    let entity = spawn_hostile(&mut app.world_mut().commands(), position, territory, mode, &config);
    app.world_mut().flush();
    entity
}

fn state_of(app: &App, entity: Entity) -> CombatState {
    *app.world().get::<CombatAI>(entity).expect("CombatAI").state()
}

fn position_of(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).expect("Transform").translation
}

#[test]
fn test_kill_then_freeze() {
    let mut app = create_combat_app(42);

    let hostile = spawn_hostile_at(&mut app, Vec3::ZERO, None, BehaviorMode::Aggressive);
    let player = spawn_player(&mut app, Vec3::new(1.0, 0.0, 0.0), 10);

    // Ждём убийства и перехода в StandingDown
    let mut frozen_at = None;
    for _ in 0..300 {
        app.update();
        if matches!(state_of(&app, hostile), CombatState::StandingDown { .. }) {
            frozen_at = Some(position_of(&app, hostile));
            break;
        }
    }

    let frozen_at = frozen_at.expect("Hostile should kill the player and stand down");
    assert!(app.world().get::<Dead>(player).is_some(), "Player should be marked Dead");

    // Весь stand_down_duration: поза закреплена
    let stand_down = app.world().resource::<SimulationConfig>().combat.stand_down_duration;
    let stand_down_ticks = (stand_down * 60.0).round() as usize;
    for tick in 0..stand_down_ticks {
        app.update();
        if tick + 1 < stand_down_ticks {
            assert!(
                matches!(state_of(&app, hostile), CombatState::StandingDown { .. }),
                "Tick {}: should still stand down",
                tick
            );
        }
        assert!(
            position_of(&app, hostile).distance(frozen_at) < 1e-4,
            "Tick {}: hostile moved during stand down",
            tick
        );
    }

    // Потом: обратно в патруль, и рано или поздно пойдёт
    for _ in 0..3 {
        app.update();
    }
    assert_eq!(state_of(&app, hostile), CombatState::Wandering);

    let mut moved = false;
    for _ in 0..900 {
        app.update();
        if position_of(&app, hostile).distance(frozen_at) > 0.5 {
            moved = true;
            break;
        }
    }
    assert!(moved, "Hostile should resume wandering after stand down");
}

#[test]
fn test_passive_retaliates_then_calms_down() {
    let mut app = create_combat_app(7);

    let hostile = spawn_hostile_at(&mut app, Vec3::ZERO, None, BehaviorMode::Passive);
    let player = spawn_player(&mut app, Vec3::new(3.0, 0.0, 0.0), 150);

    // Игрок рядом, но passive не нападает первым
    for _ in 0..600 {
        app.update();
        assert!(
            app.world().get::<CombatAI>(hostile).expect("CombatAI").target().is_none(),
            "Passive hostile must not pick a fight"
        );
    }
    assert_eq!(app.world().get::<Health>(player).expect("Health").current, 150);

    // Игрок бьёт первым
    app.world_mut().send_event(DamageDealt {
        attacker: player,
        target: hostile,
        damage: 1,
    });
    for _ in 0..5 {
        app.update();
    }

    assert_eq!(
        app.world().get::<CombatAI>(hostile).expect("CombatAI").target(),
        Some(player),
        "Passive hostile should retaliate against its aggressor"
    );

    // aggro_memory_duration = 5s: через ~6.7s успокаивается
    for _ in 0..400 {
        app.update();
    }

    assert_eq!(state_of(&app, hostile), CombatState::Wandering);
    assert!(!app.world().get::<CombatAI>(hostile).expect("CombatAI").aggro().has_been_attacked());
    assert!(app.world().get::<Dead>(player).is_none(), "Player should survive a short retaliation");
}

#[test]
fn test_territorial_ignores_intruder_outside_margin() {
    let mut app = create_combat_app(3);

    let territory = Territory::new(Vec3::ZERO, 5.0, None).expect("valid territory");
    let hostile = spawn_hostile_at(&mut app, Vec3::ZERO, Some(territory), BehaviorMode::Territorial);

    // 9m от центра: в detection radius (10m от агента), но за outer + margin (7m)
    let player = spawn_player(&mut app, Vec3::new(9.0, 0.0, 0.0), 150);

    for _ in 0..600 {
        app.update();
        assert_ne!(
            app.world().get::<CombatAI>(hostile).expect("CombatAI").target(),
            Some(player),
            "Territorial hostile must ignore intruders outside its margin"
        );
    }
    assert_eq!(app.world().get::<Health>(player).expect("Health").current, 150);
}
