//! Colony Simulation Core
//!
//! Автономное поведение агентов колонии на Bevy 0.16 (headless ECS):
//! - Wanderer: патрулирование территории
//! - CombatAI: преследование, атака, leash к территории
//! - AllyFollower: formation за лидером
//! - Steering avoidance + territory containment (общая математика)
//!
//! Рендер, input, звук, UI: внешние слушатели событий (AnimationCue, AttackPerformed).

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod combat;
pub mod components;
pub mod config;
pub mod logger;
pub mod movement;
pub mod spatial;
pub mod spawn;
pub mod steering;
pub mod territory;

// Re-export базовых типов для удобства
pub use ai::{
    AIPlugin, AllyFollower, AllyRoster, BehaviorMode, CombatAI, CombatConfig, CombatState, FollowConfig, FollowMode,
    WanderConfig, WanderPhase, Wanderer,
};
pub use combat::{AttackPerformed, Attacker, CombatPlugin, DamageDealt, Dead, EntityDied};
pub use components::*;
pub use config::{ConfigError, SimulationConfig};
pub use logger::*;
pub use movement::{AnimationCue, AnimationCueKind, MotionIntent};
pub use spatial::{ProtectedZone, ProtectedZones, SpatialIndex, SpatialQuery, WorldBounds};
pub use steering::AvoidanceConfig;
pub use territory::{Territory, TerritoryBinding, TerritoryError};

/// Фазы симуляционного тика в FixedUpdate
///
/// Behaviour: решения контроллеров + actuation. Resolution: урон, смерть, aggro.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    Behaviour,
    Resolution,
}

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// Читает SimulationConfig если он уже вставлен, иначе использует Default.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = app.world().get_resource::<SimulationConfig>().cloned().unwrap_or_default();

        // Детерминистичный RNG: не перетираем уже вставленный (create_headless_app)
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(config.seed));
        }

        app
            // Fixed timestep для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(config.tick_hz))
            .insert_resource(config)
            // Подсистемы
            .add_plugins((AIPlugin, CombatPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Каждый app.update() продвигает время ровно на один fixed тик (60Hz).
/// Первый update только инициализирует часы.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(SimulationConfig { seed, ..Default::default() })
        .insert_resource(Time::<Fixed>::from_hz(60.0)) // 60Hz FixedUpdate
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)));

    app
}

/// Позиции всех акторов, отсортированные по Entity index (сравнение прогонов)
pub fn actor_positions(world: &mut World) -> Vec<(u32, Vec3)> {
    let mut query = world.query_filtered::<(Entity, &Transform), With<Actor>>();
    let mut positions: Vec<(u32, Vec3)> = query
        .iter(world)
        .map(|(entity, transform)| (entity.index(), transform.translation))
        .collect();
    positions.sort_by_key(|(index, _)| *index);
    positions
}
