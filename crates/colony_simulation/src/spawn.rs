//! Spawn helpers: готовые бандлы агентов
//!
//! Высота спавна фиксируется в GroundHeight; per-agent конфиги берутся из SimulationConfig.

use bevy::prelude::*;

use crate::ai::{AllyFollower, BehaviorMode, CombatAI, Wanderer};
use crate::combat::Attacker;
use crate::components::{Actor, Faction, GroundHeight, Health, Leader, MovementSpeed};
use crate::config::SimulationConfig;
use crate::territory::{Territory, TerritoryBinding};

/// Hostile: Wanderer + CombatAI, опционально с территорией
pub fn spawn_hostile(
    commands: &mut Commands,
    position: Vec3,
    territory: Option<Territory>,
    mode: BehaviorMode,
    config: &SimulationConfig,
) -> Entity {
    let binding = territory.map(TerritoryBinding::bound).unwrap_or_default();

    commands
        .spawn((
            Transform::from_translation(position),
            GroundHeight(position.y),
            Actor::new(Faction::Hostile),
            Health::new(60),
            MovementSpeed { max_speed: 2.5 },
            Attacker::new(10, 1.0),
            Wanderer::default(),
            config.wander,
            CombatAI::new(mode),
            config.combat,
            config.avoidance,
            binding,
        ))
        .id()
}

/// Ally: следует за лидером в formation
pub fn spawn_ally(commands: &mut Commands, position: Vec3, config: &SimulationConfig) -> Entity {
    commands
        .spawn((
            Transform::from_translation(position),
            GroundHeight(position.y),
            Actor::new(Faction::Ally),
            Health::new(100),
            MovementSpeed { max_speed: 3.5 },
            AllyFollower::default(),
            config.follow,
            config.avoidance,
        ))
        .id()
}

/// Leader (игрок): движение задаётся извне через MotionIntent
pub fn spawn_leader(commands: &mut Commands, position: Vec3) -> Entity {
    commands
        .spawn((
            Transform::from_translation(position),
            GroundHeight(position.y),
            Actor::new(Faction::Player),
            Health::new(150),
            MovementSpeed { max_speed: 3.0 },
            Leader,
        ))
        .id()
}
