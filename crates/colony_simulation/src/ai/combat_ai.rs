//! CombatAI: преследование, атака и привязка к территории (hostile)
//!
//! Wandering → Chasing → Attacking → StandingDown → Wandering,
//! ReturningToTerritory вытесняет Chasing при выходе за жёсткий leash.
//!
//! Пока CombatAI в Wandering, движением управляет Wanderer.
//! Любое другое состояние подвешивает Wanderer (suspend) и пишет свой intent.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggro::AggroMemory;
use super::wandering::Wanderer;
use crate::components::{flatten, horizontal_distance, Faction};
use crate::movement::MotionIntent;
use crate::spatial::{AgentSnapshot, ProtectedZones, SpatialQuery};
use crate::territory::{distance_from_center, is_within_margin, safe_interior_point, Territory};

/// Поведение при обнаружении цели
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum BehaviorMode {
    /// Атакует любую замеченную цель
    #[default]
    Aggressive,
    /// Атакует только пока помнит, что его ударили
    Passive,
    /// Атакует только цели внутри территории (+ margin)
    Territorial,
}

/// Состояние CombatAI (ровно одно активно)
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum CombatState {
    /// Нет цели, движением управляет Wanderer
    #[default]
    Wandering,
    /// Бежим к цели
    Chasing { target: Entity },
    /// Цель в радиусе атаки: стоим, смотрим, бьём по кулдауну
    Attacking { target: Entity },
    /// Убили цель: поза зафиксирована на stand_down_duration
    StandingDown {
        remaining: f32,
        position: Vec3,
        rotation: Quat,
    },
    /// Ушли слишком далеко: прямой путь к безопасной точке территории
    ReturningToTerritory { destination: Vec3, start_distance: f32 },
}

/// Параметры боя (per agent)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct CombatConfig {
    /// Радиус обнаружения целей (метры)
    pub detection_radius: f32,
    /// Дистанция перехода в Attacking
    pub min_attack_distance: f32,
    /// Выход из Attacking при distance > min_attack_distance · factor
    pub attack_exit_factor: f32,
    /// Доля max_speed при преследовании и возврате
    pub chase_speed_fraction: f32,
    /// Скорость поворота к цели (рад/сек)
    pub chase_turn_rate: f32,
    /// Сколько секунд помним агрессора
    pub aggro_memory_duration: f32,
    /// Мягкий leash: сверх outer, после которого бросаем далёкую цель
    pub return_buffer: f32,
    /// Цель дальше outer + max_extra_distance считается ушедшей
    pub max_extra_distance: f32,
    /// Жёсткий leash: сверх outer → ReturningToTerritory
    pub max_distance_from_territory: f32,
    /// Доля обратного пути, после которой возврат завершён
    pub return_complete_fraction: f32,
    /// Territorial: допуск цели за outer radius
    pub territorial_margin: f32,
    /// Длительность freeze после убийства (секунды)
    pub stand_down_duration: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            detection_radius: 10.0,
            min_attack_distance: 1.5,
            attack_exit_factor: 1.2,
            chase_speed_fraction: 1.0,
            chase_turn_rate: 8.0,
            aggro_memory_duration: 5.0,
            return_buffer: 2.0,
            max_extra_distance: 4.0,
            max_distance_from_territory: 8.0,
            return_complete_fraction: 0.75,
            territorial_margin: 2.0,
            stand_down_duration: 3.0,
        }
    }
}

/// Снимок агента и окружения для одного тика CombatAI
#[derive(Debug, Clone, Copy)]
pub struct CombatContext<'a> {
    pub entity: Entity,
    pub faction: Faction,
    pub position: Vec3,
    pub rotation: Quat,
    pub territory: Option<&'a Territory>,
    /// Симуляционное время (секунды)
    pub now: f64,
    pub delta: f32,
}

/// Результат тика
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CombatDecision {
    /// None: движением управляет Wanderer
    pub intent: Option<MotionIntent>,
    /// Цель для удара в этом тике (кулдаун проверяет Attacker)
    pub attack: Option<Entity>,
}

impl CombatDecision {
    fn drive(intent: MotionIntent) -> Self {
        Self { intent: Some(intent), attack: None }
    }
}

/// Component: состояние CombatAI
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(CombatConfig, Wanderer)]
pub struct CombatAI {
    state: CombatState,
    mode: BehaviorMode,
    aggro: AggroMemory,
}

impl CombatAI {
    pub fn new(mode: BehaviorMode) -> Self {
        Self { mode, ..Default::default() }
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn mode(&self) -> BehaviorMode {
        self.mode
    }

    /// Сменить режим (действует со следующего тика)
    pub fn set_mode(&mut self, mode: BehaviorMode) {
        if self.mode != mode {
            crate::log(&format!("CombatAI: mode {:?} → {:?}", self.mode, mode));
            self.mode = mode;
        }
    }

    pub fn aggro(&self) -> &AggroMemory {
        &self.aggro
    }

    /// Нас ударили: запомнить агрессора
    pub fn trigger_aggro(&mut self, aggressor: Entity, now: f64) {
        self.aggro.record_damage(aggressor, now);
    }

    /// Забыть агрессора (погиб или despawned)
    pub fn forget(&mut self, entity: Entity) {
        self.aggro.forget(entity);
    }

    /// Текущая цель (Chasing/Attacking)
    pub fn target(&self) -> Option<Entity> {
        match self.state {
            CombatState::Chasing { target } | CombatState::Attacking { target } => Some(target),
            _ => None,
        }
    }

    /// true если движением управляет CombatAI, а не Wanderer
    pub fn controls_motion(&self) -> bool {
        !matches!(self.state, CombatState::Wandering)
    }

    /// Продвинуть FSM на один тик
    pub fn tick(
        &mut self,
        ctx: &CombatContext,
        config: &CombatConfig,
        wanderer: &mut Wanderer,
        spatial: &dyn SpatialQuery,
        zones: &ProtectedZones,
    ) -> CombatDecision {
        let aggro_expired = self.aggro.expire(ctx.now, config.aggro_memory_duration);

        match self.state {
            CombatState::StandingDown { remaining, position, rotation } => {
                let remaining = remaining - ctx.delta;
                if remaining <= 0.0 {
                    crate::log(&format!("CombatAI {:?}: stand down complete", ctx.entity));
                    self.resume_wandering(wanderer, None);
                    return CombatDecision::default();
                }
                self.state = CombatState::StandingDown { remaining, position, rotation };
                CombatDecision::drive(MotionIntent::pinned_at(position, rotation))
            }

            CombatState::ReturningToTerritory { destination, start_distance } => {
                let to_destination = flatten(destination - ctx.position);
                let remaining = to_destination.length();
                let complete = remaining <= start_distance * (1.0 - config.return_complete_fraction);

                if complete || remaining <= f32::EPSILON {
                    crate::log(&format!("CombatAI {:?}: back in territory", ctx.entity));
                    self.aggro.clear();
                    self.resume_wandering(wanderer, None);
                    return CombatDecision::default();
                }

                wanderer.suspend();
                CombatDecision::drive(MotionIntent::travel(
                    to_destination,
                    config.chase_speed_fraction,
                    config.chase_turn_rate,
                ))
            }

            CombatState::Wandering => {
                let Some(target) = self.acquire_target(ctx, config, spatial, zones) else {
                    return CombatDecision::default();
                };
                crate::log(&format!(
                    "CombatAI {:?}: acquired {:?} ({:?})",
                    ctx.entity, target.entity, self.mode
                ));
                self.state = CombatState::Chasing { target: target.entity };
                wanderer.suspend();
                self.engage(ctx, config, wanderer, target)
            }

            CombatState::Chasing { target } | CombatState::Attacking { target } => {
                if aggro_expired && self.mode == BehaviorMode::Passive {
                    crate::log(&format!("CombatAI {:?}: aggro expired, calming down", ctx.entity));
                    self.resume_wandering(wanderer, None);
                    return CombatDecision::default();
                }

                let Some(snapshot) = spatial.agent(target) else {
                    crate::log(&format!("CombatAI {:?}: target {:?} gone", ctx.entity, target));
                    self.aggro.forget(target);
                    self.resume_wandering(wanderer, None);
                    return CombatDecision::default();
                };

                // Kill-then-freeze
                if !snapshot.is_alive() {
                    crate::log_info(&format!(
                        "CombatAI {:?}: target {:?} down, standing down",
                        ctx.entity, target
                    ));
                    self.aggro.forget(target);
                    self.state = CombatState::StandingDown {
                        remaining: config.stand_down_duration,
                        position: ctx.position,
                        rotation: ctx.rotation,
                    };
                    wanderer.suspend();
                    return CombatDecision::drive(MotionIntent::pinned_at(ctx.position, ctx.rotation));
                }

                if let Some(decision) = self.apply_leash(ctx, config, wanderer, &snapshot) {
                    return decision;
                }

                if !self.target_allowed(ctx, config, zones, &snapshot) {
                    crate::log(&format!("CombatAI {:?}: target {:?} no longer valid", ctx.entity, target));
                    self.resume_wandering(wanderer, None);
                    return CombatDecision::default();
                }

                wanderer.suspend();
                self.engage(ctx, config, wanderer, snapshot)
            }
        }
    }

    /// Chasing ↔ Attacking по дистанции до цели (с гистерезисом)
    fn engage(
        &mut self,
        ctx: &CombatContext,
        config: &CombatConfig,
        wanderer: &mut Wanderer,
        target: AgentSnapshot,
    ) -> CombatDecision {
        let to_target = flatten(target.position - ctx.position);
        let distance = to_target.length();
        let exit_distance = config.min_attack_distance * config.attack_exit_factor.max(1.0);

        let attacking = match self.state {
            CombatState::Attacking { .. } => distance <= exit_distance,
            _ => distance <= config.min_attack_distance,
        };

        wanderer.suspend();

        if attacking {
            if !matches!(self.state, CombatState::Attacking { .. }) {
                crate::log(&format!("CombatAI {:?}: attacking {:?}", ctx.entity, target.entity));
            }
            self.state = CombatState::Attacking { target: target.entity };
            CombatDecision {
                intent: Some(MotionIntent::face(to_target, config.chase_turn_rate)),
                attack: Some(target.entity),
            }
        } else {
            self.state = CombatState::Chasing { target: target.entity };
            CombatDecision::drive(MotionIntent::travel(
                to_target,
                config.chase_speed_fraction,
                config.chase_turn_rate,
            ))
        }
    }

    /// Leash: None: продолжаем бой
    fn apply_leash(
        &mut self,
        ctx: &CombatContext,
        config: &CombatConfig,
        wanderer: &mut Wanderer,
        target: &AgentSnapshot,
    ) -> Option<CombatDecision> {
        let territory = ctx.territory?;
        let excess = distance_from_center(ctx.position, territory) - territory.outer_radius;

        if excess > config.max_distance_from_territory {
            let destination = safe_interior_point(ctx.position, territory);
            let start_distance = horizontal_distance(ctx.position, destination);
            crate::log_info(&format!(
                "CombatAI {:?}: leash {:.1}m beyond territory, returning",
                ctx.entity, excess
            ));
            self.aggro.clear();
            self.state = CombatState::ReturningToTerritory { destination, start_distance };
            wanderer.suspend();
            return Some(CombatDecision::drive(MotionIntent::travel(
                destination - ctx.position,
                config.chase_speed_fraction,
                config.chase_turn_rate,
            )));
        }

        let target_excess = distance_from_center(target.position, territory) - territory.outer_radius;
        if excess > config.return_buffer && target_excess > config.max_extra_distance {
            crate::log(&format!(
                "CombatAI {:?}: target {:?} escaped ({:.1}m out), heading home",
                ctx.entity, target.entity, target_excess
            ));
            let home = safe_interior_point(ctx.position, territory) - ctx.position;
            self.resume_wandering(wanderer, Some(home));
            return Some(CombatDecision::default());
        }

        None
    }

    /// Можно ли (продолжать) атаковать эту цель в текущем режиме
    fn target_allowed(
        &self,
        ctx: &CombatContext,
        config: &CombatConfig,
        zones: &ProtectedZones,
        target: &AgentSnapshot,
    ) -> bool {
        if !target.is_alive() || zones.contains(target.position) {
            return false;
        }

        // Мягкий leash: далеко от дома не берём цели, ушедшие за max_extra_distance
        if let Some(t) = ctx.territory {
            let excess = distance_from_center(ctx.position, t) - t.outer_radius;
            let target_excess = distance_from_center(target.position, t) - t.outer_radius;
            if excess > config.return_buffer && target_excess > config.max_extra_distance {
                return false;
            }
        }

        match self.mode {
            BehaviorMode::Aggressive => true,
            BehaviorMode::Passive => self.aggro.is_active(ctx.now, config.aggro_memory_duration),
            BehaviorMode::Territorial => ctx
                .territory
                .map_or(true, |t| is_within_margin(target.position, t, config.territorial_margin)),
        }
    }

    /// Ближайшая допустимая цель (Passive предпочитает запомненного агрессора)
    fn acquire_target(
        &self,
        ctx: &CombatContext,
        config: &CombatConfig,
        spatial: &dyn SpatialQuery,
        zones: &ProtectedZones,
    ) -> Option<AgentSnapshot> {
        if self.mode == BehaviorMode::Passive {
            if !self.aggro.is_active(ctx.now, config.aggro_memory_duration) {
                return None;
            }
            let remembered = self
                .aggro
                .target()
                .and_then(|entity| spatial.agent(entity))
                .filter(|snapshot| self.target_allowed(ctx, config, zones, snapshot));
            if remembered.is_some() {
                return remembered;
            }
        }

        spatial
            .detect_targets(ctx.entity, ctx.position, config.detection_radius, ctx.faction)
            .into_iter()
            .filter(|snapshot| self.target_allowed(ctx, config, zones, snapshot))
            .min_by(|a, b| {
                let da = horizontal_distance(ctx.position, a.position);
                let db = horizontal_distance(ctx.position, b.position);
                da.total_cmp(&db).then_with(|| a.entity.index().cmp(&b.entity.index()))
            })
    }

    /// Вернуть управление Wanderer с принудительным новым waypoint
    fn resume_wandering(&mut self, wanderer: &mut Wanderer, direction: Option<Vec3>) {
        self.state = CombatState::Wandering;
        match direction {
            Some(direction) => wanderer.force_waypoint_in_direction(direction),
            None => wanderer.force_new_waypoint(),
        }
    }
}
