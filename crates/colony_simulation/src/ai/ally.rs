//! AllyCoordinator: союзники держат formation за лидером
//!
//! Follow ↔ CatchingUp с гистерезисом:
//! - Follow → CatchingUp: distance > max_distance_before_catchup
//! - CatchingUp → Follow: distance < distance_to_resume_formation (строго меньше порога выше)
//!
//! Слоты переназначаются при изменении roster (spawn/death/removal) в стабильном
//! порядке спавна, до расчёта follow в том же тике.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::formation::{slot_offset, slot_position};
use crate::components::flatten;
use crate::config::ConfigError;
use crate::movement::MotionIntent;
use crate::steering::{avoid_neighbors, AvoidanceConfig};

/// Режим следования
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum FollowMode {
    /// Держим свой slot
    #[default]
    Follow,
    /// Отстали: бежим прямо к лидеру
    CatchingUp,
}

/// Параметры следования (per ally)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct FollowConfig {
    /// Базовая дистанция slot от лидера
    pub follow_distance: f32,
    /// Угловой шаг между соседними слотами (градусы)
    pub slot_spacing_deg: f32,
    /// Больше этого: делим на заднюю и переднюю дуги
    pub small_roster_size: usize,
    /// Множитель дистанции для передней дуги
    pub front_distance_multiplier: f32,
    pub max_distance_before_catchup: f32,
    pub distance_to_resume_formation: f32,
    /// Внутри радиуса скорость падает пропорционально дистанции до slot
    pub slow_down_radius: f32,
    /// Нижняя граница доли скорости в Follow
    pub min_follow_speed: f32,
    /// Доля max_speed в CatchingUp
    pub catchup_speed_multiplier: f32,
    /// В CatchingUp ближе этого: стоп
    pub catchup_arrival_distance: f32,
    /// Ближе этого к slot: стоим
    pub slot_arrival_threshold: f32,
    /// Скорость поворота (рад/сек)
    pub turn_rate: f32,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            follow_distance: 3.0,
            slot_spacing_deg: 30.0,
            small_roster_size: 4,
            front_distance_multiplier: 1.2,
            max_distance_before_catchup: 10.0,
            distance_to_resume_formation: 5.0,
            slow_down_radius: 2.0,
            min_follow_speed: 0.2,
            catchup_speed_multiplier: 1.5,
            catchup_arrival_distance: 2.0,
            slot_arrival_threshold: 0.3,
            turn_rate: 8.0,
        }
    }
}

impl FollowConfig {
    /// Гистерезис должен быть корректным: resume < catchup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.distance_to_resume_formation >= self.max_distance_before_catchup {
            return Err(ConfigError::FollowHysteresis {
                resume: self.distance_to_resume_formation,
                catchup: self.max_distance_before_catchup,
            });
        }
        if self.follow_distance <= 0.0 || self.slow_down_radius <= 0.0 {
            return Err(ConfigError::NonPositive("follow_distance/slow_down_radius"));
        }
        if !(0.0..=1.0).contains(&self.min_follow_speed) {
            return Err(ConfigError::OutOfRange {
                field: "min_follow_speed",
                value: self.min_follow_speed,
            });
        }
        Ok(())
    }
}

/// Поза лидера на начало тика
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeaderPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub velocity: Vec3,
}

impl LeaderPose {
    /// Направление движения если лидер идёт, иначе взгляд
    pub fn direction(&self) -> Vec3 {
        let moving = flatten(self.velocity);
        if moving.length_squared() > 0.01 {
            moving.normalize()
        } else {
            flatten(self.forward).normalize_or_zero()
        }
    }
}

/// Component: союзник в formation
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(FollowConfig, AvoidanceConfig)]
pub struct AllyFollower {
    /// Индекс slot среди живых союзников (переназначается roster'ом)
    pub slot: usize,
    mode: FollowMode,
    /// Стабильный порядок спавна (выдаёт AllyRoster при первом переназначении)
    spawn_order: Option<u64>,
}

impl AllyFollower {
    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn spawn_order(&self) -> Option<u64> {
        self.spawn_order
    }

    pub(crate) fn set_spawn_order(&mut self, order: u64) {
        self.spawn_order = Some(order);
    }

    /// Один тик следования
    ///
    /// `neighbors`: позиции союзников рядом (для avoidance), без себя.
    pub fn tick(
        &mut self,
        position: Vec3,
        leader: Option<&LeaderPose>,
        roster_size: usize,
        neighbors: &[Vec3],
        config: &FollowConfig,
        avoidance: &AvoidanceConfig,
    ) -> MotionIntent {
        // Нет лидера → держим позицию
        let Some(leader) = leader else {
            return MotionIntent::stop();
        };

        let to_leader = flatten(leader.position - position);
        let leader_distance = to_leader.length();

        self.update_mode(leader_distance, config);

        match self.mode {
            FollowMode::CatchingUp => {
                if leader_distance <= config.catchup_arrival_distance {
                    return MotionIntent::face(to_leader, config.turn_rate);
                }
                MotionIntent::travel(to_leader, config.catchup_speed_multiplier, config.turn_rate)
            }

            FollowMode::Follow => {
                let direction = leader.direction();
                let offset = slot_offset(self.slot, roster_size.max(self.slot + 1), config);
                let target = slot_position(leader.position, direction, offset, config.follow_distance);

                let to_slot = flatten(target - position);
                let distance = to_slot.length();

                if distance <= config.slot_arrival_threshold {
                    return MotionIntent::face(direction, config.turn_rate);
                }

                let speed = (distance / config.slow_down_radius).clamp(config.min_follow_speed, 1.0);
                let steer = avoid_neighbors(to_slot, position, neighbors, avoidance);
                MotionIntent::travel(steer, speed, config.turn_rate)
            }
        }
    }

    fn update_mode(&mut self, leader_distance: f32, config: &FollowConfig) {
        let next = match self.mode {
            FollowMode::Follow if leader_distance > config.max_distance_before_catchup => FollowMode::CatchingUp,
            FollowMode::CatchingUp if leader_distance < config.distance_to_resume_formation => FollowMode::Follow,
            mode => mode,
        };

        if next != self.mode {
            crate::log(&format!(
                "Ally slot {}: {:?} → {:?} (leader at {:.1}m)",
                self.slot, self.mode, next, leader_distance
            ));
            self.mode = next;
        }
    }
}

/// Resource: учёт живых союзников для formation
#[derive(Resource, Debug, Clone, Default)]
pub struct AllyRoster {
    dirty: bool,
    next_spawn_order: u64,
    living: usize,
}

impl AllyRoster {
    /// Выдать порядковый номер новому союзнику (roster помечается dirty)
    pub fn register(&mut self) -> u64 {
        let order = self.next_spawn_order;
        self.next_spawn_order += 1;
        self.dirty = true;
        order
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Живых союзников после последнего переназначения
    pub fn living(&self) -> usize {
        self.living
    }

    /// Переназначить слоты: стабильный порядок спавна, только живые
    ///
    /// Вход: (spawn_order, alive) в любом порядке; выход: slot для каждого живого
    /// в порядке входа (None для мёртвых).
    pub fn reassign(&mut self, members: &[(u64, bool)]) -> Vec<Option<usize>> {
        let mut order: Vec<usize> = (0..members.len()).collect();
        order.sort_by_key(|&i| members[i].0);

        let mut slots = vec![None; members.len()];
        let mut next = 0;
        for i in order {
            if members[i].1 {
                slots[i] = Some(next);
                next += 1;
            }
        }

        self.living = next;
        self.dirty = false;
        slots
    }
}
