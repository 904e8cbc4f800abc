//! WanderingController: патрулирование без надзора
//!
//! Цикл (пока включён): Waiting → Turning → Moving → Waiting …
//!
//! Каждая фаза: вариант WanderPhase, продвигается ровно одним вызовом tick
//! за симуляционный тик. Принудительный новый waypoint просто заменяет фазу
//! (Planning), так что незаконченный поворот/движение отменяются сразу.
//!
//! Основной containment: inward bias при выборе waypoint.
//! Boundary safety net (snap): последняя страховка.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{flatten, heading_rotation, horizontal_distance};
use crate::movement::MotionIntent;
use crate::spatial::{ProbeLayer, SpatialQuery};
use crate::territory::{
    boundary_snap, closest_safe_point, distance_from_center, is_safe_waypoint, is_within, safe_interior_point,
    would_cross, Territory,
};

/// Параметры wandering (per agent)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct WanderConfig {
    /// Пауза между переходами (секунды, равномерно в [min, max])
    pub min_wait: f32,
    pub max_wait: f32,
    /// Длительность плавного поворота к waypoint (секунды)
    pub turn_duration: f32,
    /// Дальность waypoint (метры)
    pub min_wander_distance: f32,
    pub max_wander_distance: f32,
    /// Горизонтальная дистанция "пришли"
    pub arrival_threshold: f32,
    /// Вероятность за тик остановиться раньше и перепланировать
    pub early_stop_chance: f32,
    /// Попыток найти безопасный waypoint
    pub waypoint_attempts: u32,
    /// Доля радиуса, после которой направление тянется к центру
    pub inward_bias_threshold: f32,
    /// Вес направления к центру при blend
    pub inward_bias_weight: f32,
    /// Множитель дальности при inward bias
    pub inward_distance_scale: f32,
    /// Waypoint принимается только внутри outer · safety_fraction
    pub waypoint_safety_fraction: f32,
    /// Проверять путь веером лучей
    pub avoid_obstacles: bool,
    /// Угол крайних лучей веера (градусы)
    pub probe_spread_deg: f32,
    /// Шаг fallback к центру территории
    pub fallback_step: f32,
    /// Минимальный сдвиг, если ничего не подошло
    pub min_nudge: f32,
    /// Допуск выхода за outer до snap (доля радиуса)
    pub snap_tolerance: f32,
    /// Куда snap'ать (доля outer)
    pub snap_fraction: f32,
    /// Скорость довора heading во время Moving (рад/сек)
    pub moving_turn_rate: f32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            min_wait: 1.0,
            max_wait: 3.0,
            turn_duration: 0.4,
            min_wander_distance: 2.0,
            max_wander_distance: 6.0,
            arrival_threshold: 0.5,
            early_stop_chance: 0.004, // ~1 раз за 4 сек при 60Hz
            waypoint_attempts: 10,
            inward_bias_threshold: 0.65,
            inward_bias_weight: 0.8,
            inward_distance_scale: 0.5,
            waypoint_safety_fraction: 0.8,
            avoid_obstacles: true,
            probe_spread_deg: 30.0,
            fallback_step: 1.5,
            min_nudge: 0.5,
            snap_tolerance: 0.05,
            snap_fraction: 0.95,
            moving_turn_rate: 10.0,
        }
    }
}

/// Цель перехода + порог прибытия
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Waypoint {
    pub position: Vec3,
    pub arrival_distance: f32,
}

/// Фаза цикла wandering (ровно одна активна)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum WanderPhase {
    /// Контроллер выключен (движением управляет кто-то другой)
    Disabled,
    /// Выбрать waypoint в этом тике (опционально в заданном направлении)
    Planning { direction: Option<Vec3> },
    /// Пауза на месте
    Waiting { remaining: f32 },
    /// Slerp rotation к направлению на waypoint
    Turning {
        from: Quat,
        to: Quat,
        elapsed: f32,
        waypoint: Waypoint,
    },
    /// Движение к waypoint на полной скорости
    Moving { waypoint: Waypoint },
}

/// Снимок агента для одного тика wandering
#[derive(Debug, Clone, Copy)]
pub struct WanderContext {
    pub position: Vec3,
    pub rotation: Quat,
    pub ground_height: f32,
    pub max_speed: f32,
}

/// Component: состояние WanderingController
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
#[require(WanderConfig)]
pub struct Wanderer {
    phase: WanderPhase,
    /// После disable() один раз выдать stop (обнулить остаточную velocity)
    halt_pending: bool,
    last_waypoint: Option<Waypoint>,
}

impl Default for Wanderer {
    fn default() -> Self {
        Self {
            phase: WanderPhase::Waiting { remaining: 0.0 },
            halt_pending: false,
            last_waypoint: None,
        }
    }
}

impl Wanderer {
    pub fn phase(&self) -> &WanderPhase {
        &self.phase
    }

    pub fn last_waypoint(&self) -> Option<Waypoint> {
        self.last_waypoint
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.phase, WanderPhase::Disabled)
    }

    /// true только в фазе Moving (Waiting/Turning: false)
    pub fn is_moving(&self) -> bool {
        matches!(self.phase, WanderPhase::Moving { .. })
    }

    /// Включить цикл (если уже включён: ничего не меняем)
    pub fn enable(&mut self) {
        if !self.is_enabled() {
            self.phase = WanderPhase::Waiting { remaining: 0.0 };
            self.halt_pending = false;
        }
    }

    /// Выключить; следующий tick выдаст stop intent
    pub fn disable(&mut self) {
        if self.is_enabled() {
            self.halt_pending = true;
        }
        self.phase = WanderPhase::Disabled;
    }

    /// Выключить без stop: движением сразу начинает управлять другой контроллер
    pub(crate) fn suspend(&mut self) {
        self.phase = WanderPhase::Disabled;
        self.halt_pending = false;
    }

    /// Немедленно выбрать новый waypoint (отменяет текущую фазу, включает контроллер)
    pub fn force_new_waypoint(&mut self) {
        self.phase = WanderPhase::Planning { direction: None };
        self.halt_pending = false;
    }

    /// Немедленно выбрать waypoint в заданном горизонтальном направлении
    pub fn force_waypoint_in_direction(&mut self, direction: Vec3) {
        let direction = flatten(direction).try_normalize();
        self.phase = WanderPhase::Planning { direction };
        self.halt_pending = false;
    }

    /// Продвинуть FSM на один тик
    ///
    /// None: контроллер выключен и движением не управляет.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        ctx: &WanderContext,
        config: &WanderConfig,
        territory: Option<&Territory>,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
        delta: f32,
    ) -> Option<MotionIntent> {
        if !self.is_enabled() {
            if self.halt_pending {
                self.halt_pending = false;
                return Some(MotionIntent::stop());
            }
            return None;
        }

        let mut position = Vec3::new(ctx.position.x, ctx.ground_height, ctx.position.z);
        let mut snapped = None;

        // Safety net: вышли за допуск → snap на границу, движение отменяется
        if let Some(t) = territory {
            if let Some(corrected) = boundary_snap(position, t, config.snap_tolerance, config.snap_fraction) {
                crate::log(&format!(
                    "Wander: boundary snap {:.2} → {:.2} from center",
                    distance_from_center(position, t),
                    distance_from_center(corrected, t)
                ));
                position = corrected;
                snapped = Some(corrected);
                self.phase = WanderPhase::Planning {
                    direction: flatten(safe_interior_point(corrected, t) - corrected).try_normalize(),
                };
            }
        }

        let intent = self.advance(position, ctx, config, territory, spatial, rng, delta);

        Some(match snapped {
            Some(corrected) => intent.with_snap(corrected),
            None => intent,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn advance<R: Rng + ?Sized>(
        &mut self,
        position: Vec3,
        ctx: &WanderContext,
        config: &WanderConfig,
        territory: Option<&Territory>,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
        delta: f32,
    ) -> MotionIntent {
        match self.phase {
            WanderPhase::Disabled => MotionIntent::stop(),

            WanderPhase::Planning { direction } => {
                self.begin_turn(position, ctx.rotation, direction, config, territory, spatial, rng)
            }

            WanderPhase::Waiting { remaining } => {
                let remaining = remaining - delta;
                if remaining <= 0.0 {
                    self.begin_turn(position, ctx.rotation, None, config, territory, spatial, rng)
                } else {
                    self.phase = WanderPhase::Waiting { remaining };
                    MotionIntent::stop()
                }
            }

            WanderPhase::Turning { from, to, elapsed, waypoint } => {
                let elapsed = elapsed + delta;
                let t = if config.turn_duration > 0.0 {
                    (elapsed / config.turn_duration).min(1.0)
                } else {
                    1.0
                };
                let rotation = from.slerp(to, t);

                self.phase = if t >= 1.0 {
                    WanderPhase::Moving { waypoint }
                } else {
                    WanderPhase::Turning { from, to, elapsed, waypoint }
                };

                MotionIntent::oriented(rotation)
            }

            WanderPhase::Moving { waypoint } => {
                self.advance_moving(position, waypoint, ctx, config, territory, spatial, rng, delta)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn advance_moving<R: Rng + ?Sized>(
        &mut self,
        position: Vec3,
        waypoint: Waypoint,
        ctx: &WanderContext,
        config: &WanderConfig,
        territory: Option<&Territory>,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
        delta: f32,
    ) -> MotionIntent {
        let to_waypoint = flatten(waypoint.position - position);
        let distance = to_waypoint.length();

        if distance < waypoint.arrival_distance {
            self.start_waiting(config, rng);
            return MotionIntent::stop();
        }

        if rng.gen::<f32>() < config.early_stop_chance {
            crate::log("Wander: early stop, re-planning after pause");
            self.start_waiting(config, rng);
            return MotionIntent::stop();
        }

        let direction = to_waypoint / distance;
        let step = (ctx.max_speed * delta).min(distance);
        let next = position + direction * step;

        if let Some(t) = territory {
            if step_violates_containment(position, next, t) {
                crate::log("Wander: next step leaves territory, stopping");
                self.start_waiting(config, rng);
                return MotionIntent::stop();
            }
        }

        if config.avoid_obstacles
            && spatial.ray_blocked(position, direction, step.max(waypoint.arrival_distance), ProbeLayer::Any)
        {
            crate::log("Wander: path blocked, stopping");
            self.start_waiting(config, rng);
            return MotionIntent::stop();
        }

        MotionIntent::travel(direction, 1.0, config.moving_turn_rate)
    }

    #[allow(clippy::too_many_arguments)]
    fn begin_turn<R: Rng + ?Sized>(
        &mut self,
        position: Vec3,
        rotation: Quat,
        direction: Option<Vec3>,
        config: &WanderConfig,
        territory: Option<&Territory>,
        spatial: &dyn SpatialQuery,
        rng: &mut R,
    ) -> MotionIntent {
        let waypoint = choose_waypoint(position, direction, config, territory, spatial, rng);
        let to = heading_rotation(waypoint.position - position);

        self.last_waypoint = Some(waypoint);
        self.phase = WanderPhase::Turning {
            from: rotation,
            to,
            elapsed: 0.0,
            waypoint,
        };

        MotionIntent::oriented(rotation)
    }

    fn start_waiting<R: Rng + ?Sized>(&mut self, config: &WanderConfig, rng: &mut R) {
        let remaining = if config.max_wait > config.min_wait {
            rng.gen_range(config.min_wait..=config.max_wait)
        } else {
            config.min_wait
        };
        self.phase = WanderPhase::Waiting { remaining };
    }
}

/// Шаг выходит из территории (или, если уже снаружи, не приближает к безопасной точке)
fn step_violates_containment(position: Vec3, next: Vec3, territory: &Territory) -> bool {
    if is_within(position, territory) {
        return would_cross(position, next, territory);
    }

    let target = safe_interior_point(position, territory);
    horizontal_distance(next, target) >= horizontal_distance(position, target)
}

/// Кандидат, допустимый по территории
///
/// Для кольца отвергнутая точка проецируется радиально в безопасную полосу,
/// если после проекции шаг не короче половины min_wander_distance.
fn contain_candidate(position: Vec3, candidate: Vec3, territory: &Territory, config: &WanderConfig) -> Option<Vec3> {
    let safety = config.waypoint_safety_fraction;

    let accepted = if is_safe_waypoint(candidate, territory, safety) {
        candidate
    } else if territory.is_ring() {
        let projected = closest_safe_point(candidate, territory, safety);
        if horizontal_distance(position, projected) < config.min_wander_distance * 0.5 {
            return None;
        }
        projected
    } else {
        return None;
    };

    chord_avoids_hole(position, accepted, territory).then_some(accepted)
}

/// Для кольца: отрезок не проходит через исключённый центральный диск
fn chord_avoids_hole(from: Vec3, to: Vec3, territory: &Territory) -> bool {
    if !territory.is_ring() {
        return true;
    }

    let segment = flatten(to - from);
    let length_sq = segment.length_squared();
    let to_center = flatten(territory.center - from);
    let t = if length_sq > 0.0 {
        (to_center.dot(segment) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (segment * t).distance(to_center) >= territory.inner()
}

/// Путь свободен для всех лучей веера (−spread, 0, +spread)
fn path_clear(position: Vec3, direction: Vec3, distance: f32, spread_deg: f32, spatial: &dyn SpatialQuery) -> bool {
    let spread = spread_deg.to_radians();
    [-spread, 0.0, spread].into_iter().all(|angle| {
        let ray = Quat::from_rotation_y(angle) * direction;
        !spatial.ray_blocked(position, ray, distance, ProbeLayer::Any)
    })
}

fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

/// Направление к безопасной внутренней точке, если агент дальше порога inward bias
fn inward_pull(position: Vec3, territory: &Territory, threshold: f32) -> Option<Vec3> {
    let distance = distance_from_center(position, territory);

    let beyond_threshold = if territory.is_ring() {
        // Для кольца меряем отклонение от радиальной середины (тянет и от внутренней границы)
        let mid = (territory.inner() + territory.outer_radius) * 0.5;
        let half_band = (territory.outer_radius - territory.inner()) * 0.5;
        half_band > 0.0 && (distance - mid).abs() / half_band > threshold
    } else {
        distance / territory.outer_radius > threshold
    };

    if !beyond_threshold {
        return None;
    }

    flatten(safe_interior_point(position, territory) - position).try_normalize()
}

/// Выбор waypoint
///
/// До `waypoint_attempts` кандидатов: случайное направление (или заданное, с разбросом
/// на повторных попытках) и дальность в [min, max]. Внешняя часть территории тянется
/// внутрь. Кандидат должен быть безопасен по территории (для кольца отвергнутый
/// кандидат проецируется в безопасную полосу) и, опционально, по лучам.
/// Fallback: короткий шаг к безопасной точке, затем минимальный nudge.
/// Никогда не возвращает текущую позицию.
pub fn choose_waypoint<R: Rng + ?Sized>(
    position: Vec3,
    preferred: Option<Vec3>,
    config: &WanderConfig,
    territory: Option<&Territory>,
    spatial: &dyn SpatialQuery,
    rng: &mut R,
) -> Waypoint {
    let make = |point: Vec3| Waypoint {
        position: Vec3::new(point.x, position.y, point.z),
        arrival_distance: config.arrival_threshold,
    };
    let preferred = preferred.and_then(|d| flatten(d).try_normalize());
    let max_distance = config.max_wander_distance.max(config.min_wander_distance);

    for attempt in 0..config.waypoint_attempts.max(1) {
        let mut direction = match preferred {
            // Первая попытка: строго в заданную сторону, дальше разброс растёт
            Some(dir) if attempt == 0 => dir,
            Some(dir) => {
                let jitter = (attempt as f32 * 15.0).min(90.0).to_radians();
                Quat::from_rotation_y(rng.gen_range(-jitter..=jitter)) * dir
            }
            None => random_direction(rng),
        };

        let mut distance = if max_distance > config.min_wander_distance {
            rng.gen_range(config.min_wander_distance..=max_distance)
        } else {
            config.min_wander_distance
        };

        if let Some(t) = territory {
            if let Some(inward) = inward_pull(position, t, config.inward_bias_threshold) {
                let w = config.inward_bias_weight;
                direction = (direction * (1.0 - w) + inward * w).try_normalize().unwrap_or(inward);
                distance *= config.inward_distance_scale;
            }
        }

        if distance <= f32::EPSILON {
            continue;
        }

        let candidate = position + direction * distance;
        let candidate = match territory {
            Some(t) => match contain_candidate(position, candidate, t, config) {
                Some(point) => point,
                None => continue,
            },
            None => candidate,
        };

        let offset = flatten(candidate - position);
        let (direction, distance) = (offset.normalize_or_zero(), offset.length());
        if config.avoid_obstacles && !path_clear(position, direction, distance, config.probe_spread_deg, spatial) {
            continue;
        }

        return make(candidate);
    }

    crate::log("Wander: all waypoint attempts failed, using fallback");

    // Fallback 1: короткий шаг к безопасной внутренней точке
    if let Some(t) = territory {
        let to_safe = flatten(safe_interior_point(position, t) - position);
        let length = to_safe.length();
        if length > config.min_nudge {
            let direction = to_safe / length;
            let step = config.fallback_step.min(length).max(config.min_nudge);
            let clear = !config.avoid_obstacles
                || !spatial.ray_blocked(position, direction, step, ProbeLayer::Any);
            if clear {
                return make(position + direction * step);
            }
        }
    }

    // Fallback 2: минимальный nudge (4 направления от случайного угла)
    let nudge = config.min_nudge.max(0.05);
    let start = random_direction(rng);
    for quarter in 0..4 {
        let direction = Quat::from_rotation_y(quarter as f32 * std::f32::consts::FRAC_PI_2) * start;
        let candidate = position + direction * nudge;
        let blocked = config.avoid_obstacles && spatial.ray_blocked(position, direction, nudge, ProbeLayer::Any);
        let inside = territory.map_or(true, |t| is_within(candidate, t));
        if !blocked && inside {
            return make(candidate);
        }
    }

    // Ничего не подошло: всё равно ненулевой сдвиг
    make(position + start * nudge)
}
