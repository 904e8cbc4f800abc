//! SteeringAvoidance: локальное расталкивание агентов
//!
//! Два уровня:
//! - `avoid_neighbors`: смешивает желаемое направление с отталкиванием от соседей
//!   своей фракции (используют контроллеры перед записью MotionIntent)
//! - `separate_overlapping_agents`: каждый тик раздвигает уже перекрывшихся агентов
//!   маленькими прямыми сдвигами (независимо от режима)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::Dead;
use crate::components::{flatten, Actor};
use crate::movement::MotionIntent;

/// Параметры avoidance
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Радиус поиска соседей для blend (метры)
    pub detection_radius: f32,
    /// Порог dot(направление движения, направление на соседа) для "сосед впереди"
    pub ahead_dot: f32,
    /// Множитель отталкивания для соседей впереди
    pub ahead_weight: f32,
    /// Вес blend = средняя сила · gain
    pub blend_gain: f32,
    /// Потолок веса blend (< 1.0, желаемое направление не перетирается полностью)
    pub max_blend: f32,
    /// Радиус жёсткого разделения (перекрытие тел)
    pub separation_radius: f32,
    /// Доля перекрытия, убираемая за тик
    pub separation_push: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            detection_radius: 3.0,
            ahead_dot: 0.5,
            ahead_weight: 2.0,
            blend_gain: 1.5,
            max_blend: 0.75,
            separation_radius: 0.9,
            separation_push: 0.1,
        }
    }
}

/// Сила отталкивания: (1 - d/r)^1.5
pub fn repulsion_strength(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    (1.0 - distance / radius).max(0.0).powf(1.5)
}

/// Смешать желаемое направление с отталкиванием от соседей
///
/// Возвращает горизонтальное единичное направление (или ZERO, если desired = ZERO).
pub fn avoid_neighbors(desired: Vec3, position: Vec3, neighbors: &[Vec3], config: &AvoidanceConfig) -> Vec3 {
    let desired = flatten(desired).normalize_or_zero();
    if desired == Vec3::ZERO || neighbors.is_empty() {
        return desired;
    }

    let mut total = Vec3::ZERO;
    let mut count = 0usize;

    for &neighbor in neighbors {
        let away = flatten(position - neighbor);
        let distance = away.length();
        if distance >= config.detection_radius {
            continue;
        }

        let away_dir = if distance > 1e-4 { away / distance } else { desired.cross(Vec3::Y).normalize_or_zero() };
        let mut strength = repulsion_strength(distance, config.detection_radius);

        // Сосед на пути: отталкиваемся сильнее
        if (-away_dir).dot(desired) >= config.ahead_dot {
            strength *= config.ahead_weight;
        }

        total += away_dir * strength;
        count += 1;
    }

    if count == 0 {
        return desired;
    }

    let average = total / count as f32;
    let magnitude = average.length();
    if magnitude <= 1e-5 {
        return desired;
    }

    let weight = (magnitude * config.blend_gain).min(config.max_blend);
    let blended = desired * (1.0 - weight) + (average / magnitude) * weight;
    blended.try_normalize().unwrap_or(desired)
}

/// Сдвиг для разделения перекрывшихся агентов
pub fn separation_push(position: Vec3, others: &[(u32, Vec3)], self_index: u32, radius: f32, push: f32) -> Vec3 {
    let mut result = Vec3::ZERO;

    for &(other_index, other) in others {
        if other_index == self_index {
            continue;
        }

        let diff = flatten(position - other);
        let distance = diff.length();
        if distance >= radius {
            continue;
        }

        let direction = if distance > 1e-3 {
            diff / distance
        } else {
            // Совпадающие позиции: детерминированно разводим по индексу
            let angle = (self_index as f32) * 2.399_963; // golden angle
            Vec3::new(angle.cos(), 0.0, angle.sin())
        };

        result += direction * (radius - distance) * push;
    }

    result
}

/// Система: разделение перекрывшихся агентов
///
/// Работает как замена физическим коллайдерам в headless режиме.
/// Pinned агенты (kill freeze) не сдвигаются, но других от себя отталкивают.
pub fn separate_overlapping_agents(
    mut agents: Query<(Entity, &mut Transform, &MotionIntent, Option<&AvoidanceConfig>), (With<Actor>, Without<Dead>)>,
) {
    let positions: Vec<(u32, Vec3)> = agents
        .iter()
        .map(|(entity, transform, _, _)| (entity.index(), transform.translation))
        .collect();

    let defaults = AvoidanceConfig::default();

    for (entity, mut transform, intent, config) in agents.iter_mut() {
        if intent.pinned {
            continue;
        }

        let config = config.unwrap_or(&defaults);
        let push = separation_push(
            transform.translation,
            &positions,
            entity.index(),
            config.separation_radius,
            config.separation_push,
        );

        if push.length_squared() > 1e-8 {
            transform.translation += push;
        }
    }
}
