//! TerritoryEnforcer: чистая геометрия containment
//!
//! Все расстояния горизонтальные (XZ), высота точки сохраняется.

use bevy::prelude::*;

use super::Territory;
use crate::components::{flatten, horizontal_distance};

/// Горизонтальная дистанция от центра территории
pub fn distance_from_center(point: Vec3, territory: &Territory) -> f32 {
    horizontal_distance(territory.center, point)
}

/// Единичное радиальное направление center → point (X если точка в центре)
pub fn radial_direction(point: Vec3, territory: &Territory) -> Vec3 {
    flatten(point - territory.center).try_normalize().unwrap_or(Vec3::X)
}

/// Точка на заданном радиусе вдоль луча center → point (высота от point)
fn point_at_radius(point: Vec3, territory: &Territory, radius: f32) -> Vec3 {
    let on_plane = territory.center + radial_direction(point, territory) * radius;
    Vec3::new(on_plane.x, point.y, on_plane.z)
}

/// disc: d ≤ outer; ring: дополнительно d ≥ inner
pub fn is_within(point: Vec3, territory: &Territory) -> bool {
    is_within_margin(point, territory, 0.0)
}

/// is_within, расширенный на margin в обе стороны (для кольца дыра сужается)
pub fn is_within_margin(point: Vec3, territory: &Territory, margin: f32) -> bool {
    let distance = distance_from_center(point, territory);
    let outer_ok = distance <= territory.outer_radius + margin;
    if !territory.is_ring() {
        return outer_ok;
    }
    outer_ok && distance >= (territory.inner() - margin).max(0.0)
}

/// Безопасная полоса дистанций от центра (min, max)
///
/// disc: [0, outer · safety]. ring: запас (1 - safety) · ширина кольца
/// откладывается внутрь от обеих границ, так что узкое кольцо не схлопывается.
pub fn safe_band(territory: &Territory, safety_fraction: f32) -> (f32, f32) {
    if !territory.is_ring() {
        return (0.0, territory.outer_radius * safety_fraction);
    }

    let inner = territory.inner();
    let margin = (territory.outer_radius - inner) * (1.0 - safety_fraction).clamp(0.0, 0.5);
    (inner + margin, territory.outer_radius - margin)
}

/// Ближайшая безопасная точка (радиальная проекция в safe_band)
pub fn closest_safe_point(point: Vec3, territory: &Territory, safety_factor: f32) -> Vec3 {
    let distance = distance_from_center(point, territory);
    let (min, max) = safe_band(territory, safety_factor);

    let clamped = distance.clamp(min, max);
    if (clamped - distance).abs() <= f32::EPSILON {
        return point;
    }
    point_at_radius(point, territory, clamped)
}

/// true если is_within меняется между двумя точками
pub fn would_cross(current: Vec3, next: Vec3, territory: &Territory) -> bool {
    is_within(current, territory) != is_within(next, territory)
}

/// Безопасная внутренняя точка: центр диска или радиальная середина кольца
pub fn safe_interior_point(from: Vec3, territory: &Territory) -> Vec3 {
    if territory.is_ring() {
        let mid = (territory.inner() + territory.outer_radius) * 0.5;
        point_at_radius(from, territory, mid)
    } else {
        Vec3::new(territory.center.x, from.y, territory.center.z)
    }
}

/// Safety net: возвращает позицию для snap если агент вышел за допуск
///
/// Снаружи outer · (1 + tolerance) → outer · snap_fraction.
/// Внутри inner · (1 - tolerance) кольца → зеркально у внутренней границы.
pub fn boundary_snap(point: Vec3, territory: &Territory, tolerance: f32, snap_fraction: f32) -> Option<Vec3> {
    let distance = distance_from_center(point, territory);

    if distance > territory.outer_radius * (1.0 + tolerance) {
        return Some(point_at_radius(point, territory, territory.outer_radius * snap_fraction));
    }

    if territory.is_ring() {
        let inner = territory.inner();
        if distance < inner * (1.0 - tolerance) {
            let band = territory.outer_radius - inner;
            let radius = inner + band * (1.0 - snap_fraction);
            return Some(point_at_radius(point, territory, radius.min(territory.outer_radius)));
        }
    }

    None
}

/// Допустима ли точка как waypoint: дистанция внутри safe_band
pub fn is_safe_waypoint(point: Vec3, territory: &Territory, safety_fraction: f32) -> bool {
    let distance = distance_from_center(point, territory);
    let (min, max) = safe_band(territory, safety_fraction);
    distance >= min && distance <= max
}
