//! Movement компоненты: скорость, высота спавна, velocity, leader marker

use bevy::prelude::*;

/// Максимальная скорость движения актора (метры/сек)
///
/// MotionIntent.speed_fraction масштабируется относительно этого значения.
#[derive(Component, Clone, Copy, Debug, Reflect)]
#[reflect(Component)]
pub struct MovementSpeed {
    pub max_speed: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self { max_speed: 3.0 } // 3 m/s: базовая скорость
    }
}

/// Высота земли, зафиксированная при спавне
///
/// Все контроллеры работают в горизонтальной плоскости XZ,
/// Y клампится к этому значению при каждом actuation шаге.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct GroundHeight(pub f32);

/// Фактическая скорость за последний тик (пишется только actuation системой)
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct Velocity(pub Vec3);

impl Velocity {
    /// Горизонтальная компонента (XZ)
    pub fn horizontal(&self) -> Vec3 {
        Vec3::new(self.0.x, 0.0, self.0.z)
    }
}

/// Маркер: лидер отряда союзников (игрок)
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct Leader;

/// Горизонтальная проекция вектора (Y = 0)
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Горизонтальная дистанция между двумя точками
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(b - a).length()
}

/// Горизонтальное направление forward из rotation (bevy forward = -Z)
pub fn horizontal_forward(rotation: Quat) -> Vec3 {
    let forward = flatten(rotation * Vec3::NEG_Z);
    forward.try_normalize().unwrap_or(Vec3::NEG_Z)
}

/// Rotation, смотрящая вдоль горизонтального направления
pub fn heading_rotation(direction: Vec3) -> Quat {
    let dir = flatten(direction).try_normalize().unwrap_or(Vec3::NEG_Z);
    // Угол от -Z к dir вокруг оси Y
    Quat::from_rotation_y(f32::atan2(-dir.x, -dir.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_rotation_matches_forward() {
        for dir in [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z, Vec3::new(1.0, 0.0, 1.0).normalize()] {
            let rotation = heading_rotation(dir);
            let forward = horizontal_forward(rotation);
            assert!(forward.distance(dir) < 1e-4, "dir {:?} → forward {:?}", dir, forward);
        }
    }

    #[test]
    fn test_horizontal_distance_ignores_height() {
        let a = Vec3::new(0.0, 5.0, 0.0);
        let b = Vec3::new(3.0, -2.0, 4.0);
        assert!((horizontal_distance(a, b) - 5.0).abs() < 1e-5);
    }
}
