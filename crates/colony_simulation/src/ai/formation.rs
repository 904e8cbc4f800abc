//! Геометрия formation slots
//!
//! Slot 0: прямо за лидером, дальше чередование ±spacing.
//! Большой отряд (> small_roster_size) делится: первая половина (ceil) идёт в
//! заднюю дугу, остальные в переднюю дугу (+180°) с множителем дистанции.

use bevy::prelude::*;

use super::ally::FollowConfig;

/// Смещение слота относительно направления лидера
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotOffset {
    /// Базовый угол (радианы), 0: позади лидера
    pub angle: f32,
    pub distance_multiplier: f32,
}

/// Угол внутри дуги: 0, +s, −s, +2s, −2s, …
fn alternating_angle(index: usize, spacing: f32) -> f32 {
    if index == 0 {
        return 0.0;
    }
    let step = index.div_ceil(2) as f32;
    let sign = if index % 2 == 1 { 1.0 } else { -1.0 };
    sign * step * spacing
}

/// Смещение слота index в отряде из roster_size живых союзников
pub fn slot_offset(index: usize, roster_size: usize, config: &FollowConfig) -> SlotOffset {
    let spacing = config.slot_spacing_deg.to_radians();

    if roster_size <= config.small_roster_size {
        return SlotOffset {
            angle: alternating_angle(index, spacing),
            distance_multiplier: 1.0,
        };
    }

    let back_count = roster_size.div_ceil(2);
    if index < back_count {
        SlotOffset {
            angle: alternating_angle(index, spacing),
            distance_multiplier: 1.0,
        }
    } else {
        SlotOffset {
            angle: std::f32::consts::PI + alternating_angle(index - back_count, spacing),
            distance_multiplier: config.front_distance_multiplier,
        }
    }
}

/// Мировая точка слота
///
/// target = leader + Rot_y(angle + 180°) · leader_direction · follow_distance · multiplier
pub fn slot_position(leader_position: Vec3, leader_direction: Vec3, offset: SlotOffset, follow_distance: f32) -> Vec3 {
    let rotation = Quat::from_rotation_y(offset.angle + std::f32::consts::PI);
    let direction = crate::components::flatten(leader_direction).normalize_or_zero();
    leader_position + rotation * direction * follow_distance * offset.distance_multiplier
}
