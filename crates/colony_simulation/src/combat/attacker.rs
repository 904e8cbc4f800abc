//! Attacker component: урон и кулдаун атакующего агента
//!
//! CombatAI только решает "бить эту цель"; кулдаун и урон живут здесь.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Attacker: компонент для агентов которые могут атаковать
#[derive(Component, Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct Attacker {
    /// Урон за удар
    pub damage: u32,

    /// Минимальный интервал между атаками (секунды)
    pub attack_interval: f32,

    /// Текущий cooldown таймер (уменьшается до 0)
    #[serde(skip)]
    pub cooldown_timer: f32,
}

impl Default for Attacker {
    fn default() -> Self {
        Self {
            damage: 10,
            attack_interval: 1.0,
            cooldown_timer: 0.0,
        }
    }
}

impl Attacker {
    pub fn new(damage: u32, attack_interval: f32) -> Self {
        Self {
            damage,
            attack_interval,
            cooldown_timer: 0.0,
        }
    }

    /// Может ли атаковать (cooldown == 0)
    pub fn can_attack(&self) -> bool {
        self.cooldown_timer <= 0.0
    }

    /// Атаковать если кулдаун прошёл (сбрасывает таймер)
    pub fn try_attack(&mut self) -> bool {
        if !self.can_attack() {
            return false;
        }
        self.cooldown_timer = self.attack_interval;
        true
    }

    /// Сколько секунд до следующей атаки
    pub fn remaining_cooldown(&self) -> f32 {
        self.cooldown_timer.max(0.0)
    }
}

/// System: обновление attack cooldown таймеров
pub fn tick_attack_cooldowns(mut query: Query<&mut Attacker>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for mut attacker in query.iter_mut() {
        if attacker.cooldown_timer > 0.0 {
            attacker.cooldown_timer = (attacker.cooldown_timer - delta).max(0.0);
        }
    }
}
