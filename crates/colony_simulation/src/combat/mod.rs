//! Combat module: урон, кулдауны, смерть
//!
//! Решение "кого бить" принимает CombatAI (crate::ai). Здесь только правила:
//! - Attacker: урон + кулдаун
//! - Events: AttackPerformed, DamageDealt, EntityDied
//! - Dead marker и отключение контроллеров

use bevy::prelude::*;

pub mod attacker;
pub mod damage;

// Re-export основных типов
pub use attacker::{tick_attack_cooldowns, Attacker};
pub use damage::{AttackPerformed, DamageDealt, Dead, EntityDied};

use crate::SimulationSet;

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate (фаза Resolution, после решений AI).
///
/// Порядок выполнения:
/// 1. apply_damage: AttackPerformed → Health, DamageDealt/EntityDied
/// 2. disable_ai_on_death: Dead marker, стоп контроллеров
/// 3. tick_attack_cooldowns: обновление cooldown таймеров
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AttackPerformed>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>();

        app.configure_sets(FixedUpdate, (SimulationSet::Behaviour, SimulationSet::Resolution).chain());

        app.add_systems(
            FixedUpdate,
            (damage::apply_damage, damage::disable_ai_on_death, tick_attack_cooldowns)
                .chain()
                .in_set(SimulationSet::Resolution),
        );
    }
}
