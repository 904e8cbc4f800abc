//! Damage pipeline и обработка смерти
//!
//! AttackPerformed (CombatAI решил ударить, кулдаун прошёл)
//!   → apply_damage → DamageDealt / EntityDied
//!   → disable_ai_on_death (Dead marker, контроллеры стоп)

use bevy::prelude::*;

use crate::ai::{AllyFollower, AllyRoster, Wanderer};
use crate::components::Health;
use crate::movement::MotionIntent;

/// Событие: агент нанёс удар (слушает и sound trigger)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AttackPerformed {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
}

/// Событие: урон применён к Health цели
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
}

/// Событие: агент погиб (Health == 0)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}

/// Компонент-маркер: entity мертв (Health == 0)
///
/// Трупы остаются на месте: actuator, separation и контроллеры их пропускают.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Dead;

/// Система: применение урона от AttackPerformed
///
/// Удары по уже мёртвым целям игнорируются (несколько атакующих в одном тике).
pub fn apply_damage(
    mut attacks: EventReader<AttackPerformed>,
    mut targets: Query<&mut Health, Without<Dead>>,
    mut damage_dealt: EventWriter<DamageDealt>,
    mut entity_died: EventWriter<EntityDied>,
) {
    for attack in attacks.read() {
        let Ok(mut health) = targets.get_mut(attack.target) else {
            continue;
        };

        if health.is_dead() {
            continue;
        }

        health.take_damage(attack.damage);

        damage_dealt.write(DamageDealt {
            attacker: attack.attacker,
            target: attack.target,
            damage: attack.damage,
        });

        crate::log(&format!(
            "Damage: {:?} → {:?} ({} dmg, hp {}/{})",
            attack.attacker, attack.target, attack.damage, health.current, health.max
        ));

        if health.is_dead() {
            entity_died.write(EntityDied {
                entity: attack.target,
                killer: Some(attack.attacker),
            });
            crate::log_info(&format!("{:?} killed by {:?}", attack.target, attack.attacker));
        }
    }
}

/// Система: отключение контроллеров при смерти
///
/// Добавляет Dead, останавливает движение, выключает wandering.
/// Смерть союзника помечает roster для переназначения слотов.
pub fn disable_ai_on_death(
    mut commands: Commands,
    mut death_events: EventReader<EntityDied>,
    mut agents: Query<(&mut MotionIntent, Option<&mut Wanderer>, Option<&AllyFollower>)>,
    roster: Option<ResMut<AllyRoster>>,
) {
    let mut roster = roster;

    for event in death_events.read() {
        let Ok(mut entity_commands) = commands.get_entity(event.entity) else {
            continue;
        };
        entity_commands.insert(Dead);

        if let Ok((mut intent, wanderer, follower)) = agents.get_mut(event.entity) {
            *intent = MotionIntent::stop();

            if let Some(mut wanderer) = wanderer {
                wanderer.disable();
            }

            if follower.is_some() {
                if let Some(roster) = roster.as_mut() {
                    roster.mark_dirty();
                }
            }
        }

        crate::log(&format!("Disabled AI for dead entity {:?}", event.entity));
    }
}
