//! ECS-обвязка контроллеров: Query → tick → MotionIntent

use bevy::prelude::*;

use super::ally::{AllyFollower, AllyRoster, FollowConfig, LeaderPose};
use super::combat_ai::{CombatAI, CombatConfig, CombatContext};
use super::wandering::{WanderConfig, WanderContext, Wanderer};
use crate::combat::{AttackPerformed, Attacker, DamageDealt, Dead, EntityDied};
use crate::components::{horizontal_forward, Actor, GroundHeight, Leader, MovementSpeed, Velocity};
use crate::movement::MotionIntent;
use crate::spatial::{ProtectedZones, SpatialIndex, SpatialQuery};
use crate::steering::AvoidanceConfig;
use crate::territory::TerritoryBinding;
use crate::DeterministicRng;

/// Система: переназначение formation slots при изменении roster
///
/// Новые союзники получают spawn order (по Entity index внутри тика),
/// удаление AllyFollower помечает roster, смерть помечает disable_ai_on_death.
pub fn reassign_formation_slots(
    mut roster: ResMut<AllyRoster>,
    mut removed: RemovedComponents<AllyFollower>,
    mut followers: Query<(Entity, &mut AllyFollower, Has<Dead>)>,
) {
    if removed.read().next().is_some() {
        roster.mark_dirty();
    }

    let mut fresh: Vec<Entity> = followers
        .iter()
        .filter(|(_, follower, _)| follower.spawn_order().is_none())
        .map(|(entity, _, _)| entity)
        .collect();
    fresh.sort_by_key(|entity| entity.index());

    for entity in fresh {
        if let Ok((_, mut follower, _)) = followers.get_mut(entity) {
            follower.set_spawn_order(roster.register());
        }
    }

    if !roster.is_dirty() {
        return;
    }

    let members: Vec<(u64, bool)> = followers
        .iter()
        .map(|(_, follower, dead)| (follower.spawn_order().unwrap_or(u64::MAX), !dead))
        .collect();
    let slots = roster.reassign(&members);

    for ((_, mut follower, _), slot) in followers.iter_mut().zip(slots) {
        if let Some(slot) = slot {
            if follower.slot != slot {
                follower.slot = slot;
            }
        }
    }

    crate::log(&format!("Formation: reassigned {} living allies", roster.living()));
}

/// Система: CombatAI (hostile): до wandering, чтобы подвесить Wanderer в том же тике
#[allow(clippy::type_complexity)]
pub fn combat_ai_system(
    mut hostiles: Query<
        (
            Entity,
            &Actor,
            &Transform,
            &mut CombatAI,
            &CombatConfig,
            &mut Wanderer,
            Option<&TerritoryBinding>,
            Option<&mut Attacker>,
            &mut MotionIntent,
        ),
        Without<Dead>,
    >,
    spatial: Res<SpatialIndex>,
    zones: Res<ProtectedZones>,
    time: Res<Time<Fixed>>,
    mut attacks: EventWriter<AttackPerformed>,
) {
    let now = time.elapsed_secs_f64();
    let delta = time.delta_secs();

    for (entity, actor, transform, mut ai, config, mut wanderer, binding, attacker, mut intent) in hostiles.iter_mut() {
        let ctx = CombatContext {
            entity,
            faction: actor.faction,
            position: transform.translation,
            rotation: transform.rotation,
            territory: binding.and_then(|b| b.get()),
            now,
            delta,
        };

        let decision = ai.tick(&ctx, config, &mut wanderer, spatial.as_ref(), &zones);

        if let Some(next) = decision.intent {
            *intent = next;
        }

        let (Some(target), Some(mut attacker)) = (decision.attack, attacker) else {
            continue;
        };

        if attacker.try_attack() {
            attacks.write(AttackPerformed {
                attacker: entity,
                target,
                damage: attacker.damage,
            });
        }
    }
}

/// Система: WanderingController
///
/// Если wanderer молчит и CombatAI не управляет движением: агент стоит.
#[allow(clippy::type_complexity)]
pub fn wandering_system(
    mut agents: Query<
        (
            &Transform,
            Option<&GroundHeight>,
            &MovementSpeed,
            &mut Wanderer,
            &WanderConfig,
            Option<&TerritoryBinding>,
            Option<&CombatAI>,
            &mut MotionIntent,
        ),
        Without<Dead>,
    >,
    spatial: Res<SpatialIndex>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (transform, ground, speed, mut wanderer, config, binding, combat, mut intent) in agents.iter_mut() {
        let ctx = WanderContext {
            position: transform.translation,
            rotation: transform.rotation,
            ground_height: ground.map_or(transform.translation.y, |g| g.0),
            max_speed: speed.max_speed,
        };
        let territory = binding.and_then(|b| b.get());

        match wanderer.tick(&ctx, config, territory, spatial.as_ref(), &mut rng.rng, delta) {
            Some(next) => *intent = next,
            None => {
                let combat_driving = combat.is_some_and(|c| c.controls_motion());
                if !combat_driving && intent.is_moving() {
                    *intent = MotionIntent::stop();
                }
            }
        }
    }
}

/// Система: AllyCoordinator (follow / catch-up)
#[allow(clippy::type_complexity)]
pub fn ally_follow_system(
    mut allies: Query<
        (
            Entity,
            &Actor,
            &Transform,
            &mut AllyFollower,
            &FollowConfig,
            &AvoidanceConfig,
            &mut MotionIntent,
        ),
        Without<Dead>,
    >,
    leaders: Query<(Entity, &Transform, &Velocity), (With<Leader>, Without<Dead>, Without<AllyFollower>)>,
    roster: Res<AllyRoster>,
    spatial: Res<SpatialIndex>,
) {
    // Лидер один; если их несколько: берём с наименьшим index (детерминизм)
    let leader = leaders
        .iter()
        .min_by_key(|(entity, _, _)| entity.index())
        .map(|(_, transform, velocity)| LeaderPose {
            position: transform.translation,
            forward: horizontal_forward(transform.rotation),
            velocity: velocity.0,
        });

    for (entity, actor, transform, mut follower, config, avoidance, mut intent) in allies.iter_mut() {
        let position = transform.translation;
        let neighbors: Vec<Vec3> = spatial
            .same_faction_neighbors(entity, position, avoidance.detection_radius, actor.faction)
            .into_iter()
            .map(|n| n.position)
            .collect();

        *intent = follower.tick(position, leader.as_ref(), roster.living(), &neighbors, config, avoidance);
    }
}

/// Система: урон → aggro memory (hostile запоминает агрессора)
pub fn react_to_damage(
    mut damage_events: EventReader<DamageDealt>,
    mut victims: Query<(&Actor, &mut CombatAI), Without<Dead>>,
    attackers: Query<&Actor>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();

    for event in damage_events.read() {
        let Ok((victim, mut ai)) = victims.get_mut(event.target) else {
            continue;
        };

        let Ok(attacker) = attackers.get(event.attacker) else {
            continue;
        };

        // Friendly fire: игнорируем
        if !victim.faction.is_hostile_to(attacker.faction) {
            continue;
        }

        ai.trigger_aggro(event.attacker, now);
        crate::log(&format!("{:?} hit by {:?} → aggro", event.target, event.attacker));
    }
}

/// Система: мёртвые агрессоры забываются
pub fn forget_dead_aggressors(mut death_events: EventReader<EntityDied>, mut hostiles: Query<&mut CombatAI>) {
    for event in death_events.read() {
        for mut ai in hostiles.iter_mut() {
            ai.forget(event.entity);
        }
    }
}
