//! AI decision-making module
//!
//! Три контроллера, каждый: явный FSM в компоненте:
//! - Wanderer: патрулирование (Waiting → Turning → Moving)
//! - CombatAI: преследование/атака/leash для hostile
//! - AllyFollower: formation за лидером
//!
//! Контроллеры пишут только MotionIntent; Transform меняет apply_motion_intents.

use bevy::prelude::*;

pub mod aggro;
pub mod ally;
pub mod combat_ai;
pub mod formation;
pub mod systems;
pub mod wandering;

#[cfg(test)]
mod combat_ai_tests;

// Re-export основных типов
pub use aggro::AggroMemory;
pub use ally::{AllyFollower, AllyRoster, FollowConfig, FollowMode, LeaderPose};
pub use combat_ai::{BehaviorMode, CombatAI, CombatConfig, CombatContext, CombatDecision, CombatState};
pub use formation::{slot_offset, slot_position, SlotOffset};
pub use wandering::{choose_waypoint, WanderConfig, WanderContext, WanderPhase, Wanderer, Waypoint};

use crate::movement::{apply_motion_intents, AnimationCue};
use crate::spatial::{refresh_spatial_index, ProtectedZones, SpatialIndex};
use crate::steering::separate_overlapping_agents;
use crate::SimulationSet;

/// AI Plugin
///
/// Регистрирует AI системы в FixedUpdate для детерминизма.
/// Порядок выполнения (фаза Behaviour):
/// 1. refresh_spatial_index: snapshot агентов на начало тика
/// 2. reassign_formation_slots: до follow в том же тике
/// 3. combat_ai_system: может подвесить Wanderer
/// 4. wandering_system
/// 5. ally_follow_system
/// 6. apply_motion_intents: единственная запись Transform
/// 7. separate_overlapping_agents: расталкивание перекрытий
///
/// Фаза Resolution (после apply_damage): aggro от урона, забыть погибших.
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpatialIndex>()
            .init_resource::<ProtectedZones>()
            .init_resource::<AllyRoster>()
            .add_event::<AnimationCue>();

        app.configure_sets(FixedUpdate, (SimulationSet::Behaviour, SimulationSet::Resolution).chain());

        app.add_systems(
            FixedUpdate,
            (
                refresh_spatial_index,
                systems::reassign_formation_slots,
                systems::combat_ai_system,
                systems::wandering_system,
                systems::ally_follow_system,
                apply_motion_intents,
                separate_overlapping_agents,
            )
                .chain() // Последовательное выполнение для детерминизма
                .in_set(SimulationSet::Behaviour),
        );

        app.add_systems(
            FixedUpdate,
            (systems::react_to_damage, systems::forget_dead_aggressors)
                .chain()
                .in_set(SimulationSet::Resolution)
                .after(crate::combat::damage::apply_damage),
        );
    }
}
