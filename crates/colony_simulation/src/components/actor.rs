//! Базовые компоненты акторов: Actor, Faction, Health

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::movement::{AnimationState, MotionIntent};
use crate::components::{MovementSpeed, Velocity};

/// Фракция агента
///
/// Hostile: дикие существа с территориями.
/// Ally: союзники колонии (следуют за лидером).
/// Player: лидер, управляется внешним input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum Faction {
    #[default]
    Hostile,
    Ally,
    Player,
}

impl Faction {
    /// Враждебны ли две фракции друг другу (Ally и Player: одна сторона)
    pub fn is_hostile_to(self, other: Faction) -> bool {
        match (self, other) {
            (Faction::Hostile, Faction::Hostile) => false,
            (Faction::Hostile, _) | (_, Faction::Hostile) => true,
            _ => false,
        }
    }
}

/// Актор (враг, союзник, лидер): базовый компонент для живых существ
///
/// Автоматически добавляет Health, кинематику и actuation компоненты через Required Components.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(Health, MovementSpeed, Velocity, MotionIntent, AnimationState)]
pub struct Actor {
    pub faction: Faction,
}

impl Actor {
    pub fn new(faction: Faction) -> Self {
        Self { faction }
    }
}

/// Здоровье актора
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100) // Default 100 HP
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn is_dead(&self) -> bool {
        !self.is_alive()
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }
}
