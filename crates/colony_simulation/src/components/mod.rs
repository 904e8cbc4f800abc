//! ECS Components для агентов колонии
//!
//! Организация по доменам:
//! - actor: базовые характеристики (faction, health)
//! - movement: кинематика агента (скорость, высота спавна, velocity, leader)
//!
//! Компоненты контроллеров (Wanderer, CombatAI, AllyFollower) живут рядом
//! со своей логикой в `crate::ai`.

pub mod actor;
pub mod movement;

// Re-exports для удобного импорта
pub use actor::*;
pub use movement::*;
