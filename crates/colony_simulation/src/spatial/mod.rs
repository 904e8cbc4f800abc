//! SpatialQuery: пространственные запросы для контроллеров
//!
//! Контроллеры не трогают World напрямую: в начале тика собирается
//! snapshot агентов (SpatialIndex), дальше все решения принимаются по нему.
//! Препятствия и граница мира регистрируются спавнером один раз.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::{flatten, horizontal_distance, horizontal_forward, Actor, Faction, Health, Velocity};

/// Категория препятствий для ray probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeLayer {
    /// Статические препятствия (камни, постройки)
    Obstacle,
    /// Граница игрового мира
    Boundary,
    /// Obstacle + Boundary
    Any,
}

/// Snapshot агента на начало тика
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub entity: Entity,
    pub faction: Faction,
    pub position: Vec3,
    /// Горизонтальное направление взгляда
    pub forward: Vec3,
    pub velocity: Vec3,
    pub health: u32,
}

impl AgentSnapshot {
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Абстракция "что вокруг меня"
///
/// Реализуется SpatialIndex (headless), в тестах: простыми fake-структурами.
pub trait SpatialQuery {
    /// Есть ли препятствие указанной категории на отрезке origin → origin + dir · distance
    fn ray_blocked(&self, origin: Vec3, direction: Vec3, distance: f32, layer: ProbeLayer) -> bool;

    /// Все агенты в горизонтальном радиусе
    fn agents_within(&self, center: Vec3, radius: f32) -> Vec<AgentSnapshot>;

    /// Snapshot конкретного агента (None если despawned)
    fn agent(&self, entity: Entity) -> Option<AgentSnapshot>;

    /// Соседи той же фракции (кроме себя)
    fn same_faction_neighbors(&self, me: Entity, center: Vec3, radius: f32, faction: Faction) -> Vec<AgentSnapshot> {
        self.agents_within(center, radius)
            .into_iter()
            .filter(|a| a.entity != me && a.faction == faction && a.is_alive())
            .collect()
    }

    /// Живые враждебные цели в detection volume
    fn detect_targets(&self, me: Entity, center: Vec3, radius: f32, faction: Faction) -> Vec<AgentSnapshot> {
        self.agents_within(center, radius)
            .into_iter()
            .filter(|a| a.entity != me && faction.is_hostile_to(a.faction) && a.is_alive())
            .collect()
    }
}

/// Круглое статическое препятствие
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
}

/// Прямоугольная граница мира в плоскости XZ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl WorldBounds {
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.y && point.z <= self.max.y
    }
}

/// Resource: пространственный индекс (obstacles + boundary + agents snapshot)
#[derive(Resource, Debug, Default)]
pub struct SpatialIndex {
    agents: Vec<AgentSnapshot>,
    lookup: HashMap<Entity, usize>,
    obstacles: Vec<Obstacle>,
    bounds: Option<WorldBounds>,
}

impl SpatialIndex {
    pub fn add_obstacle(&mut self, center: Vec3, radius: f32) {
        self.obstacles.push(Obstacle { center, radius });
    }

    pub fn set_bounds(&mut self, bounds: WorldBounds) {
        self.bounds = Some(bounds);
    }

    /// Пересобрать snapshot агентов (вызывается раз в тик)
    pub fn rebuild_agents(&mut self, agents: impl IntoIterator<Item = AgentSnapshot>) {
        self.agents.clear();
        self.lookup.clear();
        for snapshot in agents {
            self.lookup.insert(snapshot.entity, self.agents.len());
            self.agents.push(snapshot);
        }
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

/// Пересекает ли отрезок (XZ) круг препятствия
fn segment_hits_circle(origin: Vec3, direction: Vec3, distance: f32, obstacle: &Obstacle) -> bool {
    let dir = flatten(direction).normalize_or_zero();
    let to_center = flatten(obstacle.center - origin);

    // Ближайшая к центру точка отрезка
    let t = to_center.dot(dir).clamp(0.0, distance);
    let closest = dir * t;
    closest.distance(to_center) <= obstacle.radius
}

impl SpatialQuery for SpatialIndex {
    fn ray_blocked(&self, origin: Vec3, direction: Vec3, distance: f32, layer: ProbeLayer) -> bool {
        let check_obstacles = matches!(layer, ProbeLayer::Obstacle | ProbeLayer::Any);
        let check_boundary = matches!(layer, ProbeLayer::Boundary | ProbeLayer::Any);

        if check_obstacles
            && self
                .obstacles
                .iter()
                .any(|obstacle| segment_hits_circle(origin, direction, distance, obstacle))
        {
            return true;
        }

        if check_boundary {
            if let Some(bounds) = &self.bounds {
                let end = origin + flatten(direction).normalize_or_zero() * distance;
                return !bounds.contains(end);
            }
        }

        false
    }

    fn agents_within(&self, center: Vec3, radius: f32) -> Vec<AgentSnapshot> {
        self.agents
            .iter()
            .filter(|a| horizontal_distance(center, a.position) <= radius)
            .copied()
            .collect()
    }

    fn agent(&self, entity: Entity) -> Option<AgentSnapshot> {
        self.lookup.get(&entity).and_then(|&index| self.agents.get(index)).copied()
    }
}

/// Защищённая зона (база колонии): враги не преследуют цели внутри
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectedZone {
    pub center: Vec3,
    pub radius: f32,
}

/// Resource: список защищённых зон
#[derive(Resource, Debug, Clone, Default)]
pub struct ProtectedZones {
    pub zones: Vec<ProtectedZone>,
}

impl ProtectedZones {
    pub fn contains(&self, point: Vec3) -> bool {
        self.zones
            .iter()
            .any(|zone| horizontal_distance(zone.center, point) <= zone.radius)
    }
}

/// Система: пересборка snapshot агентов в начале тика
pub fn refresh_spatial_index(
    mut index: ResMut<SpatialIndex>,
    agents: Query<(Entity, &Actor, &Transform, &Health, &Velocity)>,
) {
    let mut snapshots: Vec<AgentSnapshot> = agents
        .iter()
        .map(|(entity, actor, transform, health, velocity)| AgentSnapshot {
            entity,
            faction: actor.faction,
            position: transform.translation,
            forward: horizontal_forward(transform.rotation),
            velocity: velocity.0,
            health: health.current,
        })
        .collect();

    // Стабильный порядок (по Entity index) для детерминизма
    snapshots.sort_by_key(|s| s.entity.index());
    index.rebuild_agents(snapshots);
}
