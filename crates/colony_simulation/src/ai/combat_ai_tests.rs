//! Tests for CombatAI state machine.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use crate::ai::combat_ai::*;
    use crate::ai::wandering::{WanderPhase, Wanderer};
    use crate::components::Faction;
    use crate::spatial::{AgentSnapshot, ProbeLayer, ProtectedZone, ProtectedZones, SpatialQuery};
    use crate::territory::Territory;

    const DT: f32 = 1.0 / 60.0;

    /// Список агентов без препятствий
    #[derive(Default)]
    struct FakeWorld {
        agents: Vec<AgentSnapshot>,
    }

    impl FakeWorld {
        fn with(agents: Vec<AgentSnapshot>) -> Self {
            Self { agents }
        }

        fn move_agent(&mut self, entity: Entity, position: Vec3) {
            if let Some(agent) = self.agents.iter_mut().find(|a| a.entity == entity) {
                agent.position = position;
            }
        }

        fn kill(&mut self, entity: Entity) {
            if let Some(agent) = self.agents.iter_mut().find(|a| a.entity == entity) {
                agent.health = 0;
            }
        }
    }

    impl SpatialQuery for FakeWorld {
        fn ray_blocked(&self, _: Vec3, _: Vec3, _: f32, _: ProbeLayer) -> bool {
            false
        }
        fn agents_within(&self, center: Vec3, radius: f32) -> Vec<AgentSnapshot> {
            self.agents
                .iter()
                .filter(|a| crate::components::horizontal_distance(center, a.position) <= radius)
                .copied()
                .collect()
        }
        fn agent(&self, entity: Entity) -> Option<AgentSnapshot> {
            self.agents.iter().find(|a| a.entity == entity).copied()
        }
    }

    fn player(index: u32, position: Vec3) -> AgentSnapshot {
        AgentSnapshot {
            entity: Entity::from_raw(index),
            faction: Faction::Player,
            position,
            forward: Vec3::NEG_Z,
            velocity: Vec3::ZERO,
            health: 100,
        }
    }

    fn ctx(position: Vec3, territory: Option<&Territory>, now: f64) -> CombatContext<'_> {
        CombatContext {
            entity: Entity::from_raw(1),
            faction: Faction::Hostile,
            position,
            rotation: Quat::IDENTITY,
            territory,
            now,
            delta: DT,
        }
    }

    #[test]
    fn test_passive_never_chases_unprovoked() {
        let config = CombatConfig::default();
        let world = FakeWorld::with(vec![player(10, Vec3::new(2.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::new(BehaviorMode::Passive);
        let mut wanderer = Wanderer::default();

        for tick in 0..600 {
            let now = tick as f64 * DT as f64;
            let decision = ai.tick(&ctx(Vec3::ZERO, None, now), &config, &mut wanderer, &world, &zones);
            assert_eq!(decision.intent, None);
            assert_eq!(decision.attack, None);
            assert_eq!(*ai.state(), CombatState::Wandering);
        }
        assert!(wanderer.is_enabled());
    }

    #[test]
    fn test_passive_chases_aggressor_until_memory_expires() {
        let config = CombatConfig::default();
        let aggressor = Entity::from_raw(10);
        let world = FakeWorld::with(vec![player(10, Vec3::new(6.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::new(BehaviorMode::Passive);
        let mut wanderer = Wanderer::default();

        ai.trigger_aggro(aggressor, 1.0);
        let decision = ai.tick(&ctx(Vec3::ZERO, None, 1.1), &config, &mut wanderer, &world, &zones);

        assert_eq!(*ai.state(), CombatState::Chasing { target: aggressor });
        assert!(decision.intent.unwrap().is_moving());
        assert!(!wanderer.is_enabled());

        // Память истекла (1.0 + 5.0) → успокоились
        let decision = ai.tick(&ctx(Vec3::ZERO, None, 6.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);
        assert_eq!(decision.intent, None);
        assert!(!ai.aggro().has_been_attacked());
        assert!(matches!(wanderer.phase(), WanderPhase::Planning { .. }));
    }

    #[test]
    fn test_aggressive_chase_then_attack_with_hysteresis() {
        let config = CombatConfig::default();
        let target = Entity::from_raw(10);
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(5.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::new(BehaviorMode::Aggressive);
        let mut wanderer = Wanderer::default();

        let decision = ai.tick(&ctx(Vec3::ZERO, None, 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Chasing { target });
        let intent = decision.intent.unwrap();
        assert!(intent.is_moving());
        assert!(intent.direction.dot(Vec3::X) > 0.99);
        assert_eq!(decision.attack, None);

        world.move_agent(target, Vec3::new(1.0, 0.0, 0.0));
        let decision = ai.tick(&ctx(Vec3::ZERO, None, 0.1), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Attacking { target });
        assert!(!decision.intent.unwrap().is_moving());
        assert_eq!(decision.attack, Some(target));

        // 1.7 < 1.5 · 1.2: остаёмся в Attacking
        world.move_agent(target, Vec3::new(1.7, 0.0, 0.0));
        ai.tick(&ctx(Vec3::ZERO, None, 0.2), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Attacking { target });

        world.move_agent(target, Vec3::new(2.5, 0.0, 0.0));
        let decision = ai.tick(&ctx(Vec3::ZERO, None, 0.3), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Chasing { target });
        assert_eq!(decision.attack, None);
    }

    #[test]
    fn test_closest_target_wins() {
        let config = CombatConfig::default();
        let world = FakeWorld::with(vec![
            player(10, Vec3::new(8.0, 0.0, 0.0)),
            player(11, Vec3::new(0.0, 0.0, -3.0)),
        ]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::default();
        let mut wanderer = Wanderer::default();

        ai.tick(&ctx(Vec3::ZERO, None, 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(ai.target(), Some(Entity::from_raw(11)));
    }

    #[test]
    fn test_kill_freezes_pose_then_resumes_wandering() {
        let config = CombatConfig::default();
        let target = Entity::from_raw(10);
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(1.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::default();
        let mut wanderer = Wanderer::default();
        let position = Vec3::new(0.0, 0.0, 0.0);

        ai.tick(&ctx(position, None, 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Attacking { target });

        world.kill(target);
        let decision = ai.tick(&ctx(position, None, DT as f64), &config, &mut wanderer, &world, &zones);
        let intent = decision.intent.unwrap();
        assert!(intent.pinned);
        assert_eq!(intent.snap_to, Some(position));
        assert!(matches!(ai.state(), CombatState::StandingDown { .. }));

        // Весь stand down: поза зафиксирована, цель не ищем
        let freeze_ticks = (config.stand_down_duration / DT) as usize - 2;
        for tick in 0..freeze_ticks {
            let now = (tick + 2) as f64 * DT as f64;
            let decision = ai.tick(&ctx(position, None, now), &config, &mut wanderer, &world, &zones);
            assert!(decision.intent.unwrap().pinned, "tick {}", tick);
            assert_eq!(decision.attack, None);
        }

        let mut resumed = false;
        for tick in 0..10 {
            let decision = ai.tick(&ctx(position, None, 4.0 + tick as f64 * 0.01), &config, &mut wanderer, &world, &zones);
            if *ai.state() == CombatState::Wandering {
                assert_eq!(decision.intent, None);
                resumed = true;
                break;
            }
        }
        assert!(resumed);
        assert!(matches!(wanderer.phase(), WanderPhase::Planning { .. }));
    }

    #[test]
    fn test_hard_leash_returns_to_territory() {
        let config = CombatConfig::default();
        let territory = Territory::disc(Vec3::ZERO, 10.0).unwrap();
        let world = FakeWorld::with(vec![player(10, Vec3::new(20.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::default();
        let mut wanderer = Wanderer::default();

        // Цель в detection radius, агент уже на 19 (9 > 8 за outer)
        ai.tick(&ctx(Vec3::new(11.0, 0.0, 0.0), Some(&territory), 0.0), &config, &mut wanderer, &world, &zones);
        assert!(matches!(ai.state(), CombatState::Chasing { .. }));

        let decision = ai.tick(&ctx(Vec3::new(19.0, 0.0, 0.0), Some(&territory), 0.1), &config, &mut wanderer, &world, &zones);
        let CombatState::ReturningToTerritory { destination, start_distance } = *ai.state() else {
            panic!("expected ReturningToTerritory, got {:?}", ai.state());
        };
        assert_eq!(destination, Vec3::ZERO);
        assert!((start_distance - 19.0).abs() < 1e-4);
        assert!(decision.intent.unwrap().direction.dot(Vec3::NEG_X) > 0.99);

        // Пока не прошли 75% пути: продолжаем возврат, цель игнорируем
        ai.tick(&ctx(Vec3::new(8.0, 0.0, 0.0), Some(&territory), 0.2), &config, &mut wanderer, &world, &zones);
        assert!(matches!(ai.state(), CombatState::ReturningToTerritory { .. }));

        ai.tick(&ctx(Vec3::new(4.5, 0.0, 0.0), Some(&territory), 0.3), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);
        assert!(wanderer.is_enabled());
    }

    #[test]
    fn test_soft_leash_drops_escaped_target() {
        let config = CombatConfig::default();
        let territory = Territory::disc(Vec3::ZERO, 10.0).unwrap();
        let target = Entity::from_raw(10);
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(12.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::default();
        let mut wanderer = Wanderer::default();

        ai.tick(&ctx(Vec3::new(9.0, 0.0, 0.0), Some(&territory), 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(ai.target(), Some(target));

        // Агент на 13 (3 > 2), цель на 15 (5 > 4)
        world.move_agent(target, Vec3::new(15.0, 0.0, 0.0));
        let decision = ai.tick(&ctx(Vec3::new(13.0, 0.0, 0.0), Some(&territory), 0.1), &config, &mut wanderer, &world, &zones);

        assert_eq!(*ai.state(), CombatState::Wandering);
        assert_eq!(decision.intent, None);
        let WanderPhase::Planning { direction: Some(direction) } = *wanderer.phase() else {
            panic!("expected directed waypoint, got {:?}", wanderer.phase());
        };
        assert!(direction.dot(Vec3::NEG_X) > 0.99);

        // Не подхватываем ту же цель сразу снова
        ai.tick(&ctx(Vec3::new(13.0, 0.0, 0.0), Some(&territory), 0.2), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);
    }

    #[test]
    fn test_territorial_ignores_targets_outside_margin() {
        let config = CombatConfig::default();
        let territory = Territory::disc(Vec3::ZERO, 10.0).unwrap();
        let target = Entity::from_raw(10);
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(14.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::new(BehaviorMode::Territorial);
        let mut wanderer = Wanderer::default();
        let position = Vec3::new(8.0, 0.0, 0.0);

        ai.tick(&ctx(position, Some(&territory), 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);

        world.move_agent(target, Vec3::new(11.5, 0.0, 0.0));
        ai.tick(&ctx(position, Some(&territory), 0.1), &config, &mut wanderer, &world, &zones);
        assert_eq!(ai.target(), Some(target));

        // Цель вышла за territory + margin → бросаем
        world.move_agent(target, Vec3::new(12.5, 0.0, 0.0));
        ai.tick(&ctx(position, Some(&territory), 0.2), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);
    }

    #[test]
    fn test_territorial_ring_ignores_targets_in_hole() {
        let config = CombatConfig::default();
        let territory = Territory::ring(Vec3::ZERO, 6.0, 10.0).unwrap();
        let target = Entity::from_raw(10);
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(0.5, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::new(BehaviorMode::Territorial);
        let mut wanderer = Wanderer::default();
        let position = Vec3::new(7.0, 0.0, 0.0);

        // Цель в исключённом центре кольца: не наша территория
        ai.tick(&ctx(position, Some(&territory), 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);

        // 5m: внутри inner - margin (4m) → преследуем
        world.move_agent(target, Vec3::new(5.0, 0.0, 0.0));
        ai.tick(&ctx(position, Some(&territory), 0.1), &config, &mut wanderer, &world, &zones);
        assert_eq!(ai.target(), Some(target));

        // Цель ушла в дыру → бросаем
        world.move_agent(target, Vec3::new(0.5, 0.0, 0.0));
        ai.tick(&ctx(position, Some(&territory), 0.2), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);
    }

    #[test]
    fn test_territorial_without_territory_acts_aggressive() {
        let config = CombatConfig::default();
        let world = FakeWorld::with(vec![player(10, Vec3::new(40.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::new(BehaviorMode::Territorial);
        let mut wanderer = Wanderer::default();

        ai.tick(&ctx(Vec3::new(35.0, 0.0, 0.0), None, 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(ai.target(), Some(Entity::from_raw(10)));
    }

    #[test]
    fn test_protected_zone_shields_target() {
        let config = CombatConfig::default();
        let target = Entity::from_raw(10);
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(4.0, 0.0, 0.0))]);
        let zones = ProtectedZones {
            zones: vec![ProtectedZone { center: Vec3::new(10.0, 0.0, 0.0), radius: 3.0 }],
        };
        let mut ai = CombatAI::default();
        let mut wanderer = Wanderer::default();

        ai.tick(&ctx(Vec3::ZERO, None, 0.0), &config, &mut wanderer, &world, &zones);
        assert_eq!(ai.target(), Some(target));

        world.move_agent(target, Vec3::new(8.0, 0.0, 0.0));
        ai.tick(&ctx(Vec3::ZERO, None, 0.1), &config, &mut wanderer, &world, &zones);
        assert_eq!(*ai.state(), CombatState::Wandering);
        assert!(matches!(wanderer.phase(), WanderPhase::Planning { .. }));
    }

    #[test]
    fn test_despawned_target_resumes_wandering() {
        let config = CombatConfig::default();
        let mut world = FakeWorld::with(vec![player(10, Vec3::new(4.0, 0.0, 0.0))]);
        let zones = ProtectedZones::default();
        let mut ai = CombatAI::default();
        let mut wanderer = Wanderer::default();

        ai.tick(&ctx(Vec3::ZERO, None, 0.0), &config, &mut wanderer, &world, &zones);
        assert!(ai.controls_motion());

        world.agents.clear();
        ai.tick(&ctx(Vec3::ZERO, None, 0.1), &config, &mut wanderer, &world, &zones);
        assert!(!ai.controls_motion());
        assert!(wanderer.is_enabled());
    }
}
