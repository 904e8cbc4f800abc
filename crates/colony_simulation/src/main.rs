//! Headless симуляция колонии
//!
//! Лидер обходит квадратный маршрут, союзники держат formation,
//! враждебные существа патрулируют территории и нападают на проходящих.
//!
//! Usage: colony_simulation [config.ron]

use bevy::prelude::*;
use colony_simulation::spawn::{spawn_ally, spawn_hostile, spawn_leader};
use colony_simulation::territory::safe_interior_point;
use colony_simulation::*;

const TICKS: usize = 3600;

/// Маршрут лидера (по кругу)
const ROUTE: [Vec3; 4] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(24.0, 0.0, 0.0),
    Vec3::new(24.0, 0.0, 24.0),
    Vec3::new(0.0, 0.0, 24.0),
];

/// Система: скриптовое движение лидера (вместо input)
fn drive_leader(mut leaders: Query<(&Transform, &mut MotionIntent), With<Leader>>, mut next: Local<usize>) {
    for (transform, mut intent) in leaders.iter_mut() {
        let target = ROUTE[*next % ROUTE.len()];
        let to_target = flatten(target - transform.translation);

        if to_target.length() < 0.5 {
            *next += 1;
        }

        *intent = MotionIntent::travel(to_target, 0.8, 6.0);
    }
}

fn load_config() -> SimulationConfig {
    let Some(path) = std::env::args().nth(1) else {
        return SimulationConfig::default();
    };

    let loaded = std::fs::read_to_string(&path)
        .map_err(|err| err.to_string())
        .and_then(|source| SimulationConfig::from_ron_str(&source).map_err(|err| err.to_string()));

    match loaded {
        Ok(config) => {
            log_info(&format!("Loaded config from {}", path));
            config
        }
        Err(err) => {
            log_error(&format!("Config {}: {} (using defaults)", path, err));
            SimulationConfig::default()
        }
    }
}

fn main() {
    init_logger();
    set_log_level(LogLevel::Info);

    let config = load_config();
    let seed = config.seed;
    println!("Starting colony headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.insert_resource(config.clone());
    app.add_plugins(SimulationPlugin);
    app.add_systems(FixedUpdate, drive_leader.before(SimulationSet::Behaviour));

    {
        let world = app.world_mut();

        let mut index = world.resource_mut::<SpatialIndex>();
        index.add_obstacle(Vec3::new(12.0, 0.0, 12.0), 2.0);
        index.set_bounds(WorldBounds {
            min: Vec2::splat(-40.0),
            max: Vec2::splat(60.0),
        });

        world.resource_mut::<ProtectedZones>().zones.push(ProtectedZone {
            center: Vec3::ZERO,
            radius: 4.0,
        });
    }

    {
        let mut commands = app.world_mut().commands();
        spawn_leader(&mut commands, Vec3::ZERO);
        for i in 0..3 {
            spawn_ally(&mut commands, Vec3::new(-1.0 - i as f32, 0.0, -2.0), &config);
        }

        let dens = [
            (Vec3::new(30.0, 0.0, 4.0), None, BehaviorMode::Aggressive),
            (Vec3::new(-10.0, 0.0, 30.0), Some(3.0), BehaviorMode::Territorial),
            (Vec3::new(12.0, 0.0, 34.0), None, BehaviorMode::Passive),
        ];
        for (center, inner, mode) in dens {
            let territory = match Territory::new(center, 8.0, inner) {
                Ok(territory) => territory,
                Err(err) => {
                    log_error(&format!("Skipping den at {:?}: {}", center, err));
                    continue;
                }
            };
            let start = safe_interior_point(center + Vec3::X, &territory);
            for _ in 0..2 {
                spawn_hostile(&mut commands, start, Some(territory), mode, &config);
            }
        }
    }
    app.world_mut().flush();

    for tick in 0..TICKS {
        app.update();

        if tick % 600 == 0 {
            log_summary(app.world_mut(), tick);
        }
    }

    log_summary(app.world_mut(), TICKS);
    println!("Simulation complete!");
}

fn log_summary(world: &mut World, tick: usize) {
    let mut hostiles = world.query_filtered::<&CombatAI, Without<Dead>>();
    let engaged = hostiles.iter(world).filter(|ai| ai.controls_motion()).count();
    let alive_hostiles = hostiles.iter(world).count();

    let mut allies = world.query_filtered::<&AllyFollower, Without<Dead>>();
    let catching_up = allies
        .iter(world)
        .filter(|ally| ally.mode() == FollowMode::CatchingUp)
        .count();
    let alive_allies = allies.iter(world).count();

    let mut dead = world.query_filtered::<(), With<Dead>>();
    let dead_count = dead.iter(world).count();

    log_info(&format!(
        "Tick {}: hostiles {} ({} engaged), allies {} ({} catching up), dead {}",
        tick, alive_hostiles, engaged, alive_allies, catching_up, dead_count
    ));
}
