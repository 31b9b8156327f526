use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use mazecrawl_core::{
    Catalog, CellCoord, Command, EnemyStats, EnemyTier, EnemyType, Event, GameConfig,
};
use mazecrawl_system_enemy_ai::{Config, EnemyAi};
use mazecrawl_world::{self as world, query, World};

fn catalog() -> Catalog {
    let mut catalog = Catalog::default();
    for (id, ai, speed) in [("slime_green", "slime", 200), ("bat", "wander", 256)] {
        catalog.insert_enemy(EnemyType {
            id: id.to_owned(),
            name: id.to_owned(),
            stats: EnemyStats {
                health: 3,
                speed,
                ..EnemyStats::default()
            },
            tier: EnemyTier::Regular,
            element: None,
            ai: Some(ai.to_owned()),
            image: None,
            ping_color: None,
            backstory: None,
            sprite: None,
        });
    }
    catalog
}

fn config(seed: &str) -> GameConfig {
    let mut config = GameConfig {
        seed: Some(seed.to_owned()),
        ..GameConfig::default()
    };
    config.grid.columns = 48;
    config.grid.rows = 32;
    config.grid.rooms.count = 2;
    config.biomes.count = 2;
    config.biomes.radius = 6;
    config.biomes.carve_radius = 3;
    config.spawns.random_enemies = 16;
    config
}

fn run(world: &mut World, ai: &mut EnemyAi, ticks: u32, log: &mut Vec<Event>) {
    let dt = Duration::from_millis(100);
    for _ in 0..ticks {
        let mut events = Vec::new();
        world::apply(world, Command::Tick { dt }, &mut events);

        let enemies = query::enemy_view(world);
        let players = query::player_presence(world);
        let grid = query::grid(world);
        let dimensions = (grid.columns(), grid.rows());
        let mut commands = Vec::new();
        ai.handle(
            &events,
            &enemies,
            &players,
            dimensions,
            |cell: CellCoord| query::is_cell_blocked(world, cell),
            &mut commands,
        );
        for command in commands {
            world::apply(world, command, log);
        }
        assert!(world.verify_indices().is_ok());
    }
}

#[test]
fn enemies_wander_without_ever_overlapping() {
    let mut world = World::generate(catalog(), config("wander"));
    let mut ai = EnemyAi::new(Config::new(query::seed(&world)));
    let mut log = Vec::new();
    run(&mut world, &mut ai, 120, &mut log);

    let moves = log
        .iter()
        .filter(|event| matches!(event, Event::EnemyMoved { .. }))
        .count();
    assert!(moves > 0, "expected some enemy to move");
    for event in &log {
        if let Event::EnemyMoved { to, .. } = event {
            assert!(!query::grid(&world).is_wall(*to));
        }
    }
}

#[test]
fn frozen_enemies_receive_no_commands() {
    let mut config = config("frozen");
    config.enemies.move_enabled = false;
    let mut world = World::generate(catalog(), config);
    let before: Vec<CellCoord> = query::enemies(&world).iter().map(|enemy| enemy.cell()).collect();
    let mut ai = EnemyAi::new(Config::new(1));
    let mut log = Vec::new();
    run(&mut world, &mut ai, 60, &mut log);
    let after: Vec<CellCoord> = query::enemies(&world).iter().map(|enemy| enemy.cell()).collect();
    assert_eq!(before, after);
    assert!(log.is_empty());
}

#[test]
fn deterministic_replay_produces_identical_fingerprints() {
    let first = fingerprint("replay");
    let second = fingerprint("replay");
    assert_eq!(first, second, "replay diverged between runs");
}

fn fingerprint(seed: &str) -> u64 {
    let mut world = World::generate(catalog(), config(seed));
    let mut ai = EnemyAi::new(Config::new(query::seed(&world)));
    let mut log = Vec::new();
    run(&mut world, &mut ai, 90, &mut log);

    let mut hasher = DefaultHasher::new();
    for enemy in query::enemies(&world).iter() {
        enemy.id().hash(&mut hasher);
        enemy.cell().hash(&mut hasher);
    }
    for event in &log {
        if let Event::EnemyMoved { enemy, from, to } = event {
            enemy.hash(&mut hasher);
            from.hash(&mut hasher);
            to.hash(&mut hasher);
        }
    }
    hasher.finish()
}
