use mazecrawl_core::{
    Catalog, CellCoord, Equipment, Event, FogMask, GameConfig, PlayerInput, PlayerSnapshot,
    SessionId, Slot,
};
use mazecrawl_system_bootstrap::{default_catalog, Bootstrap};
use mazecrawl_system_simulation::{event_session, Simulation, TickReport};
use mazecrawl_world::{query, World};
use proptest::prelude::*;

const OPEN_ROOM: [&str; 8] = [
    "############",
    "#..........#",
    "#..........#",
    "#..........#",
    "#..........#",
    "#..........#",
    "#..........#",
    "############",
];

fn quiet_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.player.spawn_chest = false;
    config.player.default_backpack = Some("backpack_small".to_owned());
    config.render.rays = 64;
    config
}

fn bundled_catalog() -> Catalog {
    default_catalog().expect("bundled catalog").catalog
}

fn room_simulation() -> Simulation {
    let world = World::from_ascii(bundled_catalog(), quiet_config(), &OPEN_ROOM);
    Simulation::new(world).expect("valid render settings")
}

fn facing_east(world: &World, cell: CellCoord) -> PlayerSnapshot {
    let grid = query::grid(world);
    let mut equipment = Equipment::default();
    let _ = equipment.insert(Slot::RightHand, "pickaxe_basic");
    let _ = equipment.insert(Slot::Backpack, "backpack_small");
    PlayerSnapshot {
        cell,
        angle: 0.0,
        seen: FogMask::new(grid.columns(), grid.rows()),
        stats: Default::default(),
        equipment,
        inventory: Vec::new(),
        backpack_weight_used: 0.0,
        character: None,
        known_lore: Vec::new(),
        tool_durability: Default::default(),
    }
}

fn small_bootstrap(seed: &str) -> Bootstrap {
    let mut config = GameConfig {
        seed: Some(seed.to_owned()),
        ..GameConfig::default()
    };
    config.grid.columns = 64;
    config.grid.rows = 48;
    config.grid.rooms.count = 3;
    config.biomes.count = 3;
    config.biomes.radius = 8;
    config.biomes.carve_radius = 3;
    config.ecology.carriers = 2;
    config.render.rays = 32;
    Bootstrap::with_defaults(config).expect("bundled catalog")
}

fn moved(report: &TickReport, session: &SessionId) -> bool {
    report
        .events_for(session)
        .any(|event| matches!(event, Event::PlayerMoved { .. }))
}

#[test]
fn thirty_ticks_deliver_ten_frames_per_player() {
    let mut simulation = room_simulation();
    let session = SessionId::new("viewer");
    simulation.session_joined(session.clone(), None);

    let mut delivered = Vec::new();
    for _ in 0..30 {
        let report = simulation.tick();
        for delivery in &report.frames {
            assert_eq!(delivery.session, session);
            delivered.push(report.tick);
        }
    }
    assert_eq!(delivered, vec![1, 4, 7, 10, 13, 16, 19, 22, 25, 28]);
}

#[test]
fn frames_match_the_configured_projection() {
    let mut simulation = room_simulation();
    let session = SessionId::new("viewer");
    simulation.session_joined(session.clone(), None);
    let report = simulation.tick();

    let frame = &report.frames[0].frame;
    assert_eq!(frame.width, 64);
    assert_eq!(frame.columns.len(), 64);
    assert_eq!(frame.height, 160);
    let player = query::player(simulation.world(), &session).expect("joined");
    assert!((frame.angle - player.angle()).abs() < 1e-6);
}

#[test]
fn the_latest_input_wins_within_a_tick() {
    let mut simulation = room_simulation();
    let session = SessionId::new("typist");
    let start = CellCoord::new(2, 2);
    let restore = facing_east(simulation.world(), start);
    simulation.session_joined(session.clone(), Some(restore));
    let _ = simulation.tick();

    assert_eq!(simulation.submit(session.clone(), PlayerInput::MoveForward), None);
    assert_eq!(
        simulation.submit(session.clone(), PlayerInput::RotateRight),
        Some(PlayerInput::MoveForward)
    );
    let report = simulation.tick();
    assert!(!moved(&report, &session));
    assert!(report
        .events_for(&session)
        .any(|event| matches!(event, Event::PlayerTurned { .. })));
    let player = query::player(simulation.world(), &session).expect("joined");
    assert_eq!(player.cell(), start);

    // Consumed inputs are not replayed.
    let idle = simulation.tick();
    assert_eq!(idle.events_for(&session).count(), 0);
}

#[test]
fn departures_hand_back_a_snapshot_and_drop_pending_input() {
    let mut simulation = room_simulation();
    let session = SessionId::new("leaver");
    simulation.session_joined(session.clone(), None);
    let _ = simulation.tick();

    let _ = simulation.submit(session.clone(), PlayerInput::MoveForward);
    simulation.request_unequip(session.clone(), Slot::RightHand);
    simulation.session_left(session.clone());
    let report = simulation.tick();

    let departures: Vec<_> = report.departures().collect();
    assert_eq!(departures.len(), 1);
    let (left, snapshot) = departures[0];
    assert_eq!(left, &session);
    assert_eq!(snapshot.equipment.get(Slot::RightHand), Some("pickaxe_basic"));
    assert!(!moved(&report, &session));
    assert!(report.frames.is_empty());
    assert!(query::player(simulation.world(), &session).is_none());

    let snapshot = snapshot.clone();
    simulation.session_joined(session.clone(), Some(snapshot.clone()));
    let rejoined = simulation.tick();
    assert!(rejoined.events.contains(&Event::PlayerJoined {
        session: session.clone(),
        cell: snapshot.cell,
        restored: true,
    }));
}

#[test]
fn equipment_requests_run_after_inputs() {
    let mut simulation = room_simulation();
    let session = SessionId::new("packer");
    let restore = facing_east(simulation.world(), CellCoord::new(2, 3));
    simulation.session_joined(session.clone(), Some(restore));
    let _ = simulation.tick();

    simulation.request_unequip(session.clone(), Slot::RightHand);
    simulation.request_equip(session.clone(), Slot::LeftHand, "pickaxe_basic");
    let report = simulation.tick();
    let changes: Vec<&Equipment> = report
        .events_for(&session)
        .filter_map(|event| match event {
            Event::EquipmentChanged { equipment, .. } => Some(equipment),
            _ => None,
        })
        .collect();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].get(Slot::RightHand), None);
    assert_eq!(changes[1].get(Slot::LeftHand), Some("pickaxe_basic"));

    simulation.request_drop(session.clone(), "pickaxe_basic");
    let refused = simulation.tick();
    assert!(refused
        .events_for(&session)
        .any(|event| matches!(event, Event::InteractionRejected { .. })));
}

#[test]
fn floor_bias_moves_dropped_items_on_screen() {
    let mut simulation = room_simulation();
    assert_eq!(simulation.floor_bias(), 4.0);
    let session = SessionId::new("dropper");
    let restore = facing_east(simulation.world(), CellCoord::new(2, 3));
    simulation.session_joined(session.clone(), Some(restore));
    simulation.request_unequip(session.clone(), Slot::RightHand);
    simulation.request_drop(session.clone(), "pickaxe_basic");

    let report = simulation.tick();
    assert!(report.events.contains(&Event::ItemDropped {
        session: session.clone(),
        item: "pickaxe_basic".to_owned(),
        cell: CellCoord::new(3, 3),
    }));
    let before = report.frames[0].frame.sprites.clone();
    assert_eq!(before.len(), 1);

    simulation.set_floor_bias(10.0);
    let after = loop {
        let report = simulation.tick();
        if let Some(delivery) = report.frames.into_iter().next() {
            break delivery.frame.sprites;
        }
    };
    assert_eq!(after[0].dest[1] - before[0].dest[1], 6);
    assert_eq!(after[0].dest[3], before[0].dest[3]);
}

#[test]
fn frames_show_other_players_but_never_the_viewer() {
    let mut simulation = room_simulation();
    let west = SessionId::new("west");
    let east = SessionId::new("east");
    let mut facing_west = facing_east(simulation.world(), CellCoord::new(7, 3));
    facing_west.angle = std::f32::consts::PI;
    let looking_east = facing_east(simulation.world(), CellCoord::new(2, 3));
    simulation.session_joined(west.clone(), Some(looking_east));
    simulation.session_joined(east.clone(), Some(facing_west));

    let report = simulation.tick();
    assert_eq!(report.frames.len(), 2);
    for delivery in &report.frames {
        assert_eq!(delivery.frame.sprites.len(), 1, "{}", delivery.session.as_str());
        assert_eq!(delivery.frame.sprites[0].image, "players/default.png");
        assert!((delivery.frame.sprites[0].depth - 5.0).abs() < 1e-4);
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let script = [
        PlayerInput::MoveForward,
        PlayerInput::RotateLeft,
        PlayerInput::MoveForward,
        PlayerInput::InteractRight,
        PlayerInput::StrafeRight,
        PlayerInput::RotateRight,
    ];
    let run = || {
        let mut simulation = Simulation::new(small_bootstrap("replay").generate()).expect("sim");
        let sessions = [SessionId::new("a"), SessionId::new("b")];
        for session in &sessions {
            simulation.session_joined(session.clone(), None);
        }
        let mut reports = Vec::new();
        for step in 0..90 {
            for (offset, session) in sessions.iter().enumerate() {
                let _ = simulation.submit(session.clone(), script[(step + offset) % script.len()]);
            }
            reports.push(simulation.tick());
        }
        reports
    };
    assert_eq!(run(), run());
}

#[test]
fn events_are_routed_to_their_session() {
    let session = SessionId::new("owner");
    assert_eq!(
        event_session(&Event::PlayerTurned {
            session: session.clone(),
            target_angle: 0.0,
        }),
        Some(&session)
    );
    assert_eq!(
        event_session(&Event::WallBroken {
            cell: CellCoord::new(1, 1),
        }),
        None
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn occupancy_stays_exclusive_under_random_input(
        inputs in prop::collection::vec((0usize..3, 0usize..8), 1..120),
    ) {
        let mut simulation = Simulation::new(small_bootstrap("occupancy").generate()).expect("sim");
        let sessions: Vec<SessionId> = (0..3).map(|n| SessionId::new(format!("p{n}"))).collect();
        for session in &sessions {
            simulation.session_joined(session.clone(), None);
        }
        for (who, what) in inputs {
            let _ = simulation.submit(sessions[who].clone(), PlayerInput::ALL[what]);
            let _ = simulation.tick();

            let world = simulation.world();
            prop_assert!(world.verify_indices().is_ok());
            let mut cells: Vec<CellCoord> = query::players(world)
                .iter()
                .map(|player| player.cell())
                .chain(query::enemies(world).iter().map(|enemy| enemy.cell()))
                .collect();
            for cell in &cells {
                prop_assert!(!query::grid(world).is_wall(*cell));
            }
            let total = cells.len();
            cells.sort_unstable();
            cells.dedup();
            prop_assert_eq!(cells.len(), total);
        }
    }
}
