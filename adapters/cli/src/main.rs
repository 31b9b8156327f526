#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless driver that generates a dungeon and walks scripted bots through it.

mod bots;
mod snapshot_transfer;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result as AnyResult};
use clap::{Parser, ValueEnum};
use mazecrawl_core::{CellCoord, Event, GameConfig, SessionId, WELCOME_BANNER};
use mazecrawl_system_bootstrap::{
    load_catalog, parse_config, parse_config_json, Bootstrap, CatalogLoad, CatalogSources,
};
use mazecrawl_system_simulation::{event_session, Simulation, TickReport};
use mazecrawl_world::query;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "mazecrawl", about = "Run the dungeon simulation headless")]
struct Args {
    /// Game configuration file, TOML unless the extension is `.json`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding catalog tables; missing tables use the bundled ones.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Seed phrase, overriding the configuration.
    #[arg(long)]
    seed: Option<String>,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 300)]
    ticks: u64,

    /// Number of scripted bot sessions.
    #[arg(long, default_value_t = 2)]
    bots: usize,

    /// Snapshot token restoring the first bot.
    #[arg(long)]
    restore: Option<String>,

    /// Print a snapshot token for every bot when the run ends.
    #[arg(long)]
    export: bool,

    /// Floor-line bias for item billboards, in pixels.
    #[arg(long)]
    floor_bias: Option<f32>,

    /// Summary format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Default, Serialize)]
struct SessionSummary {
    frames: u32,
    moves: u32,
    rejected: u32,
    items_gained: u32,
    cell: Option<CellCoord>,
    seen: u32,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    columns: u32,
    rows: u32,
    enemies: usize,
    entities: usize,
    enemy_steps: u32,
    attack_intents: u32,
    walls_broken: u32,
    sessions: BTreeMap<String, SessionSummary>,
}

fn main() -> AnyResult<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let bootstrap = bootstrap(&args)?;
    let world = bootstrap.generate();
    let mut simulation = Simulation::new(world).context("invalid render settings")?;
    if let Some(bias) = args.floor_bias {
        simulation.set_floor_bias(bias);
    }

    let sessions: Vec<SessionId> = (0..args.bots)
        .map(|bot| SessionId::new(format!("bot-{bot}")))
        .collect();
    let restore = args
        .restore
        .as_deref()
        .map(snapshot_transfer::decode)
        .transpose()
        .context("could not read the restore token")?;
    for (index, session) in sessions.iter().enumerate() {
        let snapshot = if index == 0 { restore.clone() } else { None };
        simulation.session_joined(session.clone(), snapshot);
    }

    let mut summary = Summary {
        seed: query::seed(simulation.world()),
        ticks: args.ticks,
        columns: query::grid(simulation.world()).columns(),
        rows: query::grid(simulation.world()).rows(),
        enemies: query::enemies(simulation.world()).len(),
        entities: query::entities(simulation.world()).len(),
        enemy_steps: 0,
        attack_intents: 0,
        walls_broken: 0,
        sessions: sessions
            .iter()
            .map(|session| (session.to_string(), SessionSummary::default()))
            .collect(),
    };
    info!(seed = summary.seed, bots = sessions.len(), "run started");

    for _ in 0..args.ticks {
        let tick = query::tick_index(simulation.world());
        for (bot, session) in sessions.iter().enumerate() {
            if let Some(input) = bots::scripted_input(bot, tick) {
                let _ = simulation.submit(session.clone(), input);
            }
        }
        let report = simulation.tick();
        tally(&mut summary, &report);
    }

    for session in &sessions {
        simulation.session_left(session.clone());
    }
    let last = simulation.tick();
    tally(&mut summary, &last);
    for (session, snapshot) in last.departures() {
        let Some(entry) = summary.sessions.get_mut(session.as_str()) else {
            continue;
        };
        entry.cell = Some(snapshot.cell);
        entry.seen = snapshot.seen.seen_count();
        if args.export {
            entry.token = Some(snapshot_transfer::encode(snapshot)?);
        }
    }

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        Format::Text => print_text(&summary),
    }
    Ok(())
}

fn bootstrap(args: &Args) -> AnyResult<Bootstrap> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => GameConfig::default(),
    };
    if let Some(seed) = &args.seed {
        config.seed = Some(seed.clone());
    }
    let load = match &args.catalog {
        Some(dir) => read_catalog(dir)?,
        None => load_catalog(CatalogSources::bundled())?,
    };
    if !load.skipped.is_empty() {
        info!(skipped = load.skipped.len(), "catalog entries skipped");
    }
    Ok(Bootstrap::new(load.catalog, config))
}

fn read_config(path: &Path) -> AnyResult<GameConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read config {}", path.display()))?;
    let config = if path.extension().is_some_and(|extension| extension == "json") {
        parse_config_json(&text)?
    } else {
        parse_config(&text)?
    };
    Ok(config)
}

fn read_catalog(dir: &Path) -> AnyResult<CatalogLoad> {
    let read = |name: &str| -> AnyResult<Option<String>> {
        let path = dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("could not read catalog table {}", path.display()))
    };
    let items = read("items.json")?;
    let enemies = read("enemies.json")?;
    let walls = read("walls.json")?;
    let map_entities = read("map_entities.json")?;

    let bundled = CatalogSources::bundled();
    let sources = CatalogSources {
        items: items.as_deref().or(bundled.items),
        enemies: enemies.as_deref().or(bundled.enemies),
        walls: walls.as_deref().or(bundled.walls),
        map_entities: map_entities.as_deref().or(bundled.map_entities),
    };
    Ok(load_catalog(sources)?)
}

fn tally(summary: &mut Summary, report: &TickReport) {
    for delivery in &report.frames {
        if let Some(entry) = summary.sessions.get_mut(delivery.session.as_str()) {
            entry.frames += 1;
        }
    }
    for event in &report.events {
        match event {
            Event::EnemyMoved { .. } => summary.enemy_steps += 1,
            Event::EnemyAttackIntended { .. } => summary.attack_intents += 1,
            Event::WallBroken { .. } => summary.walls_broken += 1,
            _ => {}
        }
        let Some(entry) = event_session(event).and_then(|session| {
            summary.sessions.get_mut(session.as_str())
        }) else {
            continue;
        };
        match event {
            Event::PlayerMoved { .. } => entry.moves += 1,
            Event::MoveRejected { .. } | Event::InteractionRejected { .. } => entry.rejected += 1,
            Event::ItemPickedUp { .. } => entry.items_gained += 1,
            Event::ContainerLooted { moved, .. } => entry.items_gained += moved,
            _ => {}
        }
    }
}

fn print_text(summary: &Summary) {
    println!("{WELCOME_BANNER}");
    println!(
        "seed {} | {}x{} tiles | {} enemies | {} entities | {} ticks",
        summary.seed, summary.columns, summary.rows, summary.enemies, summary.entities, summary.ticks
    );
    println!(
        "enemy steps {} | attack intents {} | walls broken {}",
        summary.enemy_steps, summary.attack_intents, summary.walls_broken
    );
    for (session, entry) in &summary.sessions {
        let cell = entry
            .cell
            .map_or_else(|| "-".to_owned(), |cell| format!("({}, {})", cell.column(), cell.row()));
        println!(
            "{session}: {} frames, {} moves, {} rejected, {} items, ended at {cell}, {} tiles seen",
            entry.frames, entry.moves, entry.rejected, entry.items_gained, entry.seen
        );
        if let Some(token) = &entry.token {
            println!("{session} token {token}");
        }
    }
}
