#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Mazecrawl.
//!
//! The [`World`] owns the generated grid, the biome field, wall durability,
//! every placed entity, enemy instances and connected players. Mutation flows
//! exclusively through [`apply`]; everything else reads through [`query`].

use std::collections::BTreeSet;

use mazecrawl_core::{
    Catalog, CellCoord, Command, Event, GameConfig, MoveRejection, Position, SpriteDescriptor,
    Tile,
};
use tracing::info;

mod biome;
mod ecology;
mod enemies;
mod entities;
mod grid;
mod interaction;
mod maze;
mod occupancy;
mod placement;
mod player;
mod seeding;
mod walls;

pub use biome::{BiomeCenter, BiomeField};
pub use ecology::{LoreEntry, LoreTopic};
pub use enemies::{Affinity, Enemy, EnemyRoster};
pub use entities::{
    Container, ContainerKind, ContainerSlot, EntityStore, GroundItem, Prop, PropKind, WorldEntity,
};
pub use grid::TileGrid;
pub use player::{Player, PlayerRoster};
pub use walls::{StrikeError, StrikeOutcome, WallState, FALLBACK_WALL_TYPE};

use seeding::WorldRng;

/// Derived index that disagrees with the state it mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IndexMismatch {
    /// Player occupancy differs from player positions.
    #[error("player occupancy disagrees with player positions")]
    Players,
    /// Enemy occupancy differs from enemy positions.
    #[error("enemy occupancy disagrees with enemy positions")]
    Enemies,
    /// A player and an enemy claim the same cell.
    #[error("a player and an enemy share cell {0:?}")]
    SharedCell(CellCoord),
    /// The solid-cell index differs from the non-floor entities.
    #[error("solid-cell index disagrees with placed entities")]
    SolidCells,
    /// Wall hit points disagree with the tile grid.
    #[error("wall durability disagrees with the tile grid")]
    Walls,
}

/// Represents the authoritative Mazecrawl world state.
#[derive(Debug)]
pub struct World {
    catalog: Catalog,
    config: GameConfig,
    seed: u64,
    rng: WorldRng,
    grid: TileGrid,
    biomes: BiomeField,
    walls: WallState,
    doors: BTreeSet<CellCoord>,
    entities: EntityStore,
    enemies: EnemyRoster,
    players: PlayerRoster,
    lore: Vec<LoreEntry>,
    clock: f64,
    ticks: u64,
}

impl World {
    /// Generates a complete world: maze, rooms, biomes, wall durability and
    /// every placed entity, all derived from the configured seed.
    #[must_use]
    pub fn generate(catalog: Catalog, config: GameConfig) -> Self {
        let seed = seeding::world_seed(config.seed.as_deref());
        let mut rng = seeding::rng_from_seed(seed);
        let mut grid = TileGrid::filled(config.grid.columns, config.grid.rows, Tile::Wall);
        maze::carve_maze(&mut grid, &config.grid, &mut rng);

        let closed_doors = config
            .walls
            .door_type
            .as_deref()
            .is_some_and(|id| catalog.wall(id).is_some());
        let rooms = maze::stamp_rooms(&mut grid, &config.grid, closed_doors, &mut rng);
        let biomes = biome::generate(&mut grid, &config.biomes, &mut rng);
        maze::clear_spawn_zone(&mut grid);

        let doors: BTreeSet<CellCoord> = rooms
            .iter()
            .flat_map(|room| room.doors.iter().copied())
            .filter(|cell| grid.is_wall(*cell))
            .collect();
        let walls = WallState::generate(&grid, &biomes, &catalog, &config.walls, &doors);

        let (columns, rows) = (grid.columns(), grid.rows());
        let mut world = Self {
            catalog,
            config,
            seed,
            rng,
            grid,
            biomes,
            walls,
            doors,
            entities: EntityStore::default(),
            enemies: EnemyRoster::new(columns, rows),
            players: PlayerRoster::new(columns, rows),
            lore: Vec::new(),
            clock: 0.0,
            ticks: 0,
        };
        placement::populate(&mut world);
        info!(
            seed,
            columns,
            rows,
            rooms = rooms.len(),
            walls = world.grid.count(Tile::Wall),
            biomes = world.biomes.centers().len(),
            "world generated"
        );
        world
    }

    /// Builds an unpopulated world from an ASCII layout where `#` marks a
    /// wall and any other character an empty tile.
    ///
    /// The layout replaces the configured grid dimensions. No biomes, entities
    /// or enemies are placed, which makes hand-written scenarios predictable.
    #[must_use]
    pub fn from_ascii(catalog: Catalog, mut config: GameConfig, rows: &[&str]) -> Self {
        let seed = seeding::world_seed(config.seed.as_deref());
        let grid = TileGrid::parse(rows);
        config.grid.columns = grid.columns();
        config.grid.rows = grid.rows();
        let biomes = BiomeField::empty(grid.columns(), grid.rows());
        let doors = BTreeSet::new();
        let walls = WallState::generate(&grid, &biomes, &catalog, &config.walls, &doors);
        let (columns, rows) = (grid.columns(), grid.rows());
        Self {
            catalog,
            config,
            seed,
            rng: seeding::rng_from_seed(seed),
            grid,
            biomes,
            walls,
            doors,
            entities: EntityStore::default(),
            enemies: EnemyRoster::new(columns, rows),
            players: PlayerRoster::new(columns, rows),
            lore: Vec::new(),
            clock: 0.0,
            ticks: 0,
        }
    }

    /// Recomputes every derived index from scratch and compares it with the
    /// incrementally maintained one.
    pub fn verify_indices(&self) -> Result<(), IndexMismatch> {
        if !self.players.index_is_consistent() {
            return Err(IndexMismatch::Players);
        }
        if !self.enemies.index_is_consistent() {
            return Err(IndexMismatch::Enemies);
        }
        if let Some(player) = self
            .players
            .iter()
            .find(|player| self.enemies.occupant(player.cell()).is_some())
        {
            return Err(IndexMismatch::SharedCell(player.cell()));
        }
        if !self.entities.index_is_consistent() {
            return Err(IndexMismatch::SolidCells);
        }
        if !self.walls.matches(&self.grid) {
            return Err(IndexMismatch::Walls);
        }
        Ok(())
    }

    /// Reason a creature may not enter `cell`, if any.
    pub(crate) fn rejection(&self, cell: CellCoord) -> Option<MoveRejection> {
        if !self.grid.contains(cell) {
            return Some(MoveRejection::OutOfBounds);
        }
        if self.grid.is_wall(cell) {
            return Some(MoveRejection::Wall);
        }
        if !self.players.is_free(cell) || !self.enemies.is_free(cell) {
            return Some(MoveRejection::Occupied);
        }
        if self.entities.is_solid(cell) {
            return Some(MoveRejection::Solid);
        }
        None
    }

    /// Random enterable interior cell, using the bounded retry rule.
    pub(crate) fn random_free_cell(&mut self) -> Option<CellCoord> {
        let Self {
            grid,
            rng,
            players,
            enemies,
            entities,
            config,
            ..
        } = self;
        placement::random_free_cell(grid, rng, config.spawns.placement_attempts, |cell| {
            !grid.is_wall(cell)
                && players.is_free(cell)
                && enemies.is_free(cell)
                && !entities.is_solid(cell)
        })
    }

    /// Instantiates the entity an item type turns into when placed.
    pub(crate) fn item_entity(&self, item_id: &str, position: Position) -> WorldEntity {
        let Some(item) = self.catalog.item(item_id) else {
            return WorldEntity::Item(GroundItem {
                item_id: item_id.to_owned(),
                position,
                sprite: SpriteDescriptor::for_item(item_id),
            });
        };
        let sprite = item.sprite();
        if let Some(table) = &item.container {
            return WorldEntity::Container(Container {
                item_id: item.id.clone(),
                position,
                sprite,
                kind: ContainerKind::Chest,
                contents: Vec::new(),
                loot: Some(table.clone()),
                rolled: false,
            });
        }
        if item.spawn_type.is_some() {
            let biome = position
                .cell()
                .map_or(0, |cell| self.biomes.biome_at(cell));
            return WorldEntity::Prop(Prop {
                item_id: item.id.clone(),
                position,
                sprite,
                kind: PropKind::Spawner { biome },
            });
        }
        WorldEntity::Item(GroundItem {
            item_id: item.id.clone(),
            position,
            sprite,
        })
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.ticks = world.ticks.saturating_add(1);
            world.clock += dt.as_secs_f64();
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::JoinSession { session, restore } => {
            player::join(world, session, restore, out_events);
        }
        Command::LeaveSession { session } => player::leave(world, session, out_events),
        Command::ApplyInput { session, input } => {
            player::apply_input(world, session, input, out_events);
        }
        Command::RefreshPlayers { dt } => player::refresh(world, dt),
        Command::StepEnemy { enemy, heading } => enemies::step(world, enemy, heading, out_events),
        Command::EnemyAttack { enemy, target } => {
            enemies::attack(world, enemy, target, out_events);
        }
        Command::Equip {
            session,
            slot,
            item,
        } => interaction::equip(world, session, slot, item, out_events),
        Command::Unequip { session, slot } => {
            interaction::unequip(world, session, slot, out_events);
        }
        Command::DropItem { session, item } => {
            interaction::drop_item(world, session, item, out_events);
        }
        Command::RecordFrameEmitted { session } => player::record_frame(world, &session),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use mazecrawl_core::{
        Catalog, CellCoord, EnemySnapshot, EnemyView, FogMask, GameConfig, PlayerPresence,
        SessionId,
    };

    use super::{
        BiomeField, EnemyRoster, EntityStore, LoreEntry, Player, PlayerRoster, TileGrid,
        WallState, World,
    };

    /// Provides read-only access to the world's tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &TileGrid {
        &world.grid
    }

    /// Provides read-only access to the biome field.
    #[must_use]
    pub fn biomes(world: &World) -> &BiomeField {
        &world.biomes
    }

    /// Provides read-only access to wall durability.
    #[must_use]
    pub fn walls(world: &World) -> &WallState {
        &world.walls
    }

    /// Placed items, props and containers.
    #[must_use]
    pub fn entities(world: &World) -> &EntityStore {
        &world.entities
    }

    /// Live enemy instances.
    #[must_use]
    pub fn enemies(world: &World) -> &EnemyRoster {
        &world.enemies
    }

    /// Connected players.
    #[must_use]
    pub fn players(world: &World) -> &PlayerRoster {
        &world.players
    }

    /// Player owned by the session, if connected.
    #[must_use]
    pub fn player<'a>(world: &'a World, session: &SessionId) -> Option<&'a Player> {
        world.players.get(session)
    }

    /// Lore scrolls generated for the bosses, in identifier order.
    #[must_use]
    pub fn lore(world: &World) -> &[LoreEntry] {
        &world.lore
    }

    /// Catalog the world was generated from.
    #[must_use]
    pub fn catalog(world: &World) -> &Catalog {
        &world.catalog
    }

    /// Game configuration the world was generated with.
    #[must_use]
    pub fn config(world: &World) -> &GameConfig {
        &world.config
    }

    /// Seconds of simulated time since generation.
    #[must_use]
    pub fn clock(world: &World) -> f64 {
        world.clock
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.ticks
    }

    /// Numeric seed every random choice derives from.
    #[must_use]
    pub fn seed(world: &World) -> u64 {
        world.seed
    }

    /// Room door tiles that are still walls.
    pub fn door_cells(world: &World) -> impl Iterator<Item = CellCoord> + '_ {
        world.doors.iter().copied()
    }

    /// Whether a creature could not step onto the cell right now.
    #[must_use]
    pub fn is_cell_blocked(world: &World, cell: CellCoord) -> bool {
        world.rejection(cell).is_some()
    }

    /// Captures a read-only view of every enemy for decision systems.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let move_enabled = world.config.enemies.move_enabled;
        let snapshots = world
            .enemies
            .iter()
            .map(|enemy| EnemySnapshot {
                id: enemy.id(),
                type_id: enemy.type_id().to_owned(),
                ai: enemy.ai().map(str::to_owned),
                tier: enemy.tier(),
                cell: enemy.cell(),
                heading: enemy.heading(),
                ready: move_enabled
                    && enemy.stats().speed > 0
                    && world.clock >= enemy.next_move_at(),
            })
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Where every connected player stands.
    #[must_use]
    pub fn player_presence(world: &World) -> Vec<PlayerPresence> {
        world
            .players
            .iter()
            .map(|player| PlayerPresence {
                session: player.session().clone(),
                cell: player.cell(),
            })
            .collect()
    }

    /// Union of every player's fog mask, or a fully revealed mask when the
    /// visibility mode shows everything.
    #[must_use]
    pub fn visibility_mask(world: &World) -> FogMask {
        let (columns, rows) = (world.grid.columns(), world.grid.rows());
        if world.config.visibility.mode.reveals_everything() {
            return FogMask::filled(columns, rows);
        }
        let mut mask = FogMask::new(columns, rows);
        for player in world.players.iter() {
            mask.union_with(player.seen());
        }
        mask
    }

    /// Whether the session's frame throttle allows another frame.
    #[must_use]
    pub fn frame_due(world: &World, session: &SessionId) -> bool {
        world.players.get(session).is_some_and(|player| {
            player.frame_due(world.clock, world.config.render.frame_interval())
        })
    }
}
