#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Mazecrawl engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. The tick loop submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that systems
//! and session adapters react to. Catalog tables, the game configuration
//! bundle and the persisted player snapshot live here as well so every crate
//! agrees on their shape.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

mod catalog;
mod config;
mod snapshot;

pub use catalog::{
    Catalog, EnemyStats, EnemyTier, EnemyType, ItemStats, ItemType, LootEntry, LootTable,
    MapEntitySpec, RenderOverride, SpriteDescriptor, SpriteSheet, StackSpec, WallType,
};
pub use config::{
    BiomeConfig, EcologyConfig, ElementShares, EnemyConfig, FloorAnchorPoint, GameConfig,
    GridConfig, PlayerConfig, RenderConfig, RoomConfig, SpawnConfig, TickConfig, VisibilityConfig,
    WallConfig,
};
pub use snapshot::{Equipment, FogMask, PlayerSnapshot};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Mazecrawl.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Materialises a player for a newly connected session.
    JoinSession {
        /// Session that joined.
        session: SessionId,
        /// Persisted state supplied by the session layer, if any.
        restore: Option<PlayerSnapshot>,
    },
    /// Releases the player owned by a departed session.
    LeaveSession {
        /// Session that disconnected.
        session: SessionId,
    },
    /// Resolves a single buffered input for a player.
    ApplyInput {
        /// Session issuing the input.
        session: SessionId,
        /// Input captured by the client.
        input: PlayerInput,
    },
    /// Interpolates player facings and reveals fog around every player.
    RefreshPlayers {
        /// Simulated time covered by the refresh.
        dt: Duration,
    },
    /// Moves an enemy one tile or keeps it in place, rescheduling its timer.
    StepEnemy {
        /// Enemy being moved.
        enemy: EnemyId,
        /// Heading of the step; `None` keeps the enemy stationary.
        heading: Option<Heading>,
    },
    /// Records that an enemy intends to strike a player.
    EnemyAttack {
        /// Attacking enemy.
        enemy: EnemyId,
        /// Session owning the targeted player.
        target: SessionId,
    },
    /// Moves an item from the backpack into an equipment slot.
    Equip {
        /// Session issuing the request.
        session: SessionId,
        /// Slot receiving the item.
        slot: Slot,
        /// Item type identifier taken from the inventory.
        item: String,
    },
    /// Moves the item held in a slot back into the backpack.
    Unequip {
        /// Session issuing the request.
        session: SessionId,
        /// Slot being emptied.
        slot: Slot,
    },
    /// Drops an inventory item on a free tile next to the player.
    DropItem {
        /// Session issuing the request.
        session: SessionId,
        /// Item type identifier taken from the inventory.
        item: String,
    },
    /// Stamps the player's frame throttle with the current world clock.
    RecordFrameEmitted {
        /// Session that received a frame.
        session: SessionId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a player materialised in the world.
    PlayerJoined {
        /// Session owning the player.
        session: SessionId,
        /// Cell the player occupies.
        cell: CellCoord,
        /// Whether the supplied snapshot was accepted.
        restored: bool,
    },
    /// Confirms that a player left, carrying the state to persist.
    PlayerLeft {
        /// Session that departed.
        session: SessionId,
        /// Snapshot captured at departure.
        snapshot: PlayerSnapshot,
    },
    /// Confirms that a player moved between two cells.
    PlayerMoved {
        /// Session owning the player.
        session: SessionId,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
    },
    /// Reports a new settled facing for a player.
    PlayerTurned {
        /// Session owning the player.
        session: SessionId,
        /// Facing the player rotates towards, in radians.
        target_angle: f32,
    },
    /// Reports that a translation input was declined.
    MoveRejected {
        /// Session owning the player.
        session: SessionId,
        /// Reason the destination could not be entered.
        reason: MoveRejection,
    },
    /// Confirms that an enemy stepped between two cells.
    EnemyMoved {
        /// Enemy that moved.
        enemy: EnemyId,
        /// Cell occupied before the step.
        from: CellCoord,
        /// Cell occupied after the step.
        to: CellCoord,
    },
    /// Surfaces an enemy's intent to strike a player.
    EnemyAttackIntended {
        /// Attacking enemy.
        enemy: EnemyId,
        /// Session owning the targeted player.
        target: SessionId,
    },
    /// Crack cue emitted when a wall absorbs a hit without breaking.
    WallDamaged {
        /// Wall cell that was struck.
        cell: CellCoord,
        /// Hit points remaining after the strike.
        remaining: u32,
        /// Crack level in `0.0..=1.0`, where `1.0` is about to break.
        level: f32,
    },
    /// Generic spark cue emitted for every landed strike.
    HitSpark {
        /// Cell that was struck.
        cell: CellCoord,
    },
    /// Confirms that a wall tile was reduced to an empty tile.
    WallBroken {
        /// Cell that became empty.
        cell: CellCoord,
    },
    /// Reports that a worn tool left the player's hand.
    ToolBroken {
        /// Session owning the player.
        session: SessionId,
        /// Item type of the tool.
        item: String,
        /// Whether the tool was stowed in the backpack rather than dropped.
        stowed: bool,
    },
    /// Carries the full slot mapping after any equipment change.
    EquipmentChanged {
        /// Session owning the player.
        session: SessionId,
        /// Current equipment.
        equipment: Equipment,
    },
    /// Scroll overlay text revealed to a single player.
    LoreRevealed {
        /// Session owning the reader.
        session: SessionId,
        /// Identifier of the lore entry.
        lore: LoreId,
        /// Heading shown above the text.
        title: String,
        /// Body of the scroll.
        text: String,
    },
    /// Confirms that a loose item was lifted into the backpack.
    ItemPickedUp {
        /// Session owning the player.
        session: SessionId,
        /// Item type that was picked up.
        item: String,
    },
    /// Confirms that items were moved from a container into the backpack.
    ItemStowed {
        /// Session owning the player.
        session: SessionId,
        /// Item type that was stowed.
        item: String,
        /// Number of units moved.
        quantity: u32,
    },
    /// Confirms that an item was placed on the ground.
    ItemDropped {
        /// Session owning the player.
        session: SessionId,
        /// Item type that was dropped.
        item: String,
        /// Cell receiving the item.
        cell: CellCoord,
    },
    /// Summarises a container interaction.
    ContainerLooted {
        /// Session owning the player.
        session: SessionId,
        /// Container entity.
        entity: EntityId,
        /// Units moved into the backpack.
        moved: u32,
        /// Units left inside the container.
        remaining: u32,
    },
    /// Reports that an interaction had no effect.
    InteractionRejected {
        /// Session owning the player.
        session: SessionId,
        /// Reason the interaction was declined.
        reason: InteractionError,
    },
}

/// Immutable representation of a single enemy used by decision systems.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Enemy type the instance was cloned from.
    pub type_id: String,
    /// Behaviour descriptor taken from the type.
    pub ai: Option<String>,
    /// Power tier.
    pub tier: EnemyTier,
    /// Cell currently occupied by the enemy.
    pub cell: CellCoord,
    /// Direction of the previous step.
    pub heading: Heading,
    /// Whether the movement timer elapsed and the enemy may act.
    pub ready: bool,
}

/// Read-only snapshot describing every enemy.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the view holds no enemies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Where a connected player stands, as seen by enemy decision systems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerPresence {
    /// Session owning the player.
    pub session: SessionId,
    /// Cell the player occupies.
    pub cell: CellCoord,
}

/// Identifier assigned to a connected session by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps the provided transport identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier assigned to an enemy instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a world entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a generated lore scroll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoreId(u32);

impl LoreId {
    /// Creates a new identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single tile within the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the neighbouring cell reached by the delta, if it stays inside the bounds.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32, columns: u32, rows: u32) -> Option<CellCoord> {
        let column = i64::from(self.column) + i64::from(dx);
        let row = i64::from(self.row) + i64::from(dy);
        if column < 0 || row < 0 || column >= i64::from(columns) || row >= i64::from(rows) {
            return None;
        }
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }

    /// Squared Euclidean distance between two cells.
    #[must_use]
    pub fn distance_squared(self, other: CellCoord) -> u64 {
        let dx = u64::from(self.column.abs_diff(other.column));
        let dy = u64::from(self.row.abs_diff(other.row));
        dx * dx + dy * dy
    }

    /// Continuous position of the cell centre.
    #[must_use]
    pub fn center(self) -> Position {
        Position::new(self.column as f32 + 0.5, self.row as f32 + 0.5)
    }
}

/// Continuous position measured in tile units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate; increases towards the east.
    pub x: f32,
    /// Vertical coordinate; increases towards the south.
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Cell containing the position, or `None` for negative or non-finite coordinates.
    #[must_use]
    pub fn cell(self) -> Option<CellCoord> {
        if !self.x.is_finite() || !self.y.is_finite() || self.x < 0.0 || self.y < 0.0 {
            return None;
        }
        Some(CellCoord::new(self.x.floor() as u32, self.y.floor() as u32))
    }
}

/// Kind of a single world tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// Walkable floor.
    Empty,
    /// Solid wall that blocks movement and rays.
    Wall,
}

/// One of the eight discrete tile headings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Heading {
    /// Towards decreasing rows.
    North,
    /// Towards increasing columns and decreasing rows.
    NorthEast,
    /// Towards increasing columns.
    East,
    /// Towards increasing columns and rows.
    SouthEast,
    /// Towards increasing rows.
    South,
    /// Towards decreasing columns and increasing rows.
    SouthWest,
    /// Towards decreasing columns.
    West,
    /// Towards decreasing columns and rows.
    NorthWest,
}

impl Heading {
    /// Every heading in clockwise order starting at north.
    pub const ALL: [Heading; 8] = [
        Heading::North,
        Heading::NorthEast,
        Heading::East,
        Heading::SouthEast,
        Heading::South,
        Heading::SouthWest,
        Heading::West,
        Heading::NorthWest,
    ];

    /// The four axis-aligned headings.
    pub const CARDINALS: [Heading; 4] =
        [Heading::North, Heading::East, Heading::South, Heading::West];

    /// Column and row delta of a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::NorthEast => (1, -1),
            Heading::East => (1, 0),
            Heading::SouthEast => (1, 1),
            Heading::South => (0, 1),
            Heading::SouthWest => (-1, 1),
            Heading::West => (-1, 0),
            Heading::NorthWest => (-1, -1),
        }
    }

    /// Heading matching a unit delta; `None` for the zero delta or longer jumps.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Heading> {
        Heading::ALL
            .into_iter()
            .find(|heading| heading.delta() == (dx, dy))
    }
}

/// Discrete input a client may send once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerInput {
    /// Turn the settled facing counter-clockwise by one step.
    RotateLeft,
    /// Turn the settled facing clockwise by one step.
    RotateRight,
    /// Step along the facing.
    MoveForward,
    /// Step against the facing.
    MoveBackward,
    /// Step to the left of the facing.
    StrafeLeft,
    /// Step to the right of the facing.
    StrafeRight,
    /// Use the left hand on the tile in front.
    InteractLeft,
    /// Use the right hand on the tile in front.
    InteractRight,
}

impl PlayerInput {
    /// Every input in wire order.
    pub const ALL: [PlayerInput; 8] = [
        PlayerInput::RotateLeft,
        PlayerInput::RotateRight,
        PlayerInput::MoveForward,
        PlayerInput::MoveBackward,
        PlayerInput::StrafeLeft,
        PlayerInput::StrafeRight,
        PlayerInput::InteractLeft,
        PlayerInput::InteractRight,
    ];

    /// Wire name of the input.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PlayerInput::RotateLeft => "rotate_left",
            PlayerInput::RotateRight => "rotate_right",
            PlayerInput::MoveForward => "move_forward",
            PlayerInput::MoveBackward => "move_backward",
            PlayerInput::StrafeLeft => "strafe_left",
            PlayerInput::StrafeRight => "strafe_right",
            PlayerInput::InteractLeft => "interact_left",
            PlayerInput::InteractRight => "interact_right",
        }
    }
}

impl FromStr for PlayerInput {
    type Err = UnknownInput;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        PlayerInput::ALL
            .into_iter()
            .find(|input| input.name() == trimmed)
            .ok_or_else(|| UnknownInput(trimmed.to_owned()))
    }
}

/// Raised when an input name does not match any [`PlayerInput`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown player input `{0}`")]
pub struct UnknownInput(pub String);

/// Equipment slots a player can fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Helmets and hats.
    Head,
    /// Armour and robes.
    Body,
    /// Containers that define carrying capacity.
    Backpack,
    /// Item used by `interact_left`.
    LeftHand,
    /// Item used by `interact_right`.
    RightHand,
    /// Greaves and trousers.
    Legs,
    /// Boots.
    Feet,
}

impl Slot {
    /// Every slot in display order.
    pub const ALL: [Slot; 7] = [
        Slot::Head,
        Slot::Body,
        Slot::Backpack,
        Slot::LeftHand,
        Slot::RightHand,
        Slot::Legs,
        Slot::Feet,
    ];
}

/// Elemental affinity shared by enemies, lore and pillars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Water element.
    Water,
    /// Fire element.
    Fire,
    /// Earth element.
    Earth,
}

impl Element {
    /// Every element in canonical order.
    pub const ALL: [Element; 3] = [Element::Water, Element::Fire, Element::Earth];

    /// Lower-case display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Element::Water => "water",
            Element::Fire => "fire",
            Element::Earth => "earth",
        }
    }
}

/// How the fog-of-war masks gate visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    /// Everything counts as seen.
    Full,
    /// Tiles are revealed by proximity.
    Fog,
    /// Alias of [`VisibilityMode::Fog`].
    #[default]
    Reveal,
}

impl VisibilityMode {
    /// Whether the mode ignores the seen masks entirely.
    #[must_use]
    pub const fn reveals_everything(self) -> bool {
        matches!(self, VisibilityMode::Full)
    }
}

/// Opaque 8-bit RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red component.
    pub red: u8,
    /// Green component.
    pub green: u8,
    /// Blue component.
    pub blue: u8,
}

impl Rgb {
    /// Creates a colour from byte components.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Reasons a translation input can be declined.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error,
)]
pub enum MoveRejection {
    /// Destination lies outside the grid.
    #[error("destination is outside the grid")]
    OutOfBounds,
    /// Destination is a wall tile.
    #[error("destination is a wall")]
    Wall,
    /// Destination holds another player or an enemy.
    #[error("destination is occupied")]
    Occupied,
    /// Destination holds a solid entity.
    #[error("destination is blocked by an object")]
    Solid,
}

/// Reasons an interaction or inventory request had no effect.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum InteractionError {
    /// Nothing interactive stands on the target tile.
    #[error("there is nothing to interact with")]
    NothingToInteract,
    /// The wielded tool is not on the wall type's allow-list.
    #[error("`{tool}` has no effect on this wall")]
    ToolNotEffective {
        /// Item type of the tool.
        tool: String,
    },
    /// The wall belongs to the outer boundary.
    #[error("the outer wall cannot be broken")]
    Indestructible,
    /// The backpack weight budget would be exceeded.
    #[error("the backpack cannot hold `{item}`")]
    BackpackFull {
        /// Item type that did not fit.
        item: String,
    },
    /// The container holds nothing.
    #[error("the container is empty")]
    ContainerEmpty,
    /// The item cannot be placed in the requested slot.
    #[error("`{item}` cannot be equipped in {slot:?}")]
    NotEquippable {
        /// Item type requested.
        item: String,
        /// Slot requested.
        slot: Slot,
    },
    /// The requested slot holds nothing.
    #[error("{0:?} is empty")]
    SlotEmpty(Slot),
    /// The player does not carry the item.
    #[error("`{0}` is not in the backpack")]
    NotCarried(String),
    /// No adjacent tile can receive a dropped item.
    #[error("no free tile to drop onto")]
    NoFreeTile,
}

/// Reasons a restore snapshot is discarded at join time.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    /// The stored cell lies outside the grid.
    #[error("stored cell {0:?} is outside the grid")]
    OutOfBounds(CellCoord),
    /// The stored cell is a wall.
    #[error("stored cell {0:?} is a wall")]
    Wall(CellCoord),
    /// The stored cell is held by another occupant or a solid entity.
    #[error("stored cell {0:?} is blocked")]
    Blocked(CellCoord),
    /// The stored seen mask does not match the grid.
    #[error("seen mask is {actual:?} but the grid is {expected:?}")]
    MaskDimensions {
        /// Dimensions of the live grid.
        expected: (u32, u32),
        /// Dimensions recorded in the snapshot.
        actual: (u32, u32),
    },
    /// The backpack holds an item the catalog does not know.
    #[error("carried item `{0}` is not in the catalog")]
    UnknownItem(String),
    /// The backpack contents weigh more than the equipped backpack holds.
    #[error("backpack contents exceed the equipped backpack's capacity")]
    Overweight,
}
