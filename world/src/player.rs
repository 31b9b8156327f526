use std::{
    collections::{BTreeMap, BTreeSet},
    f32::consts::{PI, TAU},
    time::Duration,
};

use mazecrawl_core::{
    Catalog, CellCoord, Equipment, Event, FogMask, LoreId, MoveRejection, PlayerInput,
    PlayerSnapshot, Position, RestoreError, SessionId, Slot,
};
use tracing::{debug, warn};

use crate::{interaction, maze::SPAWN_SLOTS, occupancy::OccupancyGrid, seeding, World};

/// Slack applied to weight comparisons so float rounding never rejects an exact fit.
pub(crate) const WEIGHT_EPSILON: f32 = 1e-6;

/// Tolerance applied when comparing the clock against the frame interval.
const FRAME_SLACK: f64 = 1e-6;

/// Order in which cardinal neighbours are tried for chests and drops.
pub(crate) const CARDINAL_ORDER: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// State of a connected player.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    session: SessionId,
    cell: CellCoord,
    angle: f32,
    target_angle: f32,
    seen: FogMask,
    last_frame_at: Option<f64>,
    known_lore: BTreeSet<LoreId>,
    stats: BTreeMap<String, i32>,
    equipment: Equipment,
    inventory: Vec<String>,
    backpack_weight_used: f32,
    character: Option<String>,
    tool_durability: BTreeMap<Slot, u32>,
}

impl Player {
    fn fresh(session: SessionId, cell: CellCoord, angle: f32, seen: FogMask) -> Self {
        Self {
            session,
            cell,
            angle,
            target_angle: angle,
            seen,
            last_frame_at: None,
            known_lore: BTreeSet::new(),
            stats: BTreeMap::new(),
            equipment: Equipment::default(),
            inventory: Vec::new(),
            backpack_weight_used: 0.0,
            character: None,
            tool_durability: BTreeMap::new(),
        }
    }

    /// Rebuilds a player from a validated snapshot. Backpack weight is
    /// recomputed from the inventory; stored tool wear is kept but never
    /// exceeds a fresh tool's durability.
    fn restored(session: SessionId, snapshot: PlayerSnapshot, catalog: &Catalog) -> Self {
        let angle = if snapshot.angle.is_finite() {
            normalize_angle(snapshot.angle)
        } else {
            0.0
        };
        let mut player = Self {
            session,
            cell: snapshot.cell,
            angle,
            target_angle: angle,
            seen: snapshot.seen,
            last_frame_at: None,
            known_lore: snapshot.known_lore.into_iter().collect(),
            stats: snapshot.stats,
            equipment: snapshot.equipment,
            inventory: snapshot.inventory,
            backpack_weight_used: 0.0,
            character: snapshot.character,
            tool_durability: BTreeMap::new(),
        };
        player.backpack_weight_used = player
            .inventory
            .iter()
            .map(|item| catalog.weight_of(item))
            .sum();
        for slot in [Slot::LeftHand, Slot::RightHand] {
            if let Some(item) = player.equipment.get(slot).map(str::to_owned) {
                player.arm(slot, &item, catalog);
            }
            let stored = snapshot.tool_durability.get(&slot).copied();
            if let (Some(armed), Some(stored)) = (player.tool_durability.get_mut(&slot), stored) {
                *armed = stored.clamp(1, *armed);
            }
        }
        player
    }

    /// Session owning the player.
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Cell the player occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Continuous position at the centre of the occupied cell.
    #[must_use]
    pub fn position(&self) -> Position {
        self.cell.center()
    }

    /// Rendered facing in radians; 0 faces east and angles grow clockwise.
    #[must_use]
    pub const fn angle(&self) -> f32 {
        self.angle
    }

    /// Settled facing the player rotates towards.
    #[must_use]
    pub const fn target_angle(&self) -> f32 {
        self.target_angle
    }

    /// Tiles the player has observed.
    #[must_use]
    pub const fn seen(&self) -> &FogMask {
        &self.seen
    }

    /// World clock of the last emitted frame.
    #[must_use]
    pub const fn last_frame_at(&self) -> Option<f64> {
        self.last_frame_at
    }

    /// Whether the player has read the lore entry.
    #[must_use]
    pub fn knows(&self, lore: LoreId) -> bool {
        self.known_lore.contains(&lore)
    }

    /// Lore entries read so far.
    pub fn known_lore(&self) -> impl Iterator<Item = LoreId> + '_ {
        self.known_lore.iter().copied()
    }

    /// Allocated statistics carried through snapshots.
    #[must_use]
    pub const fn stats(&self) -> &BTreeMap<String, i32> {
        &self.stats
    }

    /// Equipped items.
    #[must_use]
    pub const fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    /// Items in the backpack.
    #[must_use]
    pub fn inventory(&self) -> &[String] {
        &self.inventory
    }

    /// Weight currently carried in the backpack.
    #[must_use]
    pub const fn backpack_weight_used(&self) -> f32 {
        self.backpack_weight_used
    }

    /// Character or cosmetic reference.
    #[must_use]
    pub fn character(&self) -> Option<&str> {
        self.character.as_deref()
    }

    /// Remaining durability of the tool held in the slot.
    #[must_use]
    pub fn tool_durability(&self, slot: Slot) -> Option<u32> {
        self.tool_durability.get(&slot).copied()
    }

    /// Weight budget granted by the equipped backpack.
    #[must_use]
    pub fn capacity(&self, catalog: &Catalog) -> f32 {
        self.equipment
            .get(Slot::Backpack)
            .and_then(|id| catalog.item(id))
            .map_or(0.0, |item| item.stats.capacity_weight)
    }

    /// Whether the frame throttle allows another frame at `clock`.
    #[must_use]
    pub fn frame_due(&self, clock: f64, interval: Duration) -> bool {
        self.last_frame_at
            .map_or(true, |last| clock - last >= interval.as_secs_f64() - FRAME_SLACK)
    }

    /// State persisted by the session layer on departure.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            cell: self.cell,
            angle: self.target_angle,
            seen: self.seen.clone(),
            stats: self.stats.clone(),
            equipment: self.equipment.clone(),
            inventory: self.inventory.clone(),
            backpack_weight_used: self.backpack_weight_used,
            character: self.character.clone(),
            known_lore: self.known_lore.iter().copied().collect(),
            tool_durability: self.tool_durability.clone(),
        }
    }

    /// Adds an item to the backpack when the weight budget allows it.
    pub(crate) fn try_stow(&mut self, item: &str, catalog: &Catalog) -> bool {
        let capacity = self.capacity(catalog);
        let weight = catalog.weight_of(item);
        if capacity <= 0.0 || self.backpack_weight_used + weight > capacity + WEIGHT_EPSILON {
            return false;
        }
        self.inventory.push(item.to_owned());
        self.backpack_weight_used += weight;
        true
    }

    /// Removes one unit of the item from the backpack.
    pub(crate) fn take_from_inventory(&mut self, item: &str, catalog: &Catalog) -> bool {
        let Some(index) = self.inventory.iter().position(|carried| carried == item) else {
            return false;
        };
        let _ = self.inventory.remove(index);
        self.backpack_weight_used = (self.backpack_weight_used - catalog.weight_of(item)).max(0.0);
        true
    }

    /// Places an item in a slot, returning the previous occupant.
    pub(crate) fn equip(&mut self, slot: Slot, item: &str, catalog: &Catalog) -> Option<String> {
        let previous = self.equipment.insert(slot, item);
        self.arm(slot, item, catalog);
        previous
    }

    pub(crate) fn unequip(&mut self, slot: Slot) -> Option<String> {
        let _ = self.tool_durability.remove(&slot);
        self.equipment.remove(slot)
    }

    /// Wears the tool in the slot down, returning the durability left.
    pub(crate) fn wear_tool(&mut self, slot: Slot, wear: u32) -> u32 {
        let remaining = self.tool_durability.entry(slot).or_insert(1);
        *remaining = remaining.saturating_sub(wear);
        *remaining
    }

    pub(crate) fn learn(&mut self, lore: LoreId) -> bool {
        self.known_lore.insert(lore)
    }

    fn arm(&mut self, slot: Slot, item: &str, catalog: &Catalog) {
        if !matches!(slot, Slot::LeftHand | Slot::RightHand) {
            return;
        }
        let durability = catalog
            .item(item)
            .map_or(1, |item| item.stats.durability.max(1));
        let _ = self.tool_durability.insert(slot, durability);
    }

    fn reveal(&mut self, radius: u32) {
        let (columns, rows) = self.seen.dimensions();
        let reach = i32::try_from(radius).unwrap_or(i32::MAX);
        let limit = i64::from(reach) * i64::from(reach);
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy) > limit {
                    continue;
                }
                if let Some(cell) = self.cell.offset(dx, dy, columns, rows) {
                    self.seen.mark(cell);
                }
            }
        }
    }

    fn rotate_towards_target(&mut self, max_step: f32) {
        let mut diff = (self.target_angle - self.angle).rem_euclid(TAU);
        if diff > PI {
            diff -= TAU;
        }
        if diff.abs() <= max_step {
            self.angle = self.target_angle;
        } else {
            self.angle = normalize_angle(self.angle + max_step.copysign(diff));
        }
    }
}

/// Connected players plus their occupancy index.
#[derive(Clone, Debug)]
pub struct PlayerRoster {
    players: BTreeMap<SessionId, Player>,
    occupancy: OccupancyGrid<SessionId>,
}

impl PlayerRoster {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        Self {
            players: BTreeMap::new(),
            occupancy: OccupancyGrid::new(columns, rows),
        }
    }

    /// Looks up a player.
    #[must_use]
    pub fn get(&self, session: &SessionId) -> Option<&Player> {
        self.players.get(session)
    }

    /// Players ordered by session identifier.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of connected players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Session whose player stands on the cell.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<&SessionId> {
        self.occupancy.occupant(cell)
    }

    pub(crate) fn is_free(&self, cell: CellCoord) -> bool {
        self.occupancy.is_free(cell)
    }

    pub(crate) fn get_mut(&mut self, session: &SessionId) -> Option<&mut Player> {
        self.players.get_mut(session)
    }

    fn insert(&mut self, player: Player) {
        self.occupancy.occupy(player.session.clone(), player.cell);
        let _ = self.players.insert(player.session.clone(), player);
    }

    fn remove(&mut self, session: &SessionId) -> Option<Player> {
        let player = self.players.remove(session)?;
        self.occupancy.vacate(player.cell);
        Some(player)
    }

    fn relocate(&mut self, session: &SessionId, to: CellCoord) -> Option<CellCoord> {
        let player = self.players.get_mut(session)?;
        let from = player.cell;
        player.cell = to;
        self.occupancy.relocate(session.clone(), from, to);
        Some(from)
    }

    pub(crate) fn index_is_consistent(&self) -> bool {
        let mut expected: Vec<(CellCoord, SessionId)> = self
            .players
            .values()
            .map(|player| (player.cell, player.session.clone()))
            .collect();
        expected.sort();
        let mut actual = self.occupancy.entries();
        actual.sort();
        expected == actual
    }
}

/// Wraps an angle into `[0, 2π)`.
pub(crate) fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Tile delta of a translation input relative to the settled facing.
pub(crate) fn movement_delta(input: PlayerInput, facing: f32) -> Option<(i32, i32)> {
    let (sin, cos) = facing.sin_cos();
    let (x, y) = match input {
        PlayerInput::MoveForward => (cos, sin),
        PlayerInput::MoveBackward => (-cos, -sin),
        PlayerInput::StrafeLeft => (sin, -cos),
        PlayerInput::StrafeRight => (-sin, cos),
        _ => return None,
    };
    let snap = |component: f32| {
        if component > 0.5 {
            1
        } else if component < -0.5 {
            -1
        } else {
            0
        }
    };
    Some((snap(x), snap(y)))
}

fn validate_restore(world: &World, snapshot: &PlayerSnapshot) -> Result<(), RestoreError> {
    let cell = snapshot.cell;
    if !world.grid.contains(cell) {
        return Err(RestoreError::OutOfBounds(cell));
    }
    if world.grid.is_wall(cell) {
        return Err(RestoreError::Wall(cell));
    }
    if world.rejection(cell).is_some() {
        return Err(RestoreError::Blocked(cell));
    }
    let expected = (world.grid.columns(), world.grid.rows());
    let actual = snapshot.seen.dimensions();
    if actual != expected || !snapshot.seen.is_well_formed() {
        return Err(RestoreError::MaskDimensions { expected, actual });
    }
    if let Some(unknown) = snapshot
        .inventory
        .iter()
        .find(|item| world.catalog.item(item).is_none())
    {
        return Err(RestoreError::UnknownItem(unknown.clone()));
    }
    let carried: f32 = snapshot
        .inventory
        .iter()
        .map(|item| world.catalog.weight_of(item))
        .sum();
    let capacity = snapshot
        .equipment
        .get(Slot::Backpack)
        .and_then(|id| world.catalog.item(id))
        .map_or(0.0, |item| item.stats.capacity_weight);
    if carried > capacity + WEIGHT_EPSILON {
        return Err(RestoreError::Overweight);
    }
    Ok(())
}

/// Cell chosen for a session without usable restore data: a hashed slot in
/// the spawn zone, probing the remaining slots before scattering randomly.
fn fallback_cell(world: &mut World, session: &SessionId) -> Option<CellCoord> {
    let (x0, y0, x1, y1) = SPAWN_SLOTS;
    let width = u64::from(x1 - x0 + 1);
    let slots = width * u64::from(y1 - y0 + 1);
    let start = seeding::session_hash(session) % slots;
    for probe in 0..slots {
        let slot = (start + probe) % slots;
        let column = x0 + u32::try_from(slot % width).unwrap_or(0);
        let row = y0 + u32::try_from(slot / width).unwrap_or(0);
        let cell = CellCoord::new(column, row);
        if world.rejection(cell).is_none() {
            return Some(cell);
        }
    }
    world.random_free_cell()
}

pub(crate) fn join(
    world: &mut World,
    session: SessionId,
    restore: Option<PlayerSnapshot>,
    out_events: &mut Vec<Event>,
) {
    if world.players.get(&session).is_some() {
        debug!(%session, "session already materialised");
        return;
    }

    let restore = restore.and_then(|snapshot| match validate_restore(world, &snapshot) {
        Ok(()) => Some(snapshot),
        Err(error) => {
            warn!(%session, %error, "discarding restore snapshot");
            None
        }
    });

    let restored = restore.is_some();
    let mut player = if let Some(snapshot) = restore {
        Player::restored(session.clone(), snapshot, &world.catalog)
    } else {
        let Some(cell) = fallback_cell(world, &session) else {
            warn!(%session, "no free tile to spawn on");
            return;
        };
        let (columns, rows) = (world.grid.columns(), world.grid.rows());
        let angle = normalize_angle(world.config.player.default_angle_degrees.to_radians());
        Player::fresh(session.clone(), cell, angle, FogMask::new(columns, rows))
    };

    if !restored {
        grant_defaults(world, &mut player);
    }
    player.reveal(world.config.visibility.reveal_radius);
    let cell = player.cell;
    let equipment = player.equipment.clone();
    world.players.insert(player);

    if !restored && world.config.player.spawn_chest {
        interaction::place_spawn_chest(world, cell);
    }

    out_events.push(Event::PlayerJoined {
        session: session.clone(),
        cell,
        restored,
    });
    if !equipment.is_empty() {
        out_events.push(Event::EquipmentChanged { session, equipment });
    }
}

fn grant_defaults(world: &World, player: &mut Player) {
    let defaults = [
        (Slot::RightHand, world.config.player.default_tool.as_deref()),
        (Slot::Backpack, world.config.player.default_backpack.as_deref()),
    ];
    for (slot, item) in defaults {
        let Some(item) = item else {
            continue;
        };
        if player.equipment.get(slot).is_some() {
            continue;
        }
        if world.catalog.item(item).is_some_and(|entry| entry.can_equip(slot)) {
            let _ = player.equip(slot, item, &world.catalog);
        } else {
            debug!(item, ?slot, "default item missing from catalog");
        }
    }
}

pub(crate) fn leave(world: &mut World, session: SessionId, out_events: &mut Vec<Event>) {
    let Some(player) = world.players.remove(&session) else {
        debug!(%session, "unknown session left");
        return;
    };
    out_events.push(Event::PlayerLeft {
        session,
        snapshot: player.snapshot(),
    });
}

pub(crate) fn apply_input(
    world: &mut World,
    session: SessionId,
    input: PlayerInput,
    out_events: &mut Vec<Event>,
) {
    let Some(player) = world.players.get_mut(&session) else {
        debug!(%session, ?input, "input for unknown session");
        return;
    };
    let step = world.config.player.rotation_step_degrees.to_radians();
    match input {
        PlayerInput::RotateLeft | PlayerInput::RotateRight => {
            let signed = if input == PlayerInput::RotateLeft { -step } else { step };
            player.target_angle = normalize_angle(player.target_angle + signed);
            out_events.push(Event::PlayerTurned {
                session,
                target_angle: player.target_angle,
            });
        }
        PlayerInput::MoveForward
        | PlayerInput::MoveBackward
        | PlayerInput::StrafeLeft
        | PlayerInput::StrafeRight => {
            let origin = player.cell;
            let facing = player.target_angle;
            move_player(world, session, origin, input, facing, out_events);
        }
        PlayerInput::InteractLeft => interaction::interact(world, session, Slot::LeftHand, out_events),
        PlayerInput::InteractRight => {
            interaction::interact(world, session, Slot::RightHand, out_events);
        }
    }
}

fn move_player(
    world: &mut World,
    session: SessionId,
    origin: CellCoord,
    input: PlayerInput,
    facing: f32,
    out_events: &mut Vec<Event>,
) {
    let Some((dx, dy)) = movement_delta(input, facing) else {
        return;
    };
    let destination = origin.offset(dx, dy, world.grid.columns(), world.grid.rows());
    let outcome = match destination {
        None => Err(MoveRejection::OutOfBounds),
        Some(cell) => world.rejection(cell).map_or(Ok(cell), Err),
    };
    match outcome {
        Ok(to) => {
            if let Some(from) = world.players.relocate(&session, to) {
                out_events.push(Event::PlayerMoved { session, from, to });
            }
        }
        Err(reason) => out_events.push(Event::MoveRejected { session, reason }),
    }
}

/// Advances rotation interpolation and reveals fog around every player.
pub(crate) fn refresh(world: &mut World, dt: Duration) {
    let max_step = world.config.player.rotation_speed_degrees.to_radians() * dt.as_secs_f32();
    let radius = world.config.visibility.reveal_radius;
    for player in world.players.players.values_mut() {
        player.rotate_towards_target(max_step);
        player.reveal(radius);
    }
}

pub(crate) fn record_frame(world: &mut World, session: &SessionId) {
    let clock = world.clock;
    if let Some(player) = world.players.get_mut(session) {
        player.last_frame_at = Some(clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_thresholds_resolve_eight_directions() {
        let east = 0.0_f32;
        assert_eq!(movement_delta(PlayerInput::MoveForward, east), Some((1, 0)));
        assert_eq!(movement_delta(PlayerInput::MoveBackward, east), Some((-1, 0)));
        assert_eq!(movement_delta(PlayerInput::StrafeLeft, east), Some((0, -1)));
        assert_eq!(movement_delta(PlayerInput::StrafeRight, east), Some((0, 1)));

        let south_east = 45_f32.to_radians();
        assert_eq!(movement_delta(PlayerInput::MoveForward, south_east), Some((1, 1)));
        let south = 90_f32.to_radians();
        assert_eq!(movement_delta(PlayerInput::MoveForward, south), Some((0, 1)));
        assert_eq!(movement_delta(PlayerInput::RotateLeft, south), None);
    }

    #[test]
    fn rotation_never_overshoots() {
        let mut player = Player::fresh(
            SessionId::new("a"),
            CellCoord::new(1, 1),
            0.0,
            FogMask::new(4, 4),
        );
        player.target_angle = 90_f32.to_radians();
        player.rotate_towards_target(1.0);
        assert!((player.angle - 1.0).abs() < 1e-6);
        player.rotate_towards_target(1.0);
        assert!((player.angle - player.target_angle).abs() < 1e-6);
    }

    #[test]
    fn rotation_takes_the_short_way_round() {
        let mut player = Player::fresh(
            SessionId::new("a"),
            CellCoord::new(1, 1),
            10_f32.to_radians(),
            FogMask::new(4, 4),
        );
        player.target_angle = 350_f32.to_radians();
        player.rotate_towards_target(5_f32.to_radians());
        assert!((player.angle - 5_f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn frame_throttle_tolerates_float_drift() {
        let mut player = Player::fresh(
            SessionId::new("a"),
            CellCoord::new(1, 1),
            0.0,
            FogMask::new(4, 4),
        );
        let interval = Duration::from_millis(100);
        assert!(player.frame_due(0.0, interval));
        player.last_frame_at = Some(0.0);
        assert!(!player.frame_due(0.066, interval));
        assert!(player.frame_due(0.099_999_9, interval));
    }
}
