//! Maze carving, stamped rooms and the spawn clearing.
//!
//! Carving runs a randomised depth-first traversal over a coarse lattice of
//! corridor-sized blocks separated by thin wall lines. Rooms are stamped on
//! top of the lattice afterwards; their rings sit on wall lines so every door
//! tunnel joins the corridors on both halves of a room side.

use mazecrawl_core::{CellCoord, GridConfig, Tile};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use crate::{grid::TileGrid, seeding::WorldRng};

/// Inclusive tile bounds `(x0, y0, x1, y1)` always cleared for spawning.
pub(crate) const SPAWN_CLEARING: (u32, u32, u32, u32) = (1, 1, 10, 6);

/// Inclusive tile bounds of the deterministic spawn slots.
pub(crate) const SPAWN_SLOTS: (u32, u32, u32, u32) = (2, 2, 9, 5);

#[derive(Clone, Copy, Debug)]
struct Lattice {
    corridor: u32,
    wall: u32,
    columns: u32,
    rows: u32,
}

impl Lattice {
    fn new(grid: &TileGrid, corridor: u32, wall: u32) -> Self {
        let corridor = corridor.max(1);
        let wall = wall.max(1);
        let stride = corridor + wall;
        Self {
            corridor,
            wall,
            columns: grid.columns().saturating_sub(1) / stride,
            rows: grid.rows().saturating_sub(1) / stride,
        }
    }

    const fn stride(&self) -> u32 {
        self.corridor + self.wall
    }

    fn base(&self, column: u32, row: u32) -> (i64, i64) {
        let stride = i64::from(self.stride());
        (
            1 + i64::from(column) * stride,
            1 + i64::from(row) * stride,
        )
    }

    fn index(&self, column: u32, row: u32) -> usize {
        usize::try_from(u64::from(row) * u64::from(self.columns) + u64::from(column))
            .unwrap_or(usize::MAX)
    }

    fn carve_block(&self, grid: &mut TileGrid, column: u32, row: u32) {
        let (x, y) = self.base(column, row);
        let span = i64::from(self.corridor) - 1;
        grid.fill_rect(x, y, x + span, y + span, Tile::Empty);
    }

    /// Opens the wall line between two orthogonally adjacent blocks.
    fn open_between(&self, grid: &mut TileGrid, from: (u32, u32), to: (u32, u32)) {
        let (first, second) = if (to.1, to.0) < (from.1, from.0) {
            (to, from)
        } else {
            (from, to)
        };
        let (x, y) = self.base(first.0, first.1);
        let corridor = i64::from(self.corridor);
        let wall = i64::from(self.wall);
        if second.0 == first.0 + 1 && second.1 == first.1 {
            grid.fill_rect(x + corridor, y, x + corridor + wall - 1, y + corridor - 1, Tile::Empty);
        } else if second.1 == first.1 + 1 && second.0 == first.0 {
            grid.fill_rect(x, y + corridor, x + corridor - 1, y + corridor + wall - 1, Tile::Empty);
        }
    }
}

/// Carves the corridor maze into a grid that starts out fully walled.
pub(crate) fn carve_maze(grid: &mut TileGrid, config: &GridConfig, rng: &mut WorldRng) {
    let lattice = Lattice::new(grid, config.corridor_width, config.wall_width);
    if lattice.columns == 0 || lattice.rows == 0 {
        return;
    }
    let room_probability = config.room_probability.clamp(0.0, 1.0);
    let mut visited = vec![false; lattice.index(0, lattice.rows)];
    let start = (
        rng.gen_range(0..lattice.columns),
        rng.gen_range(0..lattice.rows),
    );
    visited[lattice.index(start.0, start.1)] = true;
    lattice.carve_block(grid, start.0, start.1);
    let mut stack = vec![start];

    while let Some(&(column, row)) = stack.last() {
        if rng.gen_bool(room_probability)
            && absorb_cluster(grid, &lattice, &mut visited, &mut stack, (column, row), rng)
        {
            continue;
        }

        let mut neighbours = lattice_neighbours(&lattice, column, row);
        neighbours.retain(|&(c, r)| !visited[lattice.index(c, r)]);
        let Some(&next) = neighbours.choose(rng) else {
            let _ = stack.pop();
            continue;
        };
        lattice.open_between(grid, (column, row), next);
        lattice.carve_block(grid, next.0, next.1);
        visited[lattice.index(next.0, next.1)] = true;
        stack.push(next);
    }
}

/// Absorbs a 2-3 by 1-2 block cluster anchored at `origin` into one open area.
fn absorb_cluster(
    grid: &mut TileGrid,
    lattice: &Lattice,
    visited: &mut [bool],
    stack: &mut Vec<(u32, u32)>,
    origin: (u32, u32),
    rng: &mut WorldRng,
) -> bool {
    let width = if origin.0 + 2 < lattice.columns {
        *[2_u32, 3].choose(rng).unwrap_or(&2)
    } else {
        2
    };
    let height = if origin.1 + 2 < lattice.rows {
        *[1_u32, 2].choose(rng).unwrap_or(&1)
    } else {
        1
    };

    let mut absorbed = false;
    for dy in 0..height {
        for dx in 0..width {
            let (column, row) = (origin.0 + dx, origin.1 + dy);
            if column >= lattice.columns || row >= lattice.rows {
                continue;
            }
            if visited[lattice.index(column, row)] {
                continue;
            }
            lattice.carve_block(grid, column, row);
            visited[lattice.index(column, row)] = true;
            if dx > 0 && visited[lattice.index(column - 1, row)] {
                lattice.open_between(grid, (column - 1, row), (column, row));
            }
            if dy > 0 && visited[lattice.index(column, row - 1)] {
                lattice.open_between(grid, (column, row - 1), (column, row));
            }
            stack.push((column, row));
            absorbed = true;
        }
    }
    absorbed
}

fn lattice_neighbours(lattice: &Lattice, column: u32, row: u32) -> Vec<(u32, u32)> {
    let mut neighbours = Vec::with_capacity(4);
    if column > 0 {
        neighbours.push((column - 1, row));
    }
    if column + 1 < lattice.columns {
        neighbours.push((column + 1, row));
    }
    if row > 0 {
        neighbours.push((column, row - 1));
    }
    if row + 1 < lattice.rows {
        neighbours.push((column, row + 1));
    }
    neighbours
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    const fn outward(self) -> (i64, i64) {
        match self {
            Side::North => (0, -1),
            Side::East => (1, 0),
            Side::South => (0, 1),
            Side::West => (-1, 0),
        }
    }
}

/// Room stamped onto the maze, described by its ring bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Room {
    block: (u32, u32),
    span: u32,
    pub(crate) doors: Vec<CellCoord>,
}

impl Room {
    fn ring(&self, lattice: &Lattice) -> (i64, i64, i64, i64) {
        let stride = i64::from(lattice.stride());
        let x0 = i64::from(self.block.0) * stride;
        let y0 = i64::from(self.block.1) * stride;
        let extent = i64::from(self.span) * stride;
        (x0, y0, x0 + extent, y0 + extent)
    }

    fn keeps_gap_from(&self, block: (u32, u32), span: u32) -> bool {
        let (column, row) = (i64::from(block.0), i64::from(block.1));
        let (other_column, other_row) = (i64::from(self.block.0), i64::from(self.block.1));
        let span = i64::from(span);
        let other_span = i64::from(self.span);
        let columns_overlap =
            column - 1 <= other_column + other_span - 1 && other_column <= column + span;
        let rows_overlap = row - 1 <= other_row + other_span - 1 && other_row <= row + span;
        !(columns_overlap && rows_overlap)
    }
}

/// Stamps walled rooms with doors onto the maze.
///
/// A side whose ring segment cut an existing passage always receives a door,
/// which keeps every corridor that used to run through the room connected.
pub(crate) fn stamp_rooms(
    grid: &mut TileGrid,
    config: &GridConfig,
    closed_doors: bool,
    rng: &mut WorldRng,
) -> Vec<Room> {
    let lattice = Lattice::new(grid, config.corridor_width, config.wall_width);
    let span = (config.rooms.size.saturating_sub(1) / lattice.stride()).clamp(1, 2);
    let mut rooms: Vec<Room> = Vec::new();
    if lattice.columns < span + 2 || lattice.rows < span + 2 {
        return rooms;
    }

    let wanted = usize::try_from(config.rooms.count).unwrap_or(0);
    for _ in 0..config.rooms.attempts {
        if rooms.len() >= wanted {
            break;
        }
        let block = (
            rng.gen_range(1..=lattice.columns - span - 1),
            rng.gen_range(1..=lattice.rows - span - 1),
        );
        if !rooms.iter().all(|room| room.keeps_gap_from(block, span)) {
            continue;
        }
        let mut room = Room {
            block,
            span,
            doors: Vec::new(),
        };
        let (x0, y0, x1, y1) = room.ring(&lattice);
        if x1 >= i64::from(grid.columns()) - 1 || y1 >= i64::from(grid.rows()) - 1 {
            continue;
        }

        let mut sides: Vec<Side> = Side::ALL
            .into_iter()
            .filter(|side| side_was_open(grid, (x0, y0, x1, y1), *side))
            .collect();

        grid.fill_rect(x0, y0, x1, y1, Tile::Wall);
        grid.fill_rect(x0 + 1, y0 + 1, x1 - 1, y1 - 1, Tile::Empty);

        let door_count = rng.gen_range(1..=4_usize);
        let mut spare: Vec<Side> = Side::ALL
            .into_iter()
            .filter(|side| !sides.contains(side))
            .collect();
        spare.shuffle(rng);
        while sides.len() < door_count {
            let Some(side) = spare.pop() else {
                break;
            };
            sides.push(side);
        }

        for side in sides {
            let door = door_cell((x0, y0, x1, y1), side);
            let door_tile = if closed_doors { Tile::Wall } else { Tile::Empty };
            set_tile(grid, door, door_tile);
            carve_tunnel(grid, door, side, config.rooms.tunnel_length);
            if let Some(cell) = to_cell(door) {
                room.doors.push(cell);
            }
        }
        rooms.push(room);
    }

    if rooms.len() < wanted {
        debug!(placed = rooms.len(), wanted, "room placement ran out of attempts");
    }
    rooms
}

fn side_was_open(grid: &TileGrid, ring: (i64, i64, i64, i64), side: Side) -> bool {
    let (x0, y0, x1, y1) = ring;
    let cells: Vec<(i64, i64)> = match side {
        Side::North => (x0 + 1..x1).map(|x| (x, y0)).collect(),
        Side::South => (x0 + 1..x1).map(|x| (x, y1)).collect(),
        Side::West => (y0 + 1..y1).map(|y| (x0, y)).collect(),
        Side::East => (y0 + 1..y1).map(|y| (x1, y)).collect(),
    };
    cells
        .into_iter()
        .filter_map(to_cell)
        .any(|cell| grid.tile(cell) == Some(Tile::Empty))
}

fn door_cell(ring: (i64, i64, i64, i64), side: Side) -> (i64, i64) {
    let (x0, y0, x1, y1) = ring;
    let middle_x = (x0 + x1) / 2;
    let middle_y = (y0 + y1) / 2;
    match side {
        Side::North => (middle_x, y0),
        Side::South => (middle_x, y1),
        Side::West => (x0, middle_y),
        Side::East => (x1, middle_y),
    }
}

fn carve_tunnel(grid: &mut TileGrid, door: (i64, i64), side: Side, length: u32) {
    let (dx, dy) = side.outward();
    let max_x = i64::from(grid.columns()) - 2;
    let max_y = i64::from(grid.rows()) - 2;
    for step in 1..=i64::from(length) {
        let (x, y) = (door.0 + dx * step, door.1 + dy * step);
        if x < 1 || y < 1 || x > max_x || y > max_y {
            break;
        }
        set_tile(grid, (x, y), Tile::Empty);
    }
}

fn set_tile(grid: &mut TileGrid, position: (i64, i64), tile: Tile) {
    if let Some(cell) = to_cell(position) {
        grid.set(cell, tile);
    }
}

fn to_cell(position: (i64, i64)) -> Option<CellCoord> {
    Some(CellCoord::new(
        u32::try_from(position.0).ok()?,
        u32::try_from(position.1).ok()?,
    ))
}

/// Clears the spawn rectangle, clipped to the interior.
pub(crate) fn clear_spawn_zone(grid: &mut TileGrid) {
    let (x0, y0, x1, y1) = SPAWN_CLEARING;
    let max_x = i64::from(grid.columns()) - 2;
    let max_y = i64::from(grid.rows()) - 2;
    grid.fill_rect(
        i64::from(x0),
        i64::from(y0),
        i64::from(x1).min(max_x),
        i64::from(y1).min(max_y),
        Tile::Empty,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::rng_from_seed;
    use std::collections::VecDeque;

    fn carved(seed: u64, config: &GridConfig) -> (TileGrid, Vec<Room>) {
        let mut rng = rng_from_seed(seed);
        let mut grid = TileGrid::filled(config.columns, config.rows, Tile::Wall);
        carve_maze(&mut grid, config, &mut rng);
        let rooms = stamp_rooms(&mut grid, config, false, &mut rng);
        clear_spawn_zone(&mut grid);
        (grid, rooms)
    }

    fn reachable_from(grid: &TileGrid, start: CellCoord) -> usize {
        let size = usize::try_from(grid.columns() * grid.rows()).unwrap_or(0);
        let mut seen = vec![false; size];
        let mut queue = VecDeque::from([start]);
        let mut count = 0;
        while let Some(cell) = queue.pop_front() {
            let Some(index) = grid.index(cell) else {
                continue;
            };
            if seen[index] || grid.is_wall(cell) {
                continue;
            }
            seen[index] = true;
            count += 1;
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                if let Some(next) = cell.offset(dx, dy, grid.columns(), grid.rows()) {
                    queue.push_back(next);
                }
            }
        }
        count
    }

    #[test]
    fn border_stays_walled() {
        let config = GridConfig {
            columns: 64,
            rows: 40,
            ..GridConfig::default()
        };
        let (grid, _) = carved(7, &config);
        for cell in grid.cells().filter(|cell| grid.is_border(*cell)) {
            assert!(grid.is_wall(cell), "border cell {cell:?} was carved");
        }
    }

    #[test]
    fn maze_and_rooms_stay_connected() {
        let config = GridConfig {
            columns: 96,
            rows: 64,
            room_probability: 0.2,
            ..GridConfig::default()
        };
        for seed in 0..8 {
            let (grid, rooms) = carved(seed, &config);
            assert!(!rooms.is_empty());
            let total = grid.count(Tile::Empty);
            assert_eq!(reachable_from(&grid, CellCoord::new(1, 1)), total, "seed {seed}");
        }
    }

    #[test]
    fn rooms_receive_between_one_and_four_doors() {
        let config = GridConfig {
            columns: 128,
            rows: 64,
            ..GridConfig::default()
        };
        let (_, rooms) = carved(3, &config);
        for room in rooms {
            assert!((1..=4).contains(&room.doors.len()));
        }
    }

    #[test]
    fn tiny_grids_are_left_alone() {
        let config = GridConfig {
            columns: 3,
            rows: 3,
            ..GridConfig::default()
        };
        let mut rng = rng_from_seed(1);
        let mut grid = TileGrid::filled(3, 3, Tile::Wall);
        carve_maze(&mut grid, &config, &mut rng);
        assert!(stamp_rooms(&mut grid, &config, false, &mut rng).is_empty());
    }
}
