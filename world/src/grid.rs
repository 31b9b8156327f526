use mazecrawl_core::{CellCoord, Tile};

/// Dense tile grid owned by the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub(crate) fn filled(columns: u32, rows: u32, tile: Tile) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![tile; capacity],
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Tile at the cell, `None` outside the grid.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.index(cell).and_then(|index| self.tiles.get(index).copied())
    }

    /// Whether the cell is a wall. Cells outside the grid count as walls.
    #[must_use]
    pub fn is_wall(&self, cell: CellCoord) -> bool {
        self.tile(cell).map_or(true, |tile| tile == Tile::Wall)
    }

    /// Whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Whether the cell belongs to the outermost ring.
    #[must_use]
    pub fn is_border(&self, cell: CellCoord) -> bool {
        self.contains(cell)
            && (cell.column() == 0
                || cell.row() == 0
                || cell.column() + 1 == self.columns
                || cell.row() + 1 == self.rows)
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        let columns = self.columns;
        (0..self.rows)
            .flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }

    /// Number of tiles of the provided kind.
    #[must_use]
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|candidate| **candidate == tile).count()
    }

    pub(crate) fn set(&mut self, cell: CellCoord, tile: Tile) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.tiles.get_mut(index) {
                *slot = tile;
            }
        }
    }

    /// Sets every tile of the inclusive rectangle, clipped to the grid.
    pub(crate) fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, tile: Tile) {
        let x_start = x0.max(0);
        let y_start = y0.max(0);
        let x_end = x1.min(i64::from(self.columns) - 1);
        let y_end = y1.min(i64::from(self.rows) - 1);
        for y in y_start..=y_end {
            for x in x_start..=x_end {
                if let (Ok(column), Ok(row)) = (u32::try_from(x), u32::try_from(y)) {
                    self.set(CellCoord::new(column, row), tile);
                }
            }
        }
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }

    pub(crate) fn parse(rows: &[&str]) -> Self {
        let height = u32::try_from(rows.len()).unwrap_or(0);
        let width = rows
            .iter()
            .map(|row| u32::try_from(row.chars().count()).unwrap_or(0))
            .max()
            .unwrap_or(0);
        let mut grid = Self::filled(width, height, Tile::Wall);
        for (y, line) in rows.iter().enumerate() {
            for (x, symbol) in line.chars().enumerate() {
                if symbol != '#' {
                    if let (Ok(column), Ok(row)) = (u32::try_from(x), u32::try_from(y)) {
                        grid.set(CellCoord::new(column, row), Tile::Empty);
                    }
                }
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_clips_to_grid() {
        let mut grid = TileGrid::filled(4, 3, Tile::Wall);
        grid.fill_rect(-2, -2, 1, 0, Tile::Empty);
        assert_eq!(grid.count(Tile::Empty), 2);
        assert_eq!(grid.tile(CellCoord::new(1, 0)), Some(Tile::Empty));
        assert_eq!(grid.tile(CellCoord::new(2, 0)), Some(Tile::Wall));
    }

    #[test]
    fn outside_cells_count_as_walls() {
        let grid = TileGrid::filled(2, 2, Tile::Empty);
        assert!(grid.is_wall(CellCoord::new(2, 0)));
        assert!(!grid.is_wall(CellCoord::new(1, 1)));
    }

    #[test]
    fn parse_reads_hash_as_wall() {
        let grid = TileGrid::parse(&["###", "#.#", "###"]);
        assert_eq!((grid.columns(), grid.rows()), (3, 3));
        assert_eq!(grid.count(Tile::Empty), 1);
        assert!(grid.is_border(CellCoord::new(2, 1)));
        assert!(!grid.is_border(CellCoord::new(1, 1)));
    }
}
