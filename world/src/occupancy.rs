use mazecrawl_core::CellCoord;

/// Dense tile-to-occupant index maintained at every move site.
#[derive(Clone, Debug)]
pub(crate) struct OccupancyGrid<T> {
    columns: u32,
    rows: u32,
    cells: Vec<Option<T>>,
}

impl<T: Clone + PartialEq> OccupancyGrid<T> {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<&T> {
        self.index(cell)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    pub(crate) fn is_free(&self, cell: CellCoord) -> bool {
        self.occupant(cell).is_none()
    }

    pub(crate) fn occupy(&mut self, occupant: T, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(occupant);
            }
        }
    }

    pub(crate) fn vacate(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = None;
            }
        }
    }

    /// Moves an occupant in one step so no observer sees both or neither cell held.
    pub(crate) fn relocate(&mut self, occupant: T, from: CellCoord, to: CellCoord) {
        self.vacate(from);
        self.occupy(occupant, to);
    }

    /// Occupied cells in row-major order.
    pub(crate) fn entries(&self) -> Vec<(CellCoord, T)> {
        let width = usize::try_from(self.columns).unwrap_or(1).max(1);
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let occupant = slot.clone()?;
                let column = u32::try_from(index % width).ok()?;
                let row = u32::try_from(index / width).ok()?;
                Some((CellCoord::new(column, row), occupant))
            })
            .collect()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocate_frees_the_origin() {
        let mut grid = OccupancyGrid::new(4, 4);
        let from = CellCoord::new(1, 1);
        let to = CellCoord::new(2, 1);
        grid.occupy(7_u32, from);
        grid.relocate(7, from, to);
        assert!(grid.is_free(from));
        assert_eq!(grid.occupant(to), Some(&7));
        assert_eq!(grid.entries(), vec![(to, 7)]);
    }

    #[test]
    fn outside_cells_are_ignored() {
        let mut grid: OccupancyGrid<u32> = OccupancyGrid::new(2, 2);
        grid.occupy(1, CellCoord::new(5, 5));
        assert!(grid.entries().is_empty());
        assert!(grid.is_free(CellCoord::new(5, 5)));
    }
}
