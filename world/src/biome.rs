use mazecrawl_core::{BiomeConfig, CellCoord, Tile};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use crate::{grid::TileGrid, seeding::WorldRng};

/// Attempts spent keeping a centre outside the radius of earlier centres.
const CENTER_SPREAD_ATTEMPTS: u32 = 32;

/// Circular region seeded at generation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BiomeCenter {
    /// Cell at the centre of the region.
    pub cell: CellCoord,
    /// Identifier painted onto the field, starting at 1.
    pub biome: u32,
    /// Radius used when assigning tiles to the region.
    pub radius: u32,
}

/// Per-tile biome identifiers with the centres that produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiomeField {
    columns: u32,
    rows: u32,
    ids: Vec<u32>,
    centers: Vec<BiomeCenter>,
}

impl BiomeField {
    pub(crate) fn empty(columns: u32, rows: u32) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            ids: vec![0; capacity],
            centers: Vec::new(),
        }
    }

    /// Biome identifier at the cell; 0 marks unassigned tiles and cells outside the grid.
    #[must_use]
    pub fn biome_at(&self, cell: CellCoord) -> u32 {
        self.index(cell)
            .and_then(|index| self.ids.get(index).copied())
            .unwrap_or(0)
    }

    /// Centres in assignment priority order.
    #[must_use]
    pub fn centers(&self) -> &[BiomeCenter] {
        &self.centers
    }

    /// Distinct identifiers present in the field, in ascending order.
    #[must_use]
    pub fn distinct_ids(&self) -> Vec<u32> {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        Some(usize::try_from(cell.row()).ok()? * width + usize::try_from(cell.column()).ok()?)
    }
}

#[cfg(test)]
impl BiomeField {
    pub(crate) fn paint_for_tests(&mut self, cell: CellCoord, biome: u32) {
        if let Some(index) = self.index(cell) {
            self.ids[index] = biome;
        }
    }
}

/// Scatters biome centres over aspect-matched segments, carves their rooms
/// into the grid and paints the field.
pub(crate) fn generate(grid: &mut TileGrid, config: &BiomeConfig, rng: &mut WorldRng) -> BiomeField {
    let columns = grid.columns();
    let rows = grid.rows();
    let mut field = BiomeField::empty(columns, rows);
    if config.count == 0 || columns < 3 || rows < 3 {
        return field;
    }

    let aspect = f64::from(columns) / f64::from(rows);
    let segment_columns = ((f64::from(config.count) * aspect).sqrt().round() as u32).max(1);
    let segment_rows = config.count.div_ceil(segment_columns).max(1);
    let segment_width = f64::from(columns) / f64::from(segment_columns);
    let segment_height = f64::from(rows) / f64::from(segment_rows);
    let min_edge = i64::from(config.carve_radius.max(5));
    let margin = i64::from(config.margin);

    let mut ids: Vec<u32> = (1..=config.count).collect();
    ids.shuffle(rng);

    for (slot, biome) in ids.into_iter().enumerate() {
        let slot = u32::try_from(slot).unwrap_or(u32::MAX);
        let segment_column = slot % segment_columns;
        let segment_row = (slot / segment_columns).min(segment_rows - 1);

        let x_range = segment_range(
            segment_column,
            segment_width,
            margin,
            min_edge,
            i64::from(columns),
        );
        let y_range = segment_range(segment_row, segment_height, margin, min_edge, i64::from(rows));

        let mut cell = pick_cell(x_range, y_range, columns, rows, rng);
        for _ in 1..CENTER_SPREAD_ATTEMPTS {
            if is_spread(&field.centers, cell, config.radius) {
                break;
            }
            cell = pick_cell(x_range, y_range, columns, rows, rng);
        }

        carve_disc(grid, cell, config.carve_radius);
        field.centers.push(BiomeCenter {
            cell,
            biome,
            radius: config.radius,
        });
    }

    paint(&mut field, grid);
    debug!(centers = field.centers.len(), "biome field generated");
    field
}

/// Inclusive coordinate range for a segment, or `None` when the segment is too thin.
fn segment_range(
    index: u32,
    segment: f64,
    margin: i64,
    min_edge: i64,
    extent: i64,
) -> Option<(i64, i64)> {
    let start = (f64::from(index) * segment) as i64 + margin;
    let end = (f64::from(index + 1) * segment) as i64 - 1 - margin;
    let low = start.max(1 + min_edge);
    let high = end.min(extent - 2 - min_edge);
    (low <= high).then_some((low, high))
}

fn pick_cell(
    x_range: Option<(i64, i64)>,
    y_range: Option<(i64, i64)>,
    columns: u32,
    rows: u32,
    rng: &mut WorldRng,
) -> CellCoord {
    let (x_low, x_high) = x_range.unwrap_or((1, i64::from(columns) - 2));
    let (y_low, y_high) = y_range.unwrap_or((1, i64::from(rows) - 2));
    let x = rng.gen_range(x_low..=x_high);
    let y = rng.gen_range(y_low..=y_high);
    CellCoord::new(
        u32::try_from(x).unwrap_or(1),
        u32::try_from(y).unwrap_or(1),
    )
}

fn is_spread(centers: &[BiomeCenter], cell: CellCoord, radius: u32) -> bool {
    let limit = u64::from(radius) * u64::from(radius);
    centers
        .iter()
        .all(|center| center.cell.distance_squared(cell) > limit)
}

/// Clears a disc around the centre when it fits inside the outer wall.
fn carve_disc(grid: &mut TileGrid, center: CellCoord, radius: u32) {
    let (cx, cy) = (i64::from(center.column()), i64::from(center.row()));
    let r = i64::from(radius);
    let fits = cx - r >= 1
        && cy - r >= 1
        && cx + r <= i64::from(grid.columns()) - 2
        && cy + r <= i64::from(grid.rows()) - 2;
    if !fits {
        debug!(?center, radius, "biome room skipped near the border");
        return;
    }
    for y in cy - r..=cy + r {
        for x in cx - r..=cx + r {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy > r * r {
                continue;
            }
            if let (Ok(column), Ok(row)) = (u32::try_from(x), u32::try_from(y)) {
                grid.set(CellCoord::new(column, row), Tile::Empty);
            }
        }
    }
}

fn paint(field: &mut BiomeField, grid: &TileGrid) {
    for cell in grid.cells() {
        if grid.is_border(cell) {
            continue;
        }
        let Some(center) = field.centers.iter().find(|center| {
            let radius = u64::from(center.radius);
            center.cell.distance_squared(cell) <= radius * radius
        }) else {
            continue;
        };
        let biome = center.biome;
        if let Some(index) = field.index(cell) {
            if let Some(slot) = field.ids.get_mut(index) {
                *slot = biome;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::rng_from_seed;

    fn generated(seed: u64, config: &BiomeConfig) -> (TileGrid, BiomeField) {
        let mut grid = TileGrid::filled(256, 128, Tile::Wall);
        let mut rng = rng_from_seed(seed);
        let field = generate(&mut grid, config, &mut rng);
        (grid, field)
    }

    #[test]
    fn every_biome_claims_its_centre() {
        let config = BiomeConfig::default();
        let (_, field) = generated(11, &config);
        assert_eq!(field.centers().len(), 6);
        for center in field.centers() {
            assert_eq!(field.biome_at(center.cell), center.biome);
        }
        assert_eq!(field.distinct_ids(), vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn biome_rooms_are_carved_inside_the_border() {
        let config = BiomeConfig::default();
        let (grid, field) = generated(5, &config);
        for center in field.centers() {
            assert_eq!(grid.tile(center.cell), Some(Tile::Empty));
        }
        for cell in grid.cells().filter(|cell| grid.is_border(*cell)) {
            assert!(grid.is_wall(cell));
            assert_eq!(field.biome_at(cell), 0);
        }
    }

    #[test]
    fn zero_biomes_leave_the_field_blank() {
        let config = BiomeConfig {
            count: 0,
            ..BiomeConfig::default()
        };
        let (_, field) = generated(1, &config);
        assert_eq!(field.distinct_ids(), vec![0]);
        assert!(field.centers().is_empty());
    }

    #[test]
    fn first_centre_wins_overlaps() {
        let mut field = BiomeField::empty(20, 20);
        field.centers = vec![
            BiomeCenter {
                cell: CellCoord::new(8, 10),
                biome: 2,
                radius: 4,
            },
            BiomeCenter {
                cell: CellCoord::new(11, 10),
                biome: 1,
                radius: 4,
            },
        ];
        let grid = TileGrid::filled(20, 20, Tile::Wall);
        paint(&mut field, &grid);
        assert_eq!(field.biome_at(CellCoord::new(10, 10)), 2);
        assert_eq!(field.biome_at(CellCoord::new(14, 10)), 1);
    }
}
