use std::collections::BTreeSet;

use mazecrawl_core::{Catalog, CellCoord, Tile, WallConfig, WallType};

use crate::{biome::BiomeField, grid::TileGrid};

/// Identifier of the wall type synthesised when the catalog lacks a default.
pub const FALLBACK_WALL_TYPE: &str = "stone";

/// Reasons a strike against a tile is refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StrikeError {
    /// The tile holds no wall.
    #[error("cell {0:?} holds no wall")]
    NotAWall(CellCoord),
    /// The tile belongs to the outer ring.
    #[error("cell {0:?} is part of the outer wall")]
    Boundary(CellCoord),
    /// The wall type only yields to specific tools.
    #[error("`{tool}` is not effective against `{wall}`")]
    ToolNotEffective {
        /// Tool that was used.
        tool: String,
        /// Wall type that refused it.
        wall: String,
    },
}

/// Result of a landed strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrikeOutcome {
    /// The wall absorbed the hit.
    Damaged {
        /// Hit points left.
        remaining: u32,
        /// Hit points the wall started with.
        max: u32,
        /// Durability the wall takes from the tool.
        wear: u32,
    },
    /// The wall reached zero hit points and the tile is now empty.
    Broken {
        /// Durability the wall takes from the tool.
        wear: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct WallKind {
    id: String,
    durability: u32,
    effective_tools: Vec<String>,
    tool_wear: u32,
}

impl WallKind {
    fn from_type(wall: &WallType) -> Self {
        Self {
            id: wall.id.clone(),
            durability: wall.durability,
            effective_tools: wall.effective_tools.clone(),
            tool_wear: wall.tool_wear,
        }
    }

    fn accepts(&self, tool: &str) -> bool {
        self.effective_tools.is_empty() || self.effective_tools.iter().any(|id| id == tool)
    }
}

/// Hit points and wall types for every wall tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WallState {
    columns: u32,
    rows: u32,
    hp: Vec<u32>,
    max: Vec<u32>,
    kind: Vec<Option<usize>>,
    kinds: Vec<WallKind>,
}

impl WallState {
    /// Assigns hit points to every wall tile. Border tiles take the outer
    /// type and door tiles the door type when the catalog defines them.
    pub(crate) fn generate(
        grid: &TileGrid,
        biomes: &BiomeField,
        catalog: &Catalog,
        config: &WallConfig,
        doors: &BTreeSet<CellCoord>,
    ) -> Self {
        let capacity =
            usize::try_from(u64::from(grid.columns()) * u64::from(grid.rows())).unwrap_or(0);
        let default_kind = config
            .default_type
            .as_deref()
            .and_then(|id| catalog.wall(id))
            .map_or_else(
                || WallKind {
                    id: FALLBACK_WALL_TYPE.to_owned(),
                    durability: config.hp_base,
                    effective_tools: Vec::new(),
                    tool_wear: 1,
                },
                WallKind::from_type,
            );
        let mut kinds = vec![default_kind];
        let outer = lookup(catalog, config.outer_type.as_deref()).map(|kind| {
            kinds.push(kind);
            kinds.len() - 1
        });
        let door = lookup(catalog, config.door_type.as_deref()).map(|kind| {
            kinds.push(kind);
            kinds.len() - 1
        });

        let mut state = Self {
            columns: grid.columns(),
            rows: grid.rows(),
            hp: vec![0; capacity],
            max: vec![0; capacity],
            kind: vec![None; capacity],
            kinds,
        };

        for cell in grid.cells() {
            if !grid.is_wall(cell) {
                continue;
            }
            let kind_index = if grid.is_border(cell) {
                outer.unwrap_or(0)
            } else if doors.contains(&cell) {
                door.unwrap_or(0)
            } else {
                0
            };
            let durability = state.kinds[kind_index].durability;
            let scaled = durability
                .saturating_add(config.hp_per_biome.saturating_mul(biomes.biome_at(cell)));
            let hp = scaled.max(1);
            if let Some(index) = state.index(cell) {
                state.hp[index] = hp;
                state.max[index] = hp;
                state.kind[index] = Some(kind_index);
            }
        }
        state
    }

    /// Remaining hit points; 0 for tiles without a wall.
    #[must_use]
    pub fn hp(&self, cell: CellCoord) -> u32 {
        self.index(cell).map_or(0, |index| self.hp[index])
    }

    /// Hit points the wall started with; 0 for tiles without a wall.
    #[must_use]
    pub fn max_hp(&self, cell: CellCoord) -> u32 {
        self.index(cell).map_or(0, |index| self.max[index])
    }

    /// Fraction of hit points left, 1.0 for intact or missing walls.
    #[must_use]
    pub fn integrity(&self, cell: CellCoord) -> f32 {
        let max = self.max_hp(cell);
        if max == 0 {
            return 1.0;
        }
        (self.hp(cell) as f32 / max as f32).clamp(0.0, 1.0)
    }

    /// Wall type identifier of the tile.
    #[must_use]
    pub fn wall_type(&self, cell: CellCoord) -> Option<&str> {
        let index = self.index(cell)?;
        let kind = self.kind[index]?;
        self.kinds.get(kind).map(|kind| kind.id.as_str())
    }

    /// Applies a tool hit. Reaching zero clears the tile exactly once.
    pub(crate) fn strike(
        &mut self,
        grid: &mut TileGrid,
        cell: CellCoord,
        tool: &str,
        damage: u32,
    ) -> Result<StrikeOutcome, StrikeError> {
        let index = self.index(cell).ok_or(StrikeError::NotAWall(cell))?;
        let kind_index = match self.kind[index] {
            Some(kind) if grid.is_wall(cell) => kind,
            _ => return Err(StrikeError::NotAWall(cell)),
        };
        if grid.is_border(cell) {
            return Err(StrikeError::Boundary(cell));
        }
        let kind = &self.kinds[kind_index];
        if !kind.accepts(tool) {
            return Err(StrikeError::ToolNotEffective {
                tool: tool.to_owned(),
                wall: kind.id.clone(),
            });
        }
        let wear = kind.tool_wear;

        let remaining = self.hp[index].saturating_sub(damage);
        self.hp[index] = remaining;
        if remaining > 0 {
            return Ok(StrikeOutcome::Damaged {
                remaining,
                max: self.max[index],
                wear,
            });
        }
        self.max[index] = 0;
        self.kind[index] = None;
        grid.set(cell, Tile::Empty);
        Ok(StrikeOutcome::Broken { wear })
    }

    /// Checks that hit points and types exist exactly where the grid holds walls.
    pub(crate) fn matches(&self, grid: &TileGrid) -> bool {
        grid.cells().all(|cell| {
            let Some(index) = self.index(cell) else {
                return false;
            };
            let hp = self.hp[index];
            if grid.is_wall(cell) {
                hp > 0 && hp <= self.max[index] && self.kind[index].is_some()
            } else {
                hp == 0 && self.kind[index].is_none()
            }
        })
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        Some(usize::try_from(cell.row()).ok()? * width + usize::try_from(cell.column()).ok()?)
    }
}

fn lookup(catalog: &Catalog, id: Option<&str>) -> Option<WallKind> {
    id.and_then(|id| catalog.wall(id)).map(WallKind::from_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.insert_wall(WallType {
            id: "outer".into(),
            name: "Bedrock".into(),
            durability: 999,
            effective_tools: Vec::new(),
            tool_wear: 1,
        });
        catalog.insert_wall(WallType {
            id: "crystal".into(),
            name: "Crystal".into(),
            durability: 5,
            effective_tools: vec!["crystal_pick".into()],
            tool_wear: 2,
        });
        catalog
    }

    fn state_for(grid: &TileGrid, config: &WallConfig) -> WallState {
        let biomes = BiomeField::empty(grid.columns(), grid.rows());
        WallState::generate(grid, &biomes, &catalog(), config, &BTreeSet::new())
    }

    #[test]
    fn two_hits_of_two_break_a_three_hp_wall() {
        let mut grid = TileGrid::parse(&["#####", "#.#.#", "#####"]);
        let state_config = WallConfig::default();
        let mut walls = state_for(&grid, &state_config);
        let target = CellCoord::new(2, 1);
        assert_eq!(walls.hp(target), 3);

        let first = walls.strike(&mut grid, target, "pickaxe_basic", 2);
        assert_eq!(
            first,
            Ok(StrikeOutcome::Damaged {
                remaining: 1,
                max: 3,
                wear: 1
            })
        );
        assert!(grid.is_wall(target));

        let second = walls.strike(&mut grid, target, "pickaxe_basic", 2);
        assert_eq!(second, Ok(StrikeOutcome::Broken { wear: 1 }));
        assert!(!grid.is_wall(target));
        assert_eq!(walls.hp(target), 0);
        assert!(walls.matches(&grid));

        let third = walls.strike(&mut grid, target, "pickaxe_basic", 2);
        assert_eq!(third, Err(StrikeError::NotAWall(target)));
    }

    #[test]
    fn border_uses_outer_type_and_never_breaks() {
        let mut grid = TileGrid::parse(&["###", "#.#", "###"]);
        let mut walls = state_for(&grid, &WallConfig::default());
        let corner = CellCoord::new(0, 0);
        assert_eq!(walls.wall_type(corner), Some("outer"));
        assert_eq!(walls.hp(corner), 999);
        assert_eq!(
            walls.strike(&mut grid, corner, "pickaxe_basic", 1000),
            Err(StrikeError::Boundary(corner))
        );
    }

    #[test]
    fn allow_list_rejects_other_tools() {
        let mut grid = TileGrid::parse(&["#####", "#.#.#", "#####"]);
        let config = WallConfig {
            default_type: Some("crystal".into()),
            ..WallConfig::default()
        };
        let mut walls = state_for(&grid, &config);
        let target = CellCoord::new(2, 1);
        assert!(matches!(
            walls.strike(&mut grid, target, "pickaxe_basic", 9),
            Err(StrikeError::ToolNotEffective { .. })
        ));
        assert_eq!(walls.hp(target), 5);
        assert_eq!(
            walls.strike(&mut grid, target, "crystal_pick", 9),
            Ok(StrikeOutcome::Broken { wear: 2 })
        );
    }

    #[test]
    fn biome_scaling_raises_durability() {
        let grid = TileGrid::parse(&["#####", "#.#.#", "#####"]);
        let mut biomes = BiomeField::empty(5, 3);
        biomes.paint_for_tests(CellCoord::new(2, 1), 4);
        let config = WallConfig {
            hp_per_biome: 2,
            ..WallConfig::default()
        };
        let walls = WallState::generate(&grid, &biomes, &catalog(), &config, &BTreeSet::new());
        assert_eq!(walls.hp(CellCoord::new(2, 1)), 3 + 2 * 4);
        assert!((walls.integrity(CellCoord::new(2, 1)) - 1.0).abs() < f32::EPSILON);
        assert!((walls.integrity(CellCoord::new(1, 1)) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn huge_biome_scaling_saturates() {
        let grid = TileGrid::parse(&["#####", "#.#.#", "#####"]);
        let mut biomes = BiomeField::empty(5, 3);
        biomes.paint_for_tests(CellCoord::new(2, 1), 4);
        let config = WallConfig {
            hp_per_biome: u32::MAX / 2,
            ..WallConfig::default()
        };
        let walls = WallState::generate(&grid, &biomes, &catalog(), &config, &BTreeSet::new());
        assert_eq!(walls.hp(CellCoord::new(2, 1)), u32::MAX);
    }
}
