#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bootstrap system that turns catalog and configuration text into a
//! generated world.
//!
//! Catalog tables are JSON arrays. A table that is not an array is an error,
//! but individual malformed entries are skipped and reported so a single bad
//! designer edit never keeps the dungeon from opening.

use std::fmt;

use mazecrawl_core::{Catalog, EnemyType, GameConfig, ItemType, MapEntitySpec, WallType};
use mazecrawl_world::World;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_ITEMS: &str = include_str!("../assets/items.json");
const DEFAULT_ENEMIES: &str = include_str!("../assets/enemies.json");
const DEFAULT_WALLS: &str = include_str!("../assets/walls.json");
const DEFAULT_MAP_ENTITIES: &str = include_str!("../assets/map_entities.json");

/// Catalog table a source text belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    /// Item types.
    Items,
    /// Enemy types.
    Enemies,
    /// Wall types.
    Walls,
    /// Designer-authored entities.
    MapEntities,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Table::Items => "items",
            Table::Enemies => "enemies",
            Table::Walls => "walls",
            Table::MapEntities => "map entities",
        };
        f.write_str(name)
    }
}

/// Errors that abort catalog or configuration loading.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A table could not be read as a JSON array.
    #[error("{table} table is not a JSON array: {source}")]
    Table {
        /// Table being parsed.
        table: Table,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The game configuration was not valid TOML for the bundle.
    #[error("invalid game configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// The game configuration was not valid JSON for the bundle.
    #[error("invalid game configuration: {0}")]
    JsonConfig(#[from] serde_json::Error),
}

/// Raw table texts; absent tables load as empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct CatalogSources<'a> {
    /// Item type array.
    pub items: Option<&'a str>,
    /// Enemy type array.
    pub enemies: Option<&'a str>,
    /// Wall type array.
    pub walls: Option<&'a str>,
    /// Map entity array.
    pub map_entities: Option<&'a str>,
}

impl CatalogSources<'static> {
    /// Tables shipped with the crate.
    #[must_use]
    pub const fn bundled() -> Self {
        Self {
            items: Some(DEFAULT_ITEMS),
            enemies: Some(DEFAULT_ENEMIES),
            walls: Some(DEFAULT_WALLS),
            map_entities: Some(DEFAULT_MAP_ENTITIES),
        }
    }
}

/// Catalog entry dropped during loading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Table the entry came from.
    pub table: Table,
    /// Position of the entry in its array.
    pub index: usize,
    /// Why the entry was rejected.
    pub reason: String,
}

/// Outcome of loading a catalog.
#[derive(Clone, Debug, Default)]
pub struct CatalogLoad {
    /// Every entry that parsed.
    pub catalog: Catalog,
    /// Entries that were skipped.
    pub skipped: Vec<SkippedEntry>,
}

/// Parses every table, skipping entries that lack required fields.
pub fn load_catalog(sources: CatalogSources<'_>) -> Result<CatalogLoad, CatalogError> {
    let mut load = CatalogLoad::default();

    for item in entries::<ItemType>(Table::Items, sources.items, &mut load.skipped)? {
        load.catalog.insert_item(item);
    }
    for enemy in entries::<EnemyType>(Table::Enemies, sources.enemies, &mut load.skipped)? {
        load.catalog.insert_enemy(enemy);
    }
    for wall in entries::<WallType>(Table::Walls, sources.walls, &mut load.skipped)? {
        load.catalog.insert_wall(wall);
    }
    for entity in entries::<MapEntitySpec>(
        Table::MapEntities,
        sources.map_entities,
        &mut load.skipped,
    )? {
        load.catalog.push_map_entity(entity);
    }

    info!(
        items = load.catalog.items().count(),
        enemies = load.catalog.enemies().count(),
        walls = load.catalog.walls().count(),
        map_entities = load.catalog.map_entities().len(),
        skipped = load.skipped.len(),
        "catalog loaded"
    );
    Ok(load)
}

/// Catalog built from the tables shipped with the crate.
pub fn default_catalog() -> Result<CatalogLoad, CatalogError> {
    load_catalog(CatalogSources::bundled())
}

/// Parses a TOML game configuration; missing sections keep their defaults.
pub fn parse_config(text: &str) -> Result<GameConfig, CatalogError> {
    Ok(toml::from_str(text)?)
}

/// Parses a JSON game configuration; missing sections keep their defaults.
pub fn parse_config_json(text: &str) -> Result<GameConfig, CatalogError> {
    Ok(serde_json::from_str(text)?)
}

fn entries<T>(
    table: Table,
    source: Option<&str>,
    skipped: &mut Vec<SkippedEntry>,
) -> Result<Vec<T>, CatalogError>
where
    T: DeserializeOwned + Identified,
{
    let Some(source) = source else {
        return Ok(Vec::new());
    };
    let values: Vec<Value> =
        serde_json::from_str(source).map_err(|source| CatalogError::Table { table, source })?;

    let mut parsed = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let reason = match serde_json::from_value::<T>(value) {
            Ok(entry) => match entry.missing_field() {
                None => {
                    parsed.push(entry);
                    continue;
                }
                Some(field) => format!("empty `{field}`"),
            },
            Err(error) => error.to_string(),
        };
        warn!(%table, index, %reason, "skipping catalog entry");
        skipped.push(SkippedEntry {
            table,
            index,
            reason,
        });
    }
    Ok(parsed)
}

/// Entries whose identifying text must not be blank.
trait Identified {
    fn missing_field(&self) -> Option<&'static str>;
}

fn blank(text: &str) -> bool {
    text.trim().is_empty()
}

impl Identified for ItemType {
    fn missing_field(&self) -> Option<&'static str> {
        if blank(&self.id) {
            Some("id")
        } else if blank(&self.name) {
            Some("name")
        } else {
            None
        }
    }
}

impl Identified for EnemyType {
    fn missing_field(&self) -> Option<&'static str> {
        if blank(&self.id) {
            Some("type")
        } else if blank(&self.name) {
            Some("name")
        } else {
            None
        }
    }
}

impl Identified for WallType {
    fn missing_field(&self) -> Option<&'static str> {
        if blank(&self.id) {
            Some("id")
        } else if blank(&self.name) {
            Some("name")
        } else {
            None
        }
    }
}

impl Identified for MapEntitySpec {
    fn missing_field(&self) -> Option<&'static str> {
        blank(&self.item_id).then_some("item_id")
    }
}

/// Everything needed to generate a world.
#[derive(Clone, Debug, Default)]
pub struct Bootstrap {
    catalog: Catalog,
    config: GameConfig,
}

impl Bootstrap {
    /// Pairs a catalog with a configuration bundle.
    #[must_use]
    pub fn new(catalog: Catalog, config: GameConfig) -> Self {
        Self { catalog, config }
    }

    /// Bundled catalog with the provided configuration.
    pub fn with_defaults(config: GameConfig) -> Result<Self, CatalogError> {
        Ok(Self::new(default_catalog()?.catalog, config))
    }

    /// Catalog used for generation.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Configuration used for generation.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Mutable access to the configuration before generation.
    pub fn config_mut(&mut self) -> &mut GameConfig {
        &mut self.config
    }

    /// Generates a fresh world from the catalog and configuration.
    #[must_use]
    pub fn generate(&self) -> World {
        World::generate(self.catalog.clone(), self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identifiers_are_reported_by_field() {
        let item: ItemType = serde_json::from_str(r#"{"id": " ", "name": "Ghost"}"#).unwrap();
        assert_eq!(item.missing_field(), Some("id"));
        let enemy: EnemyType = serde_json::from_str(r#"{"type": "bat", "name": ""}"#).unwrap();
        assert_eq!(enemy.missing_field(), Some("name"));
    }

    #[test]
    fn table_names_read_naturally() {
        assert_eq!(Table::MapEntities.to_string(), "map entities");
        assert_eq!(Table::Items.to_string(), "items");
    }
}
