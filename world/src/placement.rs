use mazecrawl_core::{CellCoord, EnemyType, Position, SpriteDescriptor};
use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info, warn};

use crate::{
    ecology,
    entities::{Container, ContainerKind, ContainerSlot, GroundItem, Prop, PropKind, WorldEntity},
    grid::TileGrid,
    seeding::WorldRng,
    World,
};

/// Finds a random cell accepted by `is_free`: bounded random probes over the
/// interior, then a deterministic row-major scan.
pub(crate) fn random_free_cell(
    grid: &TileGrid,
    rng: &mut WorldRng,
    attempts: u32,
    is_free: impl Fn(CellCoord) -> bool,
) -> Option<CellCoord> {
    if grid.columns() < 3 || grid.rows() < 3 {
        return None;
    }
    for _ in 0..attempts {
        let cell = CellCoord::new(
            rng.gen_range(1..grid.columns() - 1),
            rng.gen_range(1..grid.rows() - 1),
        );
        if is_free(cell) {
            return Some(cell);
        }
    }
    grid.cells()
        .filter(|cell| !grid.is_border(*cell))
        .find(|cell| is_free(*cell))
}

/// Runs every placement pipeline in a fixed order.
pub(crate) fn populate(world: &mut World) {
    place_map_entities(world);
    scatter_items(world);
    scatter_chests(world);
    place_spawners(world);
    if world.config.ecology.enabled {
        ecology::populate(world);
    }
    scatter_enemies(world);
    info!(
        entities = world.entities.len(),
        enemies = world.enemies.len(),
        "world populated"
    );
}

fn place_map_entities(world: &mut World) {
    let specs = world.catalog.map_entities().to_vec();
    for spec in specs {
        let position = Position::new(spec.position[0], spec.position[1]);
        let Some(cell) = position.cell().filter(|cell| world.grid.contains(*cell)) else {
            warn!(item = %spec.item_id, ?position, "map entity outside the grid");
            continue;
        };
        if world.grid.is_wall(cell) {
            warn!(item = %spec.item_id, ?cell, "map entity placed inside a wall");
            continue;
        }
        if world.catalog.item(&spec.item_id).is_none() {
            warn!(item = %spec.item_id, "map entity references an unknown item");
            continue;
        }
        let mut entity = world.item_entity(&spec.item_id, position);
        if let Some(sprite) = spec.sprite {
            set_sprite(&mut entity, sprite);
        }
        if !spec.contents.is_empty() {
            let contents: Vec<ContainerSlot> = spec
                .contents
                .iter()
                .map(|stack| ContainerSlot::Stack {
                    item_id: stack.item_id.clone(),
                    quantity: stack.qty,
                })
                .collect();
            entity = into_container(entity, contents);
        }
        let _ = world.entities.insert(entity);
    }
}

fn set_sprite(entity: &mut WorldEntity, sprite: SpriteDescriptor) {
    match entity {
        WorldEntity::Item(item) => item.sprite = sprite,
        WorldEntity::Prop(prop) => prop.sprite = sprite,
        WorldEntity::Container(container) => container.sprite = sprite,
    }
}

/// Authored contents turn any entity into a chest holding exactly those stacks.
fn into_container(entity: WorldEntity, contents: Vec<ContainerSlot>) -> WorldEntity {
    let (item_id, position, sprite, loot, kind) = match entity {
        WorldEntity::Container(container) => (
            container.item_id,
            container.position,
            container.sprite,
            container.loot,
            container.kind,
        ),
        WorldEntity::Item(GroundItem {
            item_id,
            position,
            sprite,
        })
        | WorldEntity::Prop(Prop {
            item_id,
            position,
            sprite,
            ..
        }) => (item_id, position, sprite, None, ContainerKind::Chest),
    };
    WorldEntity::Container(Container {
        item_id,
        position,
        sprite,
        kind,
        contents,
        loot,
        rolled: true,
    })
}

fn scatter_items(world: &mut World) {
    let pool: Vec<String> = world
        .catalog
        .items()
        .filter(|item| item.is_random_pickup())
        .map(|item| item.id.clone())
        .collect();
    if pool.is_empty() {
        if world.config.spawns.random_items > 0 {
            debug!("no item types eligible for random scatter");
        }
        return;
    }
    for _ in 0..world.config.spawns.random_items {
        let Some(item) = pool.choose(&mut world.rng).cloned() else {
            return;
        };
        if !place_item(world, &item) {
            return;
        }
    }
}

fn scatter_chests(world: &mut World) {
    if world.config.spawns.random_chests == 0 {
        return;
    }
    let chest = world.config.spawns.chest_item.clone();
    if world.catalog.item(&chest).is_none() {
        warn!(chest, "chest item missing from catalog");
        return;
    }
    for _ in 0..world.config.spawns.random_chests {
        if !place_item(world, &chest) {
            return;
        }
    }
}

fn place_item(world: &mut World, item: &str) -> bool {
    let Some(cell) = world.random_free_cell() else {
        warn!(item, "no free tile left for scattered entity");
        return false;
    };
    let entity = world.item_entity(item, cell.center());
    let _ = world.entities.insert(entity);
    true
}

fn place_spawners(world: &mut World) {
    let Some(spawner) = world.config.spawns.spawner_item.clone() else {
        return;
    };
    let Some(item) = world.catalog.item(&spawner) else {
        debug!(spawner, "spawner item missing from catalog");
        return;
    };
    let sprite = item.sprite();
    let centers = world.biomes.centers().to_vec();
    for center in centers {
        if world.grid.is_wall(center.cell) || world.entities.is_solid(center.cell) {
            continue;
        }
        let _ = world.entities.insert(WorldEntity::Prop(Prop {
            item_id: spawner.clone(),
            position: center.cell.center(),
            sprite: sprite.clone(),
            kind: PropKind::Spawner {
                biome: center.biome,
            },
        }));
    }
}

fn scatter_enemies(world: &mut World) {
    let pool: Vec<EnemyType> = world
        .catalog
        .enemies()
        .filter(|enemy| !enemy.tier.is_boss())
        .cloned()
        .collect();
    if pool.is_empty() {
        return;
    }
    for _ in 0..world.config.spawns.random_enemies {
        let Some(template) = pool.choose(&mut world.rng).cloned() else {
            return;
        };
        let Some(cell) = world.random_free_cell() else {
            warn!("no free tile left for a random enemy");
            return;
        };
        let _ = world
            .enemies
            .spawn(&template, cell, world.clock, &world.config.enemies, &mut world.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::rng_from_seed;
    use mazecrawl_core::Tile;

    #[test]
    fn scan_fallback_finds_the_last_free_cell() {
        let grid = TileGrid::parse(&["#####", "#####", "###.#", "#####"]);
        let mut rng = rng_from_seed(2);
        let found = random_free_cell(&grid, &mut rng, 0, |cell| {
            grid.tile(cell) == Some(Tile::Empty)
        });
        assert_eq!(found, Some(CellCoord::new(3, 2)));
    }

    #[test]
    fn full_grids_yield_nothing() {
        let grid = TileGrid::parse(&["###", "###", "###"]);
        let mut rng = rng_from_seed(2);
        assert_eq!(
            random_free_cell(&grid, &mut rng, 10, |cell| !grid.is_wall(cell)),
            None
        );
    }

    #[test]
    fn authored_contents_produce_a_rolled_chest() {
        let entity = WorldEntity::Item(GroundItem {
            item_id: "crate".into(),
            position: Position::new(2.5, 2.5),
            sprite: SpriteDescriptor::for_item("crate"),
        });
        let converted = into_container(
            entity,
            vec![ContainerSlot::Stack {
                item_id: "coin".into(),
                quantity: 3,
            }],
        );
        let WorldEntity::Container(container) = converted else {
            panic!("expected a container");
        };
        assert!(container.rolled);
        assert_eq!(container.stacked_units(), 3);
    }
}
