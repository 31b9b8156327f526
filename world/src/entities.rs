use std::collections::{BTreeMap, BTreeSet};

use mazecrawl_core::{CellCoord, Element, EntityId, LootTable, LoreId, Position, SpriteDescriptor};

/// Loose item lying on the floor.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundItem {
    /// Item type identifier.
    pub item_id: String,
    /// Continuous position used for billboard alignment.
    pub position: Position,
    /// Billboard description.
    pub sprite: SpriteDescriptor,
}

/// Behaviour attached to a prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropKind {
    /// Marks the heart of a biome.
    Spawner {
        /// Biome the spawner belongs to.
        biome: u32,
    },
}

/// Static, non-interactive scenery.
#[derive(Clone, Debug, PartialEq)]
pub struct Prop {
    /// Item type identifier.
    pub item_id: String,
    /// Continuous position used for billboard alignment.
    pub position: Position,
    /// Billboard description.
    pub sprite: SpriteDescriptor,
    /// Behaviour of the prop.
    pub kind: PropKind,
}

/// Flavour of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// Chest holding rolled or authored item stacks.
    Chest,
    /// Elemental pillar holding lore scrolls.
    Pillar {
        /// Element the pillar is attuned to.
        element: Element,
    },
}

/// One entry stored in a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerSlot {
    /// Stack of identical items.
    Stack {
        /// Item type identifier.
        item_id: String,
        /// Units in the stack.
        quantity: u32,
    },
    /// Readable lore scroll.
    Lore(LoreId),
}

/// Entity that stores items or scrolls.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
    /// Item type identifier.
    pub item_id: String,
    /// Continuous position used for billboard alignment.
    pub position: Position,
    /// Billboard description.
    pub sprite: SpriteDescriptor,
    /// Flavour of the container.
    pub kind: ContainerKind,
    /// Current contents; rolled stacks precede lore entries.
    pub contents: Vec<ContainerSlot>,
    /// Table rolled the first time the container is opened.
    pub loot: Option<LootTable>,
    /// Whether the loot table was already rolled.
    pub rolled: bool,
}

impl Container {
    /// Item units stored in stacks.
    #[must_use]
    pub fn stacked_units(&self) -> u32 {
        self.contents
            .iter()
            .map(|slot| match slot {
                ContainerSlot::Stack { quantity, .. } => *quantity,
                ContainerSlot::Lore(_) => 0,
            })
            .sum()
    }

    /// First lore entry stored in the container.
    #[must_use]
    pub fn first_lore(&self) -> Option<LoreId> {
        self.contents.iter().find_map(|slot| match slot {
            ContainerSlot::Lore(lore) => Some(*lore),
            ContainerSlot::Stack { .. } => None,
        })
    }
}

/// Every kind of entity that can stand on a tile.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldEntity {
    /// Loose item.
    Item(GroundItem),
    /// Scenery.
    Prop(Prop),
    /// Chest or pillar.
    Container(Container),
}

impl WorldEntity {
    /// Item type identifier backing the entity.
    #[must_use]
    pub fn item_id(&self) -> &str {
        match self {
            WorldEntity::Item(item) => &item.item_id,
            WorldEntity::Prop(prop) => &prop.item_id,
            WorldEntity::Container(container) => &container.item_id,
        }
    }

    /// Continuous position of the entity.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            WorldEntity::Item(item) => item.position,
            WorldEntity::Prop(prop) => prop.position,
            WorldEntity::Container(container) => container.position,
        }
    }

    /// Billboard description of the entity.
    #[must_use]
    pub fn sprite(&self) -> &SpriteDescriptor {
        match self {
            WorldEntity::Item(item) => &item.sprite,
            WorldEntity::Prop(prop) => &prop.sprite,
            WorldEntity::Container(container) => &container.sprite,
        }
    }

    /// Tile the entity blocks.
    #[must_use]
    pub fn cell(&self) -> Option<CellCoord> {
        self.position().cell()
    }

    /// Whether the billboard rests on the floor rather than floating at eye level.
    #[must_use]
    pub const fn is_floor_anchored(&self) -> bool {
        matches!(self, WorldEntity::Item(_))
    }
}

/// Entity collection with an incrementally maintained solid-cell index.
#[derive(Clone, Debug, Default)]
pub struct EntityStore {
    next_id: u32,
    entities: BTreeMap<EntityId, WorldEntity>,
    solid: BTreeMap<CellCoord, BTreeSet<EntityId>>,
}

impl EntityStore {
    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&WorldEntity> {
        self.entities.get(&id)
    }

    /// Entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &WorldEntity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether an entity blocks the cell.
    #[must_use]
    pub fn is_solid(&self, cell: CellCoord) -> bool {
        self.solid.get(&cell).is_some_and(|ids| !ids.is_empty())
    }

    /// Entities standing on the cell, oldest first.
    #[must_use]
    pub fn at(&self, cell: CellCoord) -> Vec<EntityId> {
        self.solid
            .get(&cell)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert(&mut self, entity: WorldEntity) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        if let Some(cell) = entity.cell() {
            let _ = self.solid.entry(cell).or_default().insert(id);
        }
        let _ = self.entities.insert(id, entity);
        id
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<WorldEntity> {
        let entity = self.entities.remove(&id)?;
        if let Some(cell) = entity.cell() {
            if let Some(ids) = self.solid.get_mut(&cell) {
                let _ = ids.remove(&id);
                if ids.is_empty() {
                    let _ = self.solid.remove(&cell);
                }
            }
        }
        Some(entity)
    }

    /// Mutable access to container contents. Positions never change in place,
    /// so the solid index stays valid.
    pub(crate) fn container_mut(&mut self, id: EntityId) -> Option<&mut Container> {
        match self.entities.get_mut(&id)? {
            WorldEntity::Container(container) => Some(container),
            WorldEntity::Item(_) | WorldEntity::Prop(_) => None,
        }
    }

    /// Whether the maintained index equals one rebuilt from the entity list.
    pub(crate) fn index_is_consistent(&self) -> bool {
        let mut rebuilt: BTreeMap<CellCoord, BTreeSet<EntityId>> = BTreeMap::new();
        for (id, entity) in &self.entities {
            if let Some(cell) = entity.cell() {
                let _ = rebuilt.entry(cell).or_default().insert(*id);
            }
        }
        rebuilt == self.solid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_at(x: f32, y: f32) -> WorldEntity {
        WorldEntity::Item(GroundItem {
            item_id: "potion".into(),
            position: Position::new(x, y),
            sprite: SpriteDescriptor::for_item("potion"),
        })
    }

    #[test]
    fn solid_index_follows_insert_and_remove() {
        let mut store = EntityStore::default();
        let first = store.insert(item_at(3.5, 4.5));
        let second = store.insert(item_at(3.2, 4.9));
        let cell = CellCoord::new(3, 4);
        assert!(store.is_solid(cell));
        assert_eq!(store.at(cell), vec![first, second]);

        let _ = store.remove(first);
        assert!(store.is_solid(cell));
        let _ = store.remove(second);
        assert!(!store.is_solid(cell));
        assert!(store.is_empty());
        assert!(store.index_is_consistent());
    }

    #[test]
    fn containers_report_units_and_lore() {
        let container = Container {
            item_id: "chest_basic".into(),
            position: Position::new(1.5, 1.5),
            sprite: SpriteDescriptor::for_item("chest_basic"),
            kind: ContainerKind::Chest,
            contents: vec![
                ContainerSlot::Stack {
                    item_id: "coin".into(),
                    quantity: 4,
                },
                ContainerSlot::Lore(LoreId::new(2)),
                ContainerSlot::Lore(LoreId::new(5)),
            ],
            loot: None,
            rolled: false,
        };
        assert_eq!(container.stacked_units(), 4);
        assert_eq!(container.first_lore(), Some(LoreId::new(2)));
    }
}
