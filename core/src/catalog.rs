//! Static catalog tables describing items, enemies, walls and designer entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Element, Rgb, Slot};

/// Numeric statistics attached to an item type. Missing stats read as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStats {
    /// Weight counted against the backpack budget.
    pub weight: f32,
    /// Hits a tool survives before breaking; zero is treated as one.
    pub durability: u32,
    /// Raw attack strength.
    pub attack: i32,
    /// Raw defense strength.
    pub defense: i32,
    /// Water damage bonus.
    pub water_damage: i32,
    /// Water damage resistance.
    pub water_defense: i32,
    /// Fire damage bonus.
    pub fire_damage: i32,
    /// Fire damage resistance.
    pub fire_defense: i32,
    /// Earth damage bonus.
    pub earth_damage: i32,
    /// Earth damage resistance.
    pub earth_defense: i32,
    /// Weight budget granted when equipped as a backpack.
    pub capacity_weight: f32,
    /// Hit points removed from a wall per strike.
    pub wall_damage: u32,
}

/// Billboard image description shared by entities and enemies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteDescriptor {
    /// Image reference understood by the drawing back end.
    pub image: String,
    /// Width of the source image in pixels.
    pub base_width: f32,
    /// Height of the source image in pixels.
    pub base_height: f32,
    /// Additional size multiplier.
    pub scale: f32,
    /// Vertical lift in screen pixels.
    pub y_offset: f32,
    /// Optional animation sheet.
    pub sheet: Option<SpriteSheet>,
}

impl Default for SpriteDescriptor {
    fn default() -> Self {
        Self {
            image: String::new(),
            base_width: 64.0,
            base_height: 64.0,
            scale: 1.0,
            y_offset: 0.0,
            sheet: None,
        }
    }
}

impl SpriteDescriptor {
    /// Default 64x64 sprite named after the item type.
    #[must_use]
    pub fn for_item(item_id: &str) -> Self {
        Self {
            image: format!("items/{item_id}.png"),
            ..Self::default()
        }
    }

    /// Default 64x64 sprite pointing at the provided image.
    #[must_use]
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }
}

/// Grid-aligned animation sheet with named frame sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteSheet {
    /// Width of one frame in pixels.
    pub frame_width: u32,
    /// Height of one frame in pixels.
    pub frame_height: u32,
    /// Frames per sheet row.
    pub columns: u32,
    /// Display time of a single frame in milliseconds.
    pub frame_ms: u32,
    /// Frame indices per animation state.
    pub states: BTreeMap<String, Vec<u32>>,
}

impl Default for SpriteSheet {
    fn default() -> Self {
        Self {
            frame_width: 64,
            frame_height: 64,
            columns: 1,
            frame_ms: 150,
            states: BTreeMap::new(),
        }
    }
}

impl SpriteSheet {
    /// Frame to display for `state` after `elapsed_ms`, falling back to the `idle` sequence.
    #[must_use]
    pub fn frame_at(&self, state: &str, elapsed_ms: u64) -> Option<u32> {
        let frames = self
            .states
            .get(state)
            .or_else(|| self.states.get("idle"))
            .filter(|frames| !frames.is_empty())?;
        let step = elapsed_ms / u64::from(self.frame_ms.max(1));
        let index = usize::try_from(step % frames.len() as u64).ok()?;
        frames.get(index).copied()
    }

    /// Source rectangle `[x, y, width, height]` of a frame.
    #[must_use]
    pub fn source_rect(&self, frame: u32) -> [u32; 4] {
        let columns = self.columns.max(1);
        [
            (frame % columns) * self.frame_width,
            (frame / columns) * self.frame_height,
            self.frame_width,
            self.frame_height,
        ]
    }
}

/// Per-item billboard tuning that overrides the sprite defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOverride {
    /// Replacement size multiplier.
    pub scale: Option<f32>,
    /// Replacement vertical lift.
    pub y_offset: Option<f32>,
}

/// Weighted entry of a container roll table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item type produced by the entry.
    pub item_id: String,
    /// Relative selection weight.
    #[serde(default = "one")]
    pub weight: u32,
    /// Minimum quantity produced.
    #[serde(default = "one")]
    pub min: u32,
    /// Maximum quantity produced.
    #[serde(default = "one")]
    pub max: u32,
}

/// Roll table used once per container instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    /// Number of draws from the entries.
    #[serde(default = "one")]
    pub rolls: u32,
    /// Candidate entries.
    #[serde(default)]
    pub entries: Vec<LootEntry>,
}

/// Catalog entry describing an item type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemType {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Slots the item may be equipped in.
    #[serde(default)]
    pub allowed_slots: Vec<Slot>,
    /// Numeric statistics.
    #[serde(default)]
    pub stats: ItemStats,
    /// Inactive items are never scattered randomly.
    #[serde(default = "enabled")]
    pub active: bool,
    /// Enemy type a spawner item produces.
    #[serde(default)]
    pub spawn_type: Option<String>,
    /// Eligible as a carried item in the boss ecology.
    #[serde(default)]
    pub special: bool,
    /// Roll table when the item acts as a container.
    #[serde(default)]
    pub container: Option<LootTable>,
    /// Billboard description.
    #[serde(default)]
    pub sprite: Option<SpriteDescriptor>,
    /// Billboard tuning overrides.
    #[serde(default)]
    pub render: Option<RenderOverride>,
}

impl ItemType {
    /// Whether the item may occupy the slot.
    #[must_use]
    pub fn can_equip(&self, slot: Slot) -> bool {
        self.allowed_slots.contains(&slot)
    }

    /// Whether the item grants carrying capacity.
    #[must_use]
    pub fn is_backpack(&self) -> bool {
        self.can_equip(Slot::Backpack)
    }

    /// Whether the item may be scattered as a random pickup.
    #[must_use]
    pub fn is_random_pickup(&self) -> bool {
        self.active && !self.allowed_slots.is_empty()
    }

    /// Sprite for the item, defaulting to an image named after its id.
    #[must_use]
    pub fn sprite(&self) -> SpriteDescriptor {
        let mut sprite = self
            .sprite
            .clone()
            .unwrap_or_else(|| SpriteDescriptor::for_item(&self.id));
        if let Some(render) = &self.render {
            if let Some(scale) = render.scale {
                sprite.scale = scale;
            }
            if let Some(y_offset) = render.y_offset {
                sprite.y_offset = y_offset;
            }
        }
        sprite
    }
}

/// Enemy statistics cloned into every instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyStats {
    /// Hit points.
    pub health: i32,
    /// Movement speed stat; zero never moves.
    pub speed: u32,
    /// Accumulated damage.
    pub damaged: i32,
    /// Armour durability.
    pub durability: i32,
    /// Stamina pool.
    pub stamina: i32,
    /// Attack strength.
    pub attack: i32,
    /// Defense strength.
    pub defense: i32,
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            health: 1,
            speed: 0,
            damaged: 0,
            durability: 0,
            stamina: 0,
            attack: 0,
            defense: 0,
        }
    }
}

/// Power tier of an enemy type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyTier {
    /// Ordinary roaming enemy.
    #[default]
    Regular,
    /// Unique boss.
    Boss,
    /// Unique boss above the regular boss tier.
    Super,
}

impl EnemyTier {
    /// Whether the tier spawns exactly once through the boss ecology.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, EnemyTier::Boss | EnemyTier::Super)
    }
}

/// Catalog entry describing an enemy type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyType {
    /// Unique identifier.
    #[serde(rename = "type", alias = "id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Template statistics.
    #[serde(default)]
    pub stats: EnemyStats,
    /// Power tier.
    #[serde(default)]
    pub tier: EnemyTier,
    /// Elemental affinity.
    #[serde(default)]
    pub element: Option<Element>,
    /// Name of the behavior that drives the type.
    #[serde(default)]
    pub ai: Option<String>,
    /// Image reference for the billboard.
    #[serde(default)]
    pub image: Option<String>,
    /// Colour of radar pings.
    #[serde(default)]
    pub ping_color: Option<Rgb>,
    /// Backstory used by lore scrolls.
    #[serde(default)]
    pub backstory: Option<String>,
    /// Full billboard description, overriding `image`.
    #[serde(default)]
    pub sprite: Option<SpriteDescriptor>,
}

impl EnemyType {
    /// Movement speed clamped to the supported range.
    #[must_use]
    pub fn speed(&self) -> u32 {
        self.stats.speed.min(256)
    }

    /// Sprite for the type, defaulting to an image named after its id.
    #[must_use]
    pub fn sprite(&self) -> SpriteDescriptor {
        if let Some(sprite) = &self.sprite {
            return sprite.clone();
        }
        let image = self
            .image
            .clone()
            .unwrap_or_else(|| format!("enemies/{}.png", self.id));
        SpriteDescriptor::with_image(image)
    }
}

/// Catalog entry describing a wall type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallType {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Base hit points.
    #[serde(default = "default_wall_durability")]
    pub durability: u32,
    /// Tools that can damage the wall; empty accepts every tool.
    #[serde(default)]
    pub effective_tools: Vec<String>,
    /// Durability a tool loses per strike.
    #[serde(default = "one")]
    pub tool_wear: u32,
}

impl WallType {
    /// Whether the tool may damage this wall type.
    #[must_use]
    pub fn accepts(&self, tool: &str) -> bool {
        self.effective_tools.is_empty() || self.effective_tools.iter().any(|id| id == tool)
    }
}

/// Item stack stored inside a designer-authored container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    /// Item type.
    pub item_id: String,
    /// Units in the stack.
    #[serde(default = "one")]
    pub qty: u32,
}

/// Designer-authored entity placed verbatim at generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapEntitySpec {
    /// Item type of the entity.
    pub item_id: String,
    /// Continuous position in tile units.
    #[serde(rename = "pos", alias = "position")]
    pub position: [f32; 2],
    /// Billboard override.
    #[serde(default)]
    pub sprite: Option<SpriteDescriptor>,
    /// Container contents; a non-empty list makes the entity a container.
    #[serde(default)]
    pub contents: Vec<StackSpec>,
}

/// All static tables consumed by generation and simulation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    items: BTreeMap<String, ItemType>,
    enemies: BTreeMap<String, EnemyType>,
    walls: BTreeMap<String, WallType>,
    map_entities: Vec<MapEntitySpec>,
}

impl Catalog {
    /// Registers or replaces an item type.
    pub fn insert_item(&mut self, item: ItemType) {
        let _ = self.items.insert(item.id.clone(), item);
    }

    /// Registers or replaces an enemy type.
    pub fn insert_enemy(&mut self, enemy: EnemyType) {
        let _ = self.enemies.insert(enemy.id.clone(), enemy);
    }

    /// Registers or replaces a wall type.
    pub fn insert_wall(&mut self, wall: WallType) {
        let _ = self.walls.insert(wall.id.clone(), wall);
    }

    /// Appends a designer-authored entity.
    pub fn push_map_entity(&mut self, entity: MapEntitySpec) {
        self.map_entities.push(entity);
    }

    /// Looks up an item type.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<&ItemType> {
        self.items.get(id)
    }

    /// Looks up an enemy type.
    #[must_use]
    pub fn enemy(&self, id: &str) -> Option<&EnemyType> {
        self.enemies.get(id)
    }

    /// Looks up a wall type.
    #[must_use]
    pub fn wall(&self, id: &str) -> Option<&WallType> {
        self.walls.get(id)
    }

    /// Item types in identifier order.
    pub fn items(&self) -> impl Iterator<Item = &ItemType> {
        self.items.values()
    }

    /// Enemy types in identifier order.
    pub fn enemies(&self) -> impl Iterator<Item = &EnemyType> {
        self.enemies.values()
    }

    /// Wall types in identifier order.
    pub fn walls(&self) -> impl Iterator<Item = &WallType> {
        self.walls.values()
    }

    /// Designer-authored entities in file order.
    #[must_use]
    pub fn map_entities(&self) -> &[MapEntitySpec] {
        &self.map_entities
    }

    /// Weight of an item type, zero when unknown.
    #[must_use]
    pub fn weight_of(&self, id: &str) -> f32 {
        self.item(id).map_or(0.0, |item| item.stats.weight)
    }
}

const fn one() -> u32 {
    1
}

const fn enabled() -> bool {
    true
}

const fn default_wall_durability() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_defaults_fill_missing_fields() {
        let item: ItemType =
            serde_json::from_str(r#"{"id": "torch", "name": "Torch"}"#).expect("parse");
        assert!(item.active);
        assert!(item.allowed_slots.is_empty());
        assert!(!item.is_random_pickup());
        assert_eq!(item.sprite().image, "items/torch.png");
    }

    #[test]
    fn render_override_replaces_sprite_tuning() {
        let item: ItemType = serde_json::from_str(
            r#"{"id": "gem", "name": "Gem", "render": {"scale": 0.5, "y_offset": 3}}"#,
        )
        .expect("parse");
        let sprite = item.sprite();
        assert_eq!(sprite.scale, 0.5);
        assert_eq!(sprite.y_offset, 3.0);
    }

    #[test]
    fn enemy_type_reads_type_field() {
        let enemy: EnemyType = serde_json::from_str(
            r#"{"type": "slime", "name": "Slime", "stats": {"speed": 400}, "tier": "regular"}"#,
        )
        .expect("parse");
        assert_eq!(enemy.id, "slime");
        assert_eq!(enemy.speed(), 256);
        assert_eq!(enemy.stats.health, 1);
        assert_eq!(enemy.sprite().image, "enemies/slime.png");
    }

    #[test]
    fn wall_allow_list_gates_tools() {
        let open = WallType {
            id: "stone".to_owned(),
            name: "Stone".to_owned(),
            durability: 3,
            effective_tools: Vec::new(),
            tool_wear: 1,
        };
        let picky = WallType {
            effective_tools: vec!["pickaxe_iron".to_owned()],
            ..open.clone()
        };
        assert!(open.accepts("shovel"));
        assert!(picky.accepts("pickaxe_iron"));
        assert!(!picky.accepts("shovel"));
    }

    #[test]
    fn sprite_sheet_cycles_state_frames() {
        let mut sheet = SpriteSheet {
            columns: 4,
            frame_ms: 100,
            ..SpriteSheet::default()
        };
        let _ = sheet.states.insert("idle".to_owned(), vec![0, 1]);
        let _ = sheet.states.insert("walk".to_owned(), vec![4, 5, 6]);

        assert_eq!(sheet.frame_at("walk", 0), Some(4));
        assert_eq!(sheet.frame_at("walk", 250), Some(6));
        assert_eq!(sheet.frame_at("walk", 300), Some(4));
        assert_eq!(sheet.frame_at("attack", 150), Some(1));
        assert_eq!(sheet.source_rect(5), [64, 64, 64, 64]);
    }

    #[test]
    fn map_entity_reads_pos_field() {
        let spec: MapEntitySpec =
            serde_json::from_str(r#"{"item_id": "chest_basic", "pos": [3.5, 4.5]}"#)
                .expect("parse");
        assert_eq!(spec.position, [3.5, 4.5]);
        assert!(spec.contents.is_empty());
    }
}
