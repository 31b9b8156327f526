//! Game configuration bundle. Every section tolerates partial input.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Element, VisibilityMode};

/// Top-level configuration consumed by generation and simulation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed text; `None` produces a fresh map per run.
    pub seed: Option<String>,
    /// Grid and maze carving parameters.
    pub grid: GridConfig,
    /// Random scatter counts.
    pub spawns: SpawnConfig,
    /// Biome field parameters.
    pub biomes: BiomeConfig,
    /// Wall durability parameters.
    pub walls: WallConfig,
    /// Enemy simulation parameters.
    pub enemies: EnemyConfig,
    /// Fog-of-war parameters.
    pub visibility: VisibilityConfig,
    /// Boss ecology parameters.
    pub ecology: EcologyConfig,
    /// Player defaults.
    pub player: PlayerConfig,
    /// Raycast projection parameters.
    pub render: RenderConfig,
    /// Tick loop parameters.
    pub tick: TickConfig,
}

/// Grid dimensions and maze carving parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Width of carved corridors in tiles.
    pub corridor_width: u32,
    /// Thickness of walls between corridors in tiles.
    pub wall_width: u32,
    /// Chance per traversal step to absorb neighbouring cells into an ad hoc room.
    pub room_probability: f64,
    /// Stamped room parameters.
    pub rooms: RoomConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 256,
            rows: 128,
            corridor_width: 3,
            wall_width: 1,
            room_probability: 0.08,
            rooms: RoomConfig::default(),
        }
    }
}

/// Rectangular rooms stamped after maze carving.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Number of rooms to stamp.
    pub count: u32,
    /// Outer edge length including the wall ring.
    pub size: u32,
    /// Placement attempts before the remaining rooms are skipped.
    pub attempts: u32,
    /// Length of the tunnel carved outward from every door.
    pub tunnel_length: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            count: 8,
            size: 9,
            attempts: 200,
            tunnel_length: 3,
        }
    }
}

/// Random scatter performed after the designer entities are placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Random pickup items.
    pub random_items: u32,
    /// Random chests.
    pub random_chests: u32,
    /// Random regular enemies.
    pub random_enemies: u32,
    /// Item type used for random and spawn-side chests.
    pub chest_item: String,
    /// Item type placed at each biome centre; `None` disables spawners.
    pub spawner_item: Option<String>,
    /// Random probes before falling back to a linear scan.
    pub placement_attempts: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            random_items: 0,
            random_chests: 0,
            random_enemies: 0,
            chest_item: "chest_basic".to_owned(),
            spawner_item: Some("demon_spawn".to_owned()),
            placement_attempts: 500,
        }
    }
}

/// Biome field parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    /// Number of biome centres.
    pub count: u32,
    /// Radius assigned to each biome.
    pub radius: u32,
    /// Radius of the room carved at each centre.
    pub carve_radius: u32,
    /// Distance kept from segment edges when picking centres.
    pub margin: u32,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            count: 6,
            radius: 24,
            carve_radius: 12,
            margin: 2,
        }
    }
}

/// Wall hit point scaling and special wall types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallConfig {
    /// Hit points of the interior wall when no catalog type is configured.
    pub hp_base: u32,
    /// Additional hit points per biome id.
    pub hp_per_biome: u32,
    /// Catalog wall type used for interior walls.
    pub default_type: Option<String>,
    /// Catalog wall type used for the outer ring.
    pub outer_type: Option<String>,
    /// Catalog wall type used for room doors.
    pub door_type: Option<String>,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            hp_base: 3,
            hp_per_biome: 1,
            default_type: None,
            outer_type: Some("outer".to_owned()),
            door_type: Some("door".to_owned()),
        }
    }
}

/// Enemy simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Global movement toggle.
    #[serde(rename = "move")]
    pub move_enabled: bool,
    /// Seconds between steps at speed 1.
    pub slowest_interval: f64,
    /// Seconds between steps at speed 256.
    pub fastest_interval: f64,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            move_enabled: true,
            slowest_interval: 3.0,
            fastest_interval: 1.0,
        }
    }
}

impl EnemyConfig {
    /// Seconds between steps for the speed stat, clamped to `1..=256`.
    #[must_use]
    pub fn movement_interval(&self, speed: u32) -> f64 {
        let clamped = f64::from(speed.clamp(1, 256));
        let fraction = (clamped - 1.0) / 255.0;
        self.slowest_interval - (self.slowest_interval - self.fastest_interval) * fraction
    }
}

/// Fog-of-war parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Gating mode.
    pub mode: VisibilityMode,
    /// Euclidean reveal radius in tiles.
    pub reveal_radius: u32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            mode: VisibilityMode::Reveal,
            reveal_radius: 6,
        }
    }
}

/// Relative pillar counts per element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementShares {
    /// Water share.
    pub water: f32,
    /// Fire share.
    pub fire: f32,
    /// Earth share.
    pub earth: f32,
}

impl Default for ElementShares {
    fn default() -> Self {
        Self {
            water: 1.0,
            fire: 1.0,
            earth: 1.0,
        }
    }
}

impl ElementShares {
    /// Share of the element; negative and non-finite shares count as zero.
    #[must_use]
    pub fn share(&self, element: Element) -> f32 {
        let value = match element {
            Element::Water => self.water,
            Element::Fire => self.fire,
            Element::Earth => self.earth,
        };
        if value.is_finite() && value > 0.0 {
            value
        } else {
            0.0
        }
    }
}

/// Boss ecology parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcologyConfig {
    /// Whether the ecology pass runs.
    pub enabled: bool,
    /// Regular enemies spawned with one unique special item each.
    pub carriers: u32,
    /// Item type representing a lore scroll.
    pub scroll_item: String,
    /// Item type representing a lore pillar.
    pub pillar_item: String,
    /// Target pillar distribution across elements.
    pub shares: ElementShares,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            carriers: 18,
            scroll_item: "lore_scroll".to_owned(),
            pillar_item: "lore_pillar".to_owned(),
            shares: ElementShares::default(),
        }
    }
}

/// Player defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Tool placed in an empty right hand at join.
    pub default_tool: Option<String>,
    /// Backpack placed in an empty backpack slot at join.
    pub default_backpack: Option<String>,
    /// Facing of a fresh player in degrees; 90 faces south.
    pub default_angle_degrees: f32,
    /// Facing change per turn input in degrees.
    pub rotation_step_degrees: f32,
    /// Interpolation speed in degrees per second.
    pub rotation_speed_degrees: f32,
    /// Image used when other players see this player.
    pub sprite: String,
    /// Whether a fresh player receives a chest next to the spawn cell.
    pub spawn_chest: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_tool: Some("pickaxe_basic".to_owned()),
            default_backpack: None,
            default_angle_degrees: 90.0,
            rotation_step_degrees: 45.0,
            rotation_speed_degrees: 360.0,
            sprite: "players/default.png".to_owned(),
            spawn_chest: true,
        }
    }
}

/// Point of the floor-anchor tuning curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloorAnchorPoint {
    /// Distance in tiles where the point applies.
    pub distance: f32,
    /// Vertical offset in screen pixels.
    pub offset: f32,
    /// Height multiplier.
    pub scale: f32,
}

/// Raycast projection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Rays cast per frame, one per screen column.
    pub rays: u32,
    /// Horizontal field of view in degrees.
    pub fov_degrees: f32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// Minimum time between frames for one player.
    pub frame_interval_ms: u64,
    /// Ray length cap in tiles; defaults to the grid diagonal.
    pub max_distance: Option<f32>,
    /// Extra angular margin for sprite culling in degrees.
    pub sprite_margin_degrees: f32,
    /// Live-adjustable pixel bias added to the floor line.
    pub floor_bias: f32,
    /// Piecewise-linear floor-anchor curve.
    pub floor_curve: Vec<FloorAnchorPoint>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rays: 200,
            fov_degrees: 60.0,
            viewport_height: 160,
            frame_interval_ms: 100,
            max_distance: None,
            sprite_margin_degrees: 10.0,
            floor_bias: 4.0,
            floor_curve: vec![FloorAnchorPoint {
                distance: 0.0,
                offset: 0.0,
                scale: 1.0,
            }],
        }
    }
}

impl RenderConfig {
    /// Minimum time between two frames for the same player.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Tick loop parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Ticks per second.
    pub rate_hz: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self { rate_hz: 30 }
    }
}

impl TickConfig {
    /// Simulated duration of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GameConfig = toml::from_str(
            r#"
            seed = "test1"

            [biomes]
            count = 4

            [enemies]
            move = false
            "#,
        )
        .expect("parse");

        assert_eq!(config.seed.as_deref(), Some("test1"));
        assert_eq!(config.biomes.count, 4);
        assert_eq!(config.biomes.radius, 24);
        assert!(!config.enemies.move_enabled);
        assert_eq!(config.grid.columns, 256);
        assert_eq!(config.visibility.mode, VisibilityMode::Reveal);
    }

    #[test]
    fn movement_interval_spans_three_to_one_second() {
        let enemies = EnemyConfig::default();
        assert!((enemies.movement_interval(1) - 3.0).abs() < 1e-9);
        assert!((enemies.movement_interval(256) - 1.0).abs() < 1e-9);
        assert!((enemies.movement_interval(1_000) - 1.0).abs() < 1e-9);
        assert!((enemies.movement_interval(0) - 3.0).abs() < 1e-9);
        let middle = enemies.movement_interval(128);
        assert!(middle > 1.0 && middle < 3.0);
    }

    #[test]
    fn tick_duration_follows_rate() {
        let tick = TickConfig { rate_hz: 20 };
        assert_eq!(tick.tick_duration(), Duration::from_millis(50));
    }

    #[test]
    fn visibility_mode_accepts_all_names() {
        for (name, mode) in [
            ("full", VisibilityMode::Full),
            ("fog", VisibilityMode::Fog),
            ("reveal", VisibilityMode::Reveal),
        ] {
            let parsed: VisibilityConfig =
                toml::from_str(&format!("mode = \"{name}\"")).expect("parse");
            assert_eq!(parsed.mode, mode);
        }
    }
}
