#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Raycast projection of the shared maze into per-player frames.
//!
//! The projector never touches the authoritative world directly. Anything
//! implementing [`Scene`] can be projected, which keeps the raycaster
//! testable against hand-built mazes.

use glam::Vec2;
use mazecrawl_core::{CellCoord, Position, Rgb, SpriteDescriptor};

mod frame;
mod projector;

pub use frame::{Column, Frame, SpriteDraw, WallSide};
pub use projector::{FloorCurve, Projector, ProjectorSettings};

/// Read-only view of the world consumed by the projector.
pub trait Scene {
    /// Grid dimensions as `(columns, rows)`.
    fn dimensions(&self) -> (u32, u32);

    /// Whether the cell stops rays.
    fn is_wall(&self, cell: CellCoord) -> bool;

    /// Remaining wall health in `0.0..=1.0`; intact walls report `1.0`.
    fn wall_integrity(&self, _cell: CellCoord) -> f32 {
        1.0
    }

    /// Biome id painted on the cell; `0` outside every biome.
    fn biome_at(&self, _cell: CellCoord) -> u32 {
        0
    }

    /// Appends every billboard that could appear in a frame.
    fn billboards(&self, out: &mut Vec<Billboard>);
}

/// Vertical placement of a billboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// Rests on the floor line; used for loose items.
    Floor,
    /// Centred on the horizon; used for enemies, players and fixtures.
    Center,
}

/// World-space sprite awaiting projection.
#[derive(Clone, Debug, PartialEq)]
pub struct Billboard {
    /// Continuous position in tile units.
    pub position: Vec2,
    /// Image description.
    pub sprite: SpriteDescriptor,
    /// Vertical placement.
    pub anchor: Anchor,
    /// Animation state used to pick sheet frames.
    pub state: String,
}

impl Billboard {
    /// Creates a billboard in the `idle` animation state.
    #[must_use]
    pub fn new(position: Position, sprite: SpriteDescriptor, anchor: Anchor) -> Self {
        Self {
            position: Vec2::new(position.x, position.y),
            sprite,
            anchor,
            state: "idle".to_owned(),
        }
    }
}

/// Eye of a projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewer {
    /// Continuous position in tile units.
    pub position: Vec2,
    /// Facing in radians; 0 faces east and angles grow clockwise.
    pub angle: f32,
}

impl Viewer {
    /// Creates a viewer at the provided position.
    #[must_use]
    pub fn new(position: Position, angle: f32) -> Self {
        Self {
            position: Vec2::new(position.x, position.y),
            angle,
        }
    }

    /// Cell containing the viewer.
    #[must_use]
    pub fn cell(&self) -> Option<CellCoord> {
        Position::new(self.position.x, self.position.y).cell()
    }
}

const SKY_PALETTE: [Rgb; 7] = [
    Rgb::new(0, 0, 0),
    Rgb::new(255, 120, 120),
    Rgb::new(255, 190, 120),
    Rgb::new(255, 255, 150),
    Rgb::new(120, 220, 150),
    Rgb::new(150, 200, 255),
    Rgb::new(200, 150, 255),
];

/// Sky colour for a biome id; ids without a palette entry get a black sky.
#[must_use]
pub fn sky_color(biome: u32) -> Rgb {
    usize::try_from(biome)
        .ok()
        .and_then(|index| SKY_PALETTE.get(index))
        .copied()
        .unwrap_or(SKY_PALETTE[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_palette_falls_back_to_black() {
        assert_eq!(sky_color(0), Rgb::new(0, 0, 0));
        assert_eq!(sky_color(5), Rgb::new(150, 200, 255));
        assert_eq!(sky_color(42), Rgb::new(0, 0, 0));
    }

    #[test]
    fn viewer_cell_floors_the_position() {
        let viewer = Viewer::new(Position::new(3.5, 7.25), 0.0);
        assert_eq!(viewer.cell(), Some(CellCoord::new(3, 7)));
        let outside = Viewer::new(Position::new(-0.5, 1.0), 0.0);
        assert_eq!(outside.cell(), None);
    }
}
