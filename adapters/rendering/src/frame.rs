use mazecrawl_core::Rgb;
use serde::{Deserialize, Serialize};

/// Grid line a ray crossed when it hit the wall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallSide {
    /// Vertical grid line, the face points east or west.
    Vertical,
    /// Horizontal grid line, the face points north or south; drawn darker.
    Horizontal,
}

/// Wall slice drawn in one screen column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Slice height in pixels, centred on the horizon.
    pub height: u32,
    /// Brightness where 255 is fully lit.
    pub shade: u8,
    /// Perpendicular distance to the wall in tiles.
    pub distance: f32,
    /// Orientation of the struck face.
    pub side: WallSide,
}

/// Billboard placed on screen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteDraw {
    /// Image reference.
    pub image: String,
    /// Source rectangle `[x, y, width, height]` inside the image.
    pub source: [u32; 4],
    /// Destination rectangle `[x, y, width, height]` in screen pixels.
    pub dest: [i32; 4],
    /// Euclidean distance from the viewer in tiles.
    pub depth: f32,
}

/// Everything a thin client needs to draw one view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Number of columns, equal to the ray count.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Wall slices from left to right.
    pub columns: Vec<Column>,
    /// Sprites ordered farthest first.
    pub sprites: Vec<SpriteDraw>,
    /// Sky colour of the viewer's biome.
    pub sky: Rgb,
    /// Biome id under the viewer.
    pub biome: u32,
    /// Rendered facing in radians.
    pub angle: f32,
}
