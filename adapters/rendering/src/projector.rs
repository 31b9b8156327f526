use std::f32::consts::{PI, TAU};

use anyhow::{ensure, Result as AnyResult};
use glam::Vec2;
use mazecrawl_core::{CellCoord, FloorAnchorPoint, RenderConfig};

use crate::{
    frame::{Column, Frame, SpriteDraw, WallSide},
    sky_color, Anchor, Billboard, Scene, Viewer,
};

/// Column heights are boosted so corridors fill the viewport.
const HEIGHT_BOOST: f32 = 1.5;
/// Inverse-distance falloff of wall brightness.
const DISTANCE_FALLOFF: f32 = 0.08;
/// Brightness multiplier for horizontal faces.
const HORIZONTAL_FACE_SHADE: f32 = 0.85;
/// Darkest a lit wall may get before the health term.
const MIN_SHADE: f32 = 0.15;
/// Health multiplier of a wall with no hit points left.
const CRACKED_SHADE: f32 = 0.6;
/// Loose items are drawn at half size.
const ITEM_SCALE: f32 = 0.5;
/// Sprites never exceed this multiple of the viewport height.
const MAX_SPRITE_FACTOR: f32 = 3.0;
/// Reference edge of sprite images in pixels.
const REFERENCE_SPRITE_EDGE: f32 = 64.0;
/// Guard against division by zero for grazing rays.
const MIN_DISTANCE: f32 = 1e-4;
/// Billboards closer than this coincide with the viewer and are skipped.
const SELF_DISTANCE: f32 = 1e-3;

/// Piecewise-linear mapping from distance to floor offset and height scale.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorCurve {
    points: Vec<FloorAnchorPoint>,
}

impl FloorCurve {
    /// Builds a curve, ordering the points by distance.
    pub fn new(mut points: Vec<FloorAnchorPoint>) -> AnyResult<Self> {
        for point in &points {
            ensure!(
                point.distance.is_finite() && point.offset.is_finite() && point.scale.is_finite(),
                "floor curve points must be finite (received {point:?})"
            );
            ensure!(
                point.scale >= 0.0,
                "floor curve scale must not be negative (received {})",
                point.scale
            );
        }
        points.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        Ok(Self { points })
    }

    /// Offset in pixels and height multiplier at `distance`.
    ///
    /// Distances outside the curve clamp to its end points; an empty curve
    /// is the identity.
    #[must_use]
    pub fn sample(&self, distance: f32) -> (f32, f32) {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return (0.0, 1.0);
        };
        if distance <= first.distance {
            return (first.offset, first.scale);
        }
        if distance >= last.distance {
            return (last.offset, last.scale);
        }
        for pair in self.points.windows(2) {
            let (near, far) = (pair[0], pair[1]);
            if distance <= far.distance {
                let span = far.distance - near.distance;
                let t = if span > 0.0 {
                    (distance - near.distance) / span
                } else {
                    1.0
                };
                return (
                    near.offset + (far.offset - near.offset) * t,
                    near.scale + (far.scale - near.scale) * t,
                );
            }
        }
        (last.offset, last.scale)
    }
}

/// Validated projection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectorSettings {
    rays: u32,
    fov: f32,
    viewport_height: u32,
    max_distance: Option<f32>,
    sprite_margin: f32,
    floor_bias: f32,
    floor_curve: FloorCurve,
}

impl ProjectorSettings {
    /// Validates the render section of the game configuration.
    pub fn from_config(config: &RenderConfig) -> AnyResult<Self> {
        ensure!(
            config.rays >= 2,
            "at least two rays are required (received {})",
            config.rays
        );
        ensure!(
            config.fov_degrees > 0.0 && config.fov_degrees < 180.0,
            "field of view must lie strictly between 0 and 180 degrees (received {})",
            config.fov_degrees
        );
        ensure!(
            config.viewport_height > 0,
            "viewport height must be positive"
        );
        if let Some(max_distance) = config.max_distance {
            ensure!(
                max_distance.is_finite() && max_distance > 0.0,
                "ray length cap must be positive (received {max_distance})"
            );
        }
        ensure!(
            config.sprite_margin_degrees.is_finite() && config.sprite_margin_degrees >= 0.0,
            "sprite margin must not be negative (received {})",
            config.sprite_margin_degrees
        );
        ensure!(
            config.floor_bias.is_finite(),
            "floor bias must be finite"
        );

        Ok(Self {
            rays: config.rays,
            fov: config.fov_degrees.to_radians(),
            viewport_height: config.viewport_height,
            max_distance: config.max_distance,
            sprite_margin: config.sprite_margin_degrees.to_radians(),
            floor_bias: config.floor_bias,
            floor_curve: FloorCurve::new(config.floor_curve.clone())?,
        })
    }

    /// Rays cast per frame.
    #[must_use]
    pub const fn rays(&self) -> u32 {
        self.rays
    }

    /// Horizontal field of view in radians.
    #[must_use]
    pub const fn fov(&self) -> f32 {
        self.fov
    }

    /// Viewport height in pixels.
    #[must_use]
    pub const fn viewport_height(&self) -> u32 {
        self.viewport_height
    }
}

/// Turns a [`Scene`] and a [`Viewer`] into a [`Frame`].
#[derive(Clone, Debug)]
pub struct Projector {
    settings: ProjectorSettings,
}

struct Hit {
    distance: f32,
    side: WallSide,
    cell: Option<CellCoord>,
}

impl Projector {
    /// Creates a projector.
    #[must_use]
    pub fn new(settings: ProjectorSettings) -> Self {
        Self { settings }
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &ProjectorSettings {
        &self.settings
    }

    /// Current floor-line bias in pixels.
    #[must_use]
    pub fn floor_bias(&self) -> f32 {
        self.settings.floor_bias
    }

    /// Replaces the floor-line bias; non-finite values are ignored.
    pub fn set_floor_bias(&mut self, bias: f32) {
        if bias.is_finite() {
            self.settings.floor_bias = bias;
        }
    }

    /// Projects the scene for one viewer. `elapsed_ms` drives sheet animation.
    pub fn project<S>(&self, scene: &S, viewer: Viewer, elapsed_ms: u64) -> Frame
    where
        S: Scene + ?Sized,
    {
        let rays = self.settings.rays;
        let height = self.settings.viewport_height as f32;
        let fov = self.settings.fov;
        let (columns_count, rows_count) = scene.dimensions();
        let max_distance = self
            .settings
            .max_distance
            .unwrap_or_else(|| (columns_count as f32).hypot(rows_count as f32));

        let columns = (0..rays)
            .map(|ray| {
                let ray_angle =
                    viewer.angle - fov / 2.0 + (ray as f32 / (rays - 1) as f32) * fov;
                let mut hit = cast(scene, viewer.position, ray_angle, max_distance);
                hit.distance *= (ray_angle - viewer.angle).cos();
                self.column(scene, &hit, height)
            })
            .collect();

        let biome = viewer.cell().map_or(0, |cell| scene.biome_at(cell));
        Frame {
            width: rays,
            height: self.settings.viewport_height,
            columns,
            sprites: self.sprites(scene, viewer, elapsed_ms),
            sky: sky_color(biome),
            biome,
            angle: viewer.angle,
        }
    }

    fn column<S>(&self, scene: &S, hit: &Hit, height: f32) -> Column
    where
        S: Scene + ?Sized,
    {
        let distance = hit.distance.max(MIN_DISTANCE);
        let column_height = (HEIGHT_BOOST * height / distance).round().clamp(1.0, height);

        let mut shade = 1.0 / (1.0 + DISTANCE_FALLOFF * distance);
        if hit.side == WallSide::Horizontal {
            shade *= HORIZONTAL_FACE_SHADE;
        }
        shade = shade.clamp(MIN_SHADE, 1.0);
        if let Some(cell) = hit.cell.filter(|cell| scene.is_wall(*cell)) {
            let integrity = scene.wall_integrity(cell).clamp(0.0, 1.0);
            shade *= CRACKED_SHADE + (1.0 - CRACKED_SHADE) * integrity;
        }

        Column {
            height: column_height as u32,
            shade: (255.0 * shade) as u8,
            distance,
            side: hit.side,
        }
    }

    fn sprites<S>(&self, scene: &S, viewer: Viewer, elapsed_ms: u64) -> Vec<SpriteDraw>
    where
        S: Scene + ?Sized,
    {
        let mut billboards = Vec::new();
        scene.billboards(&mut billboards);

        let mut sprites: Vec<SpriteDraw> = billboards
            .iter()
            .filter_map(|billboard| self.place(billboard, viewer, elapsed_ms))
            .collect();
        sprites.sort_by(|left, right| right.depth.total_cmp(&left.depth));
        sprites
    }

    fn place(&self, billboard: &Billboard, viewer: Viewer, elapsed_ms: u64) -> Option<SpriteDraw> {
        let sprite = &billboard.sprite;
        if sprite.image.is_empty() {
            return None;
        }
        let offset: Vec2 = billboard.position - viewer.position;
        let depth = offset.length();
        if depth <= SELF_DISTANCE {
            return None;
        }

        let fov = self.settings.fov;
        let relative = wrap_angle(offset.y.atan2(offset.x) - viewer.angle);
        if relative.abs() > fov / 2.0 + self.settings.sprite_margin {
            return None;
        }

        let last_column = (self.settings.rays - 1) as f32;
        let normalized = (relative + fov / 2.0) / fov;
        let center_x = (normalized * last_column).clamp(0.0, last_column).floor();

        let height = self.settings.viewport_height as f32;
        let base_width = sprite.base_width.max(1.0);
        let base_height = sprite.base_height.max(1.0);
        let (curve_offset, curve_scale) = match billboard.anchor {
            Anchor::Floor => self.settings.floor_curve.sample(depth),
            Anchor::Center => (0.0, 1.0),
        };
        let anchor_scale = match billboard.anchor {
            Anchor::Floor => ITEM_SCALE,
            Anchor::Center => 1.0,
        };

        let out_height = (height / depth
            * (base_height / REFERENCE_SPRITE_EDGE)
            * sprite.scale
            * anchor_scale
            * curve_scale)
            .clamp(1.0, MAX_SPRITE_FACTOR * height)
            .floor();
        let out_width = (out_height * base_width / base_height).floor();
        let x = center_x - (out_width / 2.0).floor();
        let mut y = ((height - out_height) / 2.0).floor() - sprite.y_offset;
        if billboard.anchor == Anchor::Floor {
            y += self.settings.floor_bias + curve_offset;
        }

        let source = match &sprite.sheet {
            Some(sheet) => sheet.source_rect(sheet.frame_at(&billboard.state, elapsed_ms)?),
            None => [0, 0, base_width as u32, base_height as u32],
        };

        Some(SpriteDraw {
            image: sprite.image.clone(),
            source,
            dest: [x as i32, y as i32, out_width as i32, out_height as i32],
            depth,
        })
    }
}

/// Walks the grid along the ray until it leaves the map or enters a wall.
///
/// The reported distance is measured along the ray; callers project it onto
/// the view direction.
fn cast<S>(scene: &S, origin: Vec2, angle: f32, max_distance: f32) -> Hit
where
    S: Scene + ?Sized,
{
    let (columns, rows) = scene.dimensions();
    let direction = Vec2::new(angle.cos(), angle.sin());
    if !direction.is_finite() || !origin.is_finite() {
        return Hit {
            distance: max_distance,
            side: WallSide::Vertical,
            cell: None,
        };
    }
    // A zero component yields infinity, so that axis is never stepped.
    let delta = Vec2::new((1.0 / direction.x).abs(), (1.0 / direction.y).abs());

    let mut map_x = origin.x.floor() as i64;
    let mut map_y = origin.y.floor() as i64;
    let (step_x, mut side_x) = if direction.x < 0.0 {
        (-1, first_crossing(origin.x - map_x as f32, delta.x))
    } else {
        (1, first_crossing(map_x as f32 + 1.0 - origin.x, delta.x))
    };
    let (step_y, mut side_y) = if direction.y < 0.0 {
        (-1, first_crossing(origin.y - map_y as f32, delta.y))
    } else {
        (1, first_crossing(map_y as f32 + 1.0 - origin.y, delta.y))
    };

    loop {
        let side = if side_x < side_y {
            side_x += delta.x;
            map_x += step_x;
            WallSide::Vertical
        } else {
            side_y += delta.y;
            map_y += step_y;
            WallSide::Horizontal
        };
        let distance = match side {
            WallSide::Vertical => side_x - delta.x,
            WallSide::Horizontal => side_y - delta.y,
        };

        let inside = map_x >= 0
            && map_y >= 0
            && map_x < i64::from(columns)
            && map_y < i64::from(rows);
        if !inside {
            return Hit {
                distance,
                side,
                cell: None,
            };
        }
        let cell = CellCoord::new(map_x as u32, map_y as u32);
        if scene.is_wall(cell) || distance >= max_distance {
            return Hit {
                distance,
                side,
                cell: Some(cell),
            };
        }
    }
}

fn first_crossing(fraction: f32, delta: f32) -> f32 {
    if delta.is_finite() {
        fraction * delta
    } else {
        f32::INFINITY
    }
}

fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(distance: f32, offset: f32, scale: f32) -> FloorAnchorPoint {
        FloorAnchorPoint {
            distance,
            offset,
            scale,
        }
    }

    #[test]
    fn floor_curve_interpolates_and_clamps() {
        let curve = FloorCurve::new(vec![point(8.0, 4.0, 0.5), point(0.0, 0.0, 1.0)])
            .expect("valid curve");
        assert_eq!(curve.sample(-1.0), (0.0, 1.0));
        assert_eq!(curve.sample(4.0), (2.0, 0.75));
        assert_eq!(curve.sample(20.0), (4.0, 0.5));
        assert_eq!(FloorCurve::new(Vec::new()).expect("empty").sample(3.0), (0.0, 1.0));
    }

    #[test]
    fn floor_curve_rejects_nonsense() {
        assert!(FloorCurve::new(vec![point(f32::NAN, 0.0, 1.0)]).is_err());
        assert!(FloorCurve::new(vec![point(1.0, 0.0, -1.0)]).is_err());
    }

    #[test]
    fn settings_validation_reports_the_offending_value() {
        let config = RenderConfig {
            rays: 1,
            ..RenderConfig::default()
        };
        let error = ProjectorSettings::from_config(&config).expect_err("one ray");
        assert!(error.to_string().contains("received 1"));

        let config = RenderConfig {
            fov_degrees: 180.0,
            ..RenderConfig::default()
        };
        assert!(ProjectorSettings::from_config(&config).is_err());
        assert!(ProjectorSettings::from_config(&RenderConfig::default()).is_ok());
    }

    #[test]
    fn wrap_angle_stays_in_half_turns() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }
}
