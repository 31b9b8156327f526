use std::collections::BTreeMap;

use glam::Vec2;
use mazecrawl_core::{CellCoord, Position, RenderConfig, Rgb, SpriteDescriptor, SpriteSheet};
use mazecrawl_rendering::{
    Anchor, Billboard, Frame, Projector, ProjectorSettings, Scene, Viewer, WallSide,
};

#[derive(Default)]
struct AsciiScene {
    rows: Vec<Vec<bool>>,
    integrity: BTreeMap<CellCoord, f32>,
    biome: u32,
    billboards: Vec<Billboard>,
}

impl AsciiScene {
    fn parse(rows: &[&str]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.chars().map(|glyph| glyph == '#').collect())
                .collect(),
            ..Self::default()
        }
    }
}

impl Scene for AsciiScene {
    fn dimensions(&self) -> (u32, u32) {
        (self.rows[0].len() as u32, self.rows.len() as u32)
    }

    fn is_wall(&self, cell: CellCoord) -> bool {
        self.rows[cell.row() as usize][cell.column() as usize]
    }

    fn wall_integrity(&self, cell: CellCoord) -> f32 {
        self.integrity.get(&cell).copied().unwrap_or(1.0)
    }

    fn biome_at(&self, _cell: CellCoord) -> u32 {
        self.biome
    }

    fn billboards(&self, out: &mut Vec<Billboard>) {
        out.extend(self.billboards.iter().cloned());
    }
}

/// Open hall with a wall running down column 7.
fn hall() -> AsciiScene {
    AsciiScene::parse(&[
        "################",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "#......#.......#",
        "################",
    ])
}

fn projector(rays: u32) -> Projector {
    let config = RenderConfig {
        rays,
        ..RenderConfig::default()
    };
    Projector::new(ProjectorSettings::from_config(&config).expect("valid settings"))
}

fn east_of(x: f32, y: f32) -> Viewer {
    Viewer::new(Position::new(x, y), 0.0)
}

fn centre(frame: &Frame) -> mazecrawl_rendering::Column {
    frame.columns[frame.columns.len() / 2]
}

#[test]
fn wall_five_tiles_ahead_reports_perpendicular_distance_five() {
    let frame = projector(201).project(&hall(), east_of(2.0, 6.5), 0);

    let column = centre(&frame);
    assert!((column.distance - 5.0).abs() < 0.1, "{}", column.distance);
    assert_eq!(column.height, 48);
    assert_eq!(column.side, WallSide::Vertical);
}

#[test]
fn flat_walls_have_no_fisheye() {
    let frame = projector(61).project(&hall(), east_of(2.0, 6.5), 0);
    for column in &frame.columns {
        assert!((column.distance - 5.0).abs() < 1e-3, "{}", column.distance);
    }
    let heights: Vec<u32> = frame.columns.iter().map(|column| column.height).collect();
    assert!(heights.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn column_height_is_clamped_to_the_viewport() {
    let frame = projector(3).project(&hall(), east_of(6.9, 6.5), 0);
    assert_eq!(centre(&frame).height, 160);
}

#[test]
fn horizontal_faces_and_cracked_walls_are_darker() {
    let scene = hall();
    let facing_south = Viewer::new(Position::new(3.5, 6.5), std::f32::consts::FRAC_PI_2);
    let south = projector(3).project(&scene, facing_south, 0);
    let east = projector(3).project(&scene, east_of(3.5, 6.5), 0);
    assert_eq!(centre(&south).side, WallSide::Horizontal);
    // South wall at distance 5.5 versus the divider at 3.5 on the same row.
    assert!(centre(&south).shade < centre(&east).shade);

    let mut cracked = hall();
    let _ = cracked.integrity.insert(CellCoord::new(7, 6), 0.0);
    let dim = projector(3).project(&cracked, east_of(3.5, 6.5), 0);
    let ratio = f32::from(centre(&dim).shade) / f32::from(centre(&east).shade);
    assert!((ratio - 0.6).abs() < 0.02, "{ratio}");
}

#[test]
fn sprites_are_sorted_farthest_first_and_culled_outside_the_view() {
    let mut scene = hall();
    for x in [3.5, 5.5, 4.5] {
        scene.billboards.push(Billboard::new(
            Position::new(x, 6.5),
            SpriteDescriptor::with_image(format!("enemies/{x}.png")),
            Anchor::Center,
        ));
    }
    scene.billboards.push(Billboard::new(
        Position::new(1.5, 6.5),
        SpriteDescriptor::with_image("behind.png"),
        Anchor::Center,
    ));
    scene.billboards.push(Billboard::new(
        Position::new(2.0, 6.5),
        SpriteDescriptor::with_image("self.png"),
        Anchor::Center,
    ));

    let frame = projector(200).project(&scene, east_of(2.0, 6.5), 0);
    let depths: Vec<f32> = frame.sprites.iter().map(|sprite| sprite.depth).collect();
    assert_eq!(depths, vec![3.5, 2.5, 1.5]);
    assert!(frame.sprites.iter().all(|sprite| sprite.image.starts_with("enemies/")));

    let nearest = frame.sprites.last().expect("sprite");
    let [x, _, width, height] = nearest.dest;
    assert_eq!(height, (160.0_f32 / 1.5).floor() as i32);
    assert_eq!(width, height);
    assert_eq!(x + width / 2, 99);
}

#[test]
fn floor_items_drop_to_the_floor_line_and_shrink() {
    let mut scene = hall();
    scene.billboards.push(Billboard::new(
        Position::new(4.0, 6.5),
        SpriteDescriptor::with_image("items/coin.png"),
        Anchor::Floor,
    ));
    let mut projector = projector(200);
    let frame = projector.project(&scene, east_of(2.0, 6.5), 0);
    let [_, y, _, height] = frame.sprites[0].dest;
    assert_eq!(height, 40);
    assert_eq!(y, (160 - 40) / 2 + 4);

    projector.set_floor_bias(10.0);
    let raised = projector.project(&scene, east_of(2.0, 6.5), 0);
    assert_eq!(raised.sprites[0].dest[1], (160 - 40) / 2 + 10);
}

#[test]
fn sheet_frames_follow_elapsed_time() {
    let mut sheet = SpriteSheet {
        columns: 2,
        frame_ms: 100,
        ..SpriteSheet::default()
    };
    let _ = sheet.states.insert("idle".to_owned(), vec![0, 1, 3]);
    let mut scene = hall();
    scene.billboards.push(Billboard {
        position: Vec2::new(4.0, 6.5),
        sprite: SpriteDescriptor {
            sheet: Some(sheet),
            ..SpriteDescriptor::with_image("spawner.png")
        },
        anchor: Anchor::Center,
        state: "burning".to_owned(),
    });

    let projector = projector(200);
    let early = projector.project(&scene, east_of(2.0, 6.5), 0);
    let later = projector.project(&scene, east_of(2.0, 6.5), 250);
    assert_eq!(early.sprites[0].source, [0, 0, 64, 64]);
    assert_eq!(later.sprites[0].source, [64, 64, 64, 64]);
}

#[test]
fn sky_follows_the_viewer_biome_and_frames_serialise() {
    let mut scene = hall();
    scene.biome = 4;
    let frame = projector(8).project(&scene, east_of(2.0, 6.5), 0);
    assert_eq!(frame.biome, 4);
    assert_eq!(frame.sky, Rgb::new(120, 220, 150));
    assert_eq!(frame.width, 8);
    assert_eq!(frame.columns.len(), 8);

    let json = serde_json::to_string(&frame).expect("serialise");
    let back: Frame = serde_json::from_str(&json).expect("deserialise");
    assert_eq!(back, frame);
}
