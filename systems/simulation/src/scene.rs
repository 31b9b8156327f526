use mazecrawl_core::{CellCoord, SpriteDescriptor};
use mazecrawl_rendering::{Anchor, Billboard, Scene};
use mazecrawl_world::{query, World};

/// Projector view of the authoritative world.
///
/// Billboards are collected once on construction so every player projected
/// during the same tick sees the same set.
#[derive(Debug)]
pub struct WorldScene<'a> {
    world: &'a World,
    billboards: Vec<Billboard>,
}

impl<'a> WorldScene<'a> {
    /// Captures the world's items, enemies and players.
    #[must_use]
    pub fn new(world: &'a World) -> Self {
        let mut billboards = Vec::new();

        for (_, entity) in query::entities(world).iter() {
            let anchor = if entity.is_floor_anchored() {
                Anchor::Floor
            } else {
                Anchor::Center
            };
            billboards.push(Billboard::new(
                entity.position(),
                entity.sprite().clone(),
                anchor,
            ));
        }

        for enemy in query::enemies(world).iter() {
            billboards.push(Billboard::new(
                enemy.cell().center(),
                enemy.sprite().clone(),
                Anchor::Center,
            ));
        }

        let player_sprite = SpriteDescriptor::with_image(query::config(world).player.sprite.clone());
        for player in query::players(world).iter() {
            billboards.push(Billboard::new(
                player.position(),
                player_sprite.clone(),
                Anchor::Center,
            ));
        }

        Self { world, billboards }
    }
}

impl Scene for WorldScene<'_> {
    fn dimensions(&self) -> (u32, u32) {
        let grid = query::grid(self.world);
        (grid.columns(), grid.rows())
    }

    fn is_wall(&self, cell: CellCoord) -> bool {
        query::grid(self.world).is_wall(cell)
    }

    fn wall_integrity(&self, cell: CellCoord) -> f32 {
        query::walls(self.world).integrity(cell)
    }

    fn biome_at(&self, cell: CellCoord) -> u32 {
        query::biomes(self.world).biome_at(cell)
    }

    fn billboards(&self, out: &mut Vec<Billboard>) {
        out.extend(self.billboards.iter().cloned());
    }
}
