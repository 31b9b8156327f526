use std::collections::BTreeMap;

use mazecrawl_core::{
    CellCoord, Element, EnemyConfig, EnemyId, EnemyStats, EnemyTier, EnemyType, Event, Heading,
    SessionId, SpriteDescriptor,
};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use crate::{occupancy::OccupancyGrid, seeding::WorldRng, World};

/// Item types a boss reacts to, revealed through lore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Affinity {
    /// Item the boss desires.
    pub seeks: String,
    /// Item the boss avoids.
    pub fears: String,
    /// Item the boss is vulnerable to.
    pub vulnerable: String,
}

/// Live enemy instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    id: EnemyId,
    type_id: String,
    cell: CellCoord,
    hp: i32,
    stats: EnemyStats,
    tier: EnemyTier,
    element: Option<Element>,
    ai: Option<String>,
    heading: Heading,
    next_move_at: f64,
    carried: Vec<String>,
    affinity: Option<Affinity>,
    sprite: SpriteDescriptor,
}

impl Enemy {
    /// Identifier of the instance.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Enemy type the instance was cloned from.
    #[must_use]
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Cell the enemy occupies.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn hp(&self) -> i32 {
        self.hp
    }

    /// Per-instance copy of the type statistics.
    #[must_use]
    pub const fn stats(&self) -> &EnemyStats {
        &self.stats
    }

    /// Tier of the enemy.
    #[must_use]
    pub const fn tier(&self) -> EnemyTier {
        self.tier
    }

    /// Elemental affinity.
    #[must_use]
    pub const fn element(&self) -> Option<Element> {
        self.element
    }

    /// Behaviour descriptor.
    #[must_use]
    pub fn ai(&self) -> Option<&str> {
        self.ai.as_deref()
    }

    /// Direction of the last step.
    #[must_use]
    pub const fn heading(&self) -> Heading {
        self.heading
    }

    /// World clock at which the enemy may move again.
    #[must_use]
    pub const fn next_move_at(&self) -> f64 {
        self.next_move_at
    }

    /// Item types the enemy carries.
    #[must_use]
    pub fn carried(&self) -> &[String] {
        &self.carried
    }

    /// Boss affinity triple.
    #[must_use]
    pub const fn affinity(&self) -> Option<&Affinity> {
        self.affinity.as_ref()
    }

    /// Billboard description.
    #[must_use]
    pub const fn sprite(&self) -> &SpriteDescriptor {
        &self.sprite
    }
}

/// Enemy instances plus their occupancy index.
#[derive(Clone, Debug)]
pub struct EnemyRoster {
    next_id: u32,
    enemies: BTreeMap<EnemyId, Enemy>,
    occupancy: OccupancyGrid<EnemyId>,
}

impl EnemyRoster {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        Self {
            next_id: 0,
            enemies: BTreeMap::new(),
            occupancy: OccupancyGrid::new(columns, rows),
        }
    }

    /// Looks up an enemy.
    #[must_use]
    pub fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    /// Enemies in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    /// Number of enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    /// Whether no enemy exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    /// Enemy standing on the cell.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<EnemyId> {
        self.occupancy.occupant(cell).copied()
    }

    pub(crate) fn is_free(&self, cell: CellCoord) -> bool {
        self.occupancy.is_free(cell)
    }

    /// Clones a type template into a new instance with a staggered first move.
    pub(crate) fn spawn(
        &mut self,
        template: &EnemyType,
        cell: CellCoord,
        clock: f64,
        config: &EnemyConfig,
        rng: &mut WorldRng,
    ) -> EnemyId {
        let id = EnemyId::new(self.next_id);
        self.next_id += 1;
        let interval = config.movement_interval(template.speed());
        let delay = if interval > 0.0 {
            rng.gen_range(0.0..interval)
        } else {
            0.0
        };
        let heading = *Heading::ALL.choose(rng).unwrap_or(&Heading::North);
        let enemy = Enemy {
            id,
            type_id: template.id.clone(),
            cell,
            hp: template.stats.health,
            stats: template.stats.clone(),
            tier: template.tier,
            element: template.element,
            ai: template.ai.clone(),
            heading,
            next_move_at: clock + delay,
            carried: Vec::new(),
            affinity: None,
            sprite: template.sprite(),
        };
        let _ = self.enemies.insert(id, enemy);
        self.occupancy.occupy(id, cell);
        id
    }

    pub(crate) fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.get_mut(&id)
    }

    /// Moves an enemy and its occupancy entry together.
    pub(crate) fn relocate(&mut self, id: EnemyId, to: CellCoord, heading: Heading) -> Option<CellCoord> {
        let enemy = self.enemies.get_mut(&id)?;
        let from = enemy.cell;
        enemy.cell = to;
        enemy.heading = heading;
        self.occupancy.relocate(id, from, to);
        Some(from)
    }

    pub(crate) fn index_is_consistent(&self) -> bool {
        let expected: Vec<(CellCoord, EnemyId)> = {
            let mut entries: Vec<_> = self.enemies.values().map(|enemy| (enemy.cell, enemy.id)).collect();
            entries.sort();
            entries
        };
        let mut actual = self.occupancy.entries();
        actual.sort();
        expected == actual
    }
}

impl Enemy {
    pub(crate) fn give(&mut self, item: String) {
        self.carried.push(item);
    }

    pub(crate) fn set_affinity(&mut self, affinity: Affinity) {
        self.affinity = Some(affinity);
    }

    pub(crate) fn reschedule(&mut self, at: f64) {
        self.next_move_at = at;
    }
}

/// Reschedules the enemy timer and, when a heading is given, attempts the step.
pub(crate) fn step(
    world: &mut World,
    id: EnemyId,
    heading: Option<Heading>,
    out_events: &mut Vec<Event>,
) {
    let Some(enemy) = world.enemies.get_mut(id) else {
        debug!(?id, "step for unknown enemy");
        return;
    };
    let speed = enemy.stats.speed.min(256);
    enemy.reschedule(world.clock + world.config.enemies.movement_interval(speed));
    let from = enemy.cell;
    if !world.config.enemies.move_enabled || speed == 0 {
        return;
    }
    let Some(heading) = heading else {
        return;
    };
    let (dx, dy) = heading.delta();
    let Some(to) = from.offset(dx, dy, world.grid.columns(), world.grid.rows()) else {
        return;
    };
    if let Some(reason) = world.rejection(to) {
        debug!(?id, ?to, %reason, "enemy step blocked");
        return;
    }
    if world.enemies.relocate(id, to, heading).is_some() {
        out_events.push(Event::EnemyMoved { enemy: id, from, to });
    }
}

/// Surfaces an attack intent when both parties still exist.
pub(crate) fn attack(world: &World, id: EnemyId, target: SessionId, out_events: &mut Vec<Event>) {
    if world.enemies.get(id).is_none() || world.players.get(&target).is_none() {
        debug!(?id, %target, "attack intent dropped");
        return;
    }
    out_events.push(Event::EnemyAttackIntended { enemy: id, target });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::rng_from_seed;

    fn slime() -> EnemyType {
        EnemyType {
            id: "slime".into(),
            name: "Slime".into(),
            stats: EnemyStats {
                health: 4,
                speed: 128,
                ..EnemyStats::default()
            },
            tier: EnemyTier::Regular,
            element: Some(Element::Water),
            ai: Some("slime".into()),
            image: None,
            ping_color: None,
            backstory: None,
            sprite: None,
        }
    }

    #[test]
    fn spawn_clones_the_template_and_staggers_the_timer() {
        let mut roster = EnemyRoster::new(8, 8);
        let mut rng = rng_from_seed(3);
        let config = EnemyConfig::default();
        let template = slime();
        let id = roster.spawn(&template, CellCoord::new(2, 2), 10.0, &config, &mut rng);
        let enemy = roster.get(id).expect("spawned");
        assert_eq!(enemy.hp(), 4);
        assert_eq!(enemy.type_id(), "slime");
        let interval = config.movement_interval(128);
        assert!(enemy.next_move_at() >= 10.0 && enemy.next_move_at() < 10.0 + interval);
        assert_eq!(roster.occupant(CellCoord::new(2, 2)), Some(id));
    }

    #[test]
    fn relocate_keeps_the_index_in_step() {
        let mut roster = EnemyRoster::new(8, 8);
        let mut rng = rng_from_seed(9);
        let id = roster.spawn(&slime(), CellCoord::new(2, 2), 0.0, &EnemyConfig::default(), &mut rng);
        assert_eq!(
            roster.relocate(id, CellCoord::new(3, 3), Heading::SouthEast),
            Some(CellCoord::new(2, 2))
        );
        assert!(roster.is_free(CellCoord::new(2, 2)));
        assert_eq!(roster.get(id).map(Enemy::heading), Some(Heading::SouthEast));
        assert!(roster.index_is_consistent());
    }
}
