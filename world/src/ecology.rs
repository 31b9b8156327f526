//! Boss ecology: unique bosses with item affinities, regular enemies carrying
//! the special items, and elemental pillars holding the lore that ties them
//! together.

use std::collections::VecDeque;

use mazecrawl_core::{Element, ElementShares, EnemyType, LoreId, Position, SpriteDescriptor};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::{
    enemies::Affinity,
    entities::{Container, ContainerKind, ContainerSlot, WorldEntity},
    World,
};

/// Aspect of a boss described by a lore scroll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoreTopic {
    /// What the boss desires.
    Seeks,
    /// What the boss avoids.
    Fears,
    /// What harms the boss.
    Vulnerable,
    /// Where the boss came from.
    Backstory,
}

impl LoreTopic {
    const ALL: [LoreTopic; 4] = [
        LoreTopic::Seeks,
        LoreTopic::Fears,
        LoreTopic::Vulnerable,
        LoreTopic::Backstory,
    ];
}

/// Readable scroll generated for a boss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoreEntry {
    /// Identifier referenced by pillars and player knowledge.
    pub id: LoreId,
    /// Item type representing the scroll.
    pub item_id: String,
    /// Enemy type the scroll describes.
    pub boss: String,
    /// Aspect described.
    pub topic: LoreTopic,
    /// Element used to route the scroll into a pillar.
    pub element: Element,
    /// Heading shown above the text.
    pub title: String,
    /// Body of the scroll.
    pub text: String,
}

pub(crate) fn populate(world: &mut World) {
    let bosses: Vec<EnemyType> = world
        .catalog
        .enemies()
        .filter(|enemy| enemy.tier.is_boss())
        .cloned()
        .collect();
    let regulars: Vec<EnemyType> = world
        .catalog
        .enemies()
        .filter(|enemy| !enemy.tier.is_boss())
        .cloned()
        .collect();
    let mut specials: Vec<String> = world
        .catalog
        .items()
        .filter(|item| item.special)
        .map(|item| item.id.clone())
        .collect();

    for (index, boss) in bosses.iter().enumerate() {
        spawn_boss(world, boss, index, &specials);
    }

    specials.shuffle(&mut world.rng);
    let carriers = usize::try_from(world.config.ecology.carriers)
        .unwrap_or(usize::MAX)
        .min(specials.len());
    if carriers > 0 && regulars.is_empty() {
        debug!("no regular enemy types available to carry special items");
    } else {
        for item in specials.into_iter().take(carriers) {
            let Some(template) = regulars.choose(&mut world.rng).cloned() else {
                break;
            };
            let Some(cell) = world.random_free_cell() else {
                warn!(item, "no free tile left for a carrier");
                break;
            };
            let id = world
                .enemies
                .spawn(&template, cell, world.clock, &world.config.enemies, &mut world.rng);
            if let Some(enemy) = world.enemies.get_mut(id) {
                enemy.give(item);
            }
        }
    }

    distribute_pillars(world);
    info!(
        bosses = bosses.len(),
        carriers,
        lore = world.lore.len(),
        "boss ecology placed"
    );
}

fn spawn_boss(world: &mut World, boss: &EnemyType, index: usize, specials: &[String]) {
    let affinity = (specials.len() >= 3).then(|| {
        let picked: Vec<&String> = specials.choose_multiple(&mut world.rng, 3).collect();
        Affinity {
            seeks: picked[0].clone(),
            fears: picked[1].clone(),
            vulnerable: picked[2].clone(),
        }
    });
    let Some(cell) = world.random_free_cell() else {
        warn!(boss = %boss.id, "no free tile left for a boss");
        return;
    };
    let id = world
        .enemies
        .spawn(boss, cell, world.clock, &world.config.enemies, &mut world.rng);
    if let (Some(enemy), Some(affinity)) = (world.enemies.get_mut(id), affinity.clone()) {
        enemy.set_affinity(affinity);
    }

    let element = boss
        .element
        .unwrap_or(Element::ALL[index % Element::ALL.len()]);
    for topic in LoreTopic::ALL {
        let (title, text) = describe(world, boss, topic, affinity.as_ref());
        let id = LoreId::new(u32::try_from(world.lore.len()).unwrap_or(u32::MAX));
        world.lore.push(LoreEntry {
            id,
            item_id: world.config.ecology.scroll_item.clone(),
            boss: boss.id.clone(),
            topic,
            element,
            title,
            text,
        });
    }
}

fn describe(
    world: &World,
    boss: &EnemyType,
    topic: LoreTopic,
    affinity: Option<&Affinity>,
) -> (String, String) {
    let name = &boss.name;
    let item_name = |id: &str| {
        world
            .catalog
            .item(id)
            .map_or_else(|| id.to_owned(), |item| item.name.clone())
    };
    match topic {
        LoreTopic::Seeks => (
            format!("{name}: Desire"),
            affinity.map_or_else(
                || format!("What {name} seeks is unknown."),
                |affinity| format!("{name} seeks the {}.", item_name(&affinity.seeks)),
            ),
        ),
        LoreTopic::Fears => (
            format!("{name}: Dread"),
            affinity.map_or_else(
                || format!("What {name} fears is unknown."),
                |affinity| format!("{name} fears the {}.", item_name(&affinity.fears)),
            ),
        ),
        LoreTopic::Vulnerable => (
            format!("{name}: Weakness"),
            affinity.map_or_else(
                || format!("What can harm {name} is unknown."),
                |affinity| {
                    format!("{name} is vulnerable to the {}.", item_name(&affinity.vulnerable))
                },
            ),
        ),
        LoreTopic::Backstory => (
            format!("{name}: Origins"),
            boss
                .backstory
                .clone()
                .unwrap_or_else(|| format!("Little is known about {name}.")),
        ),
    }
}

/// Splits `total` across the elements by largest remainder.
pub(crate) fn pillar_counts(total: usize, shares: &ElementShares) -> [usize; 3] {
    let mut weights: Vec<f64> = Element::ALL
        .iter()
        .map(|element| f64::from(shares.share(*element).max(0.0)))
        .collect();
    let mut sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        weights = vec![1.0; weights.len()];
        sum = 3.0;
    }

    let mut counts = [0_usize; 3];
    let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(3);
    for (index, weight) in weights.iter().enumerate() {
        let quota = total as f64 * weight / sum;
        counts[index] = quota.floor() as usize;
        remainders.push((index, quota - quota.floor()));
    }
    remainders.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));
    let assigned: usize = counts.iter().sum();
    for (index, _) in remainders.into_iter().take(total.saturating_sub(assigned)) {
        counts[index] += 1;
    }
    counts
}

fn distribute_pillars(world: &mut World) {
    if world.lore.is_empty() {
        return;
    }
    let counts = pillar_counts(world.lore.len(), &world.config.ecology.shares);
    let mut pools: [VecDeque<LoreId>; 3] = Default::default();
    for entry in &world.lore {
        let slot = element_index(entry.element);
        pools[slot].push_back(entry.id);
    }

    let pillar_item = world.config.ecology.pillar_item.clone();
    let sprite = world
        .catalog
        .item(&pillar_item)
        .map(|item| item.sprite())
        .unwrap_or_else(|| SpriteDescriptor::for_item(&pillar_item));

    for (slot, element) in Element::ALL.into_iter().enumerate() {
        for _ in 0..counts[slot] {
            let lore = pools[slot].pop_front().or_else(|| {
                let donor = (0..pools.len()).max_by(|left, right| {
                    pools[*left]
                        .len()
                        .cmp(&pools[*right].len())
                        .then(right.cmp(left))
                })?;
                pools[donor].pop_front()
            });
            let Some(lore) = lore else {
                break;
            };
            let Some(cell) = world.random_free_cell() else {
                warn!("no free tile left for a lore pillar");
                return;
            };
            let center: Position = cell.center();
            let _ = world.entities.insert(WorldEntity::Container(Container {
                item_id: pillar_item.clone(),
                position: center,
                sprite: sprite.clone(),
                kind: ContainerKind::Pillar { element },
                contents: vec![ContainerSlot::Lore(lore)],
                loot: None,
                rolled: true,
            }));
        }
    }
}

fn element_index(element: Element) -> usize {
    Element::ALL
        .iter()
        .position(|candidate| *candidate == element)
        .unwrap_or(0)
}
