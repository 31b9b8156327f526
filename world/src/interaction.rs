//! Player actions aimed at the tile in front of the player: mining, reading
//! lore, looting containers and lifting loose items, plus inventory moves.

use mazecrawl_core::{
    CellCoord, EntityId, Event, InteractionError, LootTable, PlayerInput, SessionId, Slot,
};
use rand::Rng;
use tracing::debug;

use crate::{
    entities::{Container, ContainerSlot, WorldEntity},
    player::{movement_delta, CARDINAL_ORDER},
    walls::{StrikeError, StrikeOutcome},
    World,
};

pub(crate) fn interact(
    world: &mut World,
    session: SessionId,
    hand: Slot,
    out_events: &mut Vec<Event>,
) {
    let Some(player) = world.players.get(&session) else {
        return;
    };
    let Some((dx, dy)) = movement_delta(PlayerInput::MoveForward, player.target_angle()) else {
        return;
    };
    let Some(target) = player
        .cell()
        .offset(dx, dy, world.grid.columns(), world.grid.rows())
    else {
        reject(session, InteractionError::NothingToInteract, out_events);
        return;
    };
    let tool = player.equipment().get(hand).map(str::to_owned);
    let wall_damage = tool
        .as_deref()
        .and_then(|id| world.catalog.item(id))
        .map_or(0, |item| item.stats.wall_damage);

    let outcome = match tool {
        Some(tool) if wall_damage > 0 && world.grid.is_wall(target) => {
            mine(world, &session, hand, &tool, wall_damage, target, out_events)
        }
        _ => use_target(world, &session, target, out_events),
    };
    if let Err(reason) = outcome {
        reject(session, reason, out_events);
    }
}

fn reject(session: SessionId, reason: InteractionError, out_events: &mut Vec<Event>) {
    debug!(%session, %reason, "interaction declined");
    out_events.push(Event::InteractionRejected { session, reason });
}

fn mine(
    world: &mut World,
    session: &SessionId,
    hand: Slot,
    tool: &str,
    damage: u32,
    target: CellCoord,
    out_events: &mut Vec<Event>,
) -> Result<(), InteractionError> {
    let outcome = world
        .walls
        .strike(&mut world.grid, target, tool, damage)
        .map_err(|error| match error {
            StrikeError::Boundary(_) => InteractionError::Indestructible,
            StrikeError::ToolNotEffective { tool, .. } => InteractionError::ToolNotEffective { tool },
            StrikeError::NotAWall(_) => InteractionError::NothingToInteract,
        })?;

    let wear = match outcome {
        StrikeOutcome::Damaged {
            remaining,
            max,
            wear,
        } => {
            out_events.push(Event::WallDamaged {
                cell: target,
                remaining,
                level: 1.0 - remaining as f32 / max.max(1) as f32,
            });
            out_events.push(Event::HitSpark { cell: target });
            wear
        }
        StrikeOutcome::Broken { wear } => {
            out_events.push(Event::WallBroken { cell: target });
            wear
        }
    };

    let Some(player) = world.players.get_mut(session) else {
        return Ok(());
    };
    if player.wear_tool(hand, wear) > 0 {
        return Ok(());
    }
    let Some(broken) = player.unequip(hand) else {
        return Ok(());
    };
    let stowed = player.try_stow(&broken, &world.catalog);
    let equipment = player.equipment().clone();
    let cell = player.cell();
    if !stowed {
        let _ = drop_near(world, session, &broken, cell, out_events);
    }
    out_events.push(Event::ToolBroken {
        session: session.clone(),
        item: broken,
        stowed,
    });
    out_events.push(Event::EquipmentChanged {
        session: session.clone(),
        equipment,
    });
    Ok(())
}

fn use_target(
    world: &mut World,
    session: &SessionId,
    target: CellCoord,
    out_events: &mut Vec<Event>,
) -> Result<(), InteractionError> {
    let Some(entity) = world.entities.at(target).first().copied() else {
        return Err(InteractionError::NothingToInteract);
    };
    match world.entities.get(entity) {
        Some(WorldEntity::Container(_)) => open_container(world, session, entity, out_events),
        Some(WorldEntity::Item(item)) => {
            let item_id = item.item_id.clone();
            pick_up(world, session, entity, item_id, out_events)
        }
        Some(WorldEntity::Prop(_)) | None => Err(InteractionError::NothingToInteract),
    }
}

fn pick_up(
    world: &mut World,
    session: &SessionId,
    entity: EntityId,
    item_id: String,
    out_events: &mut Vec<Event>,
) -> Result<(), InteractionError> {
    let Some(player) = world.players.get_mut(session) else {
        return Ok(());
    };
    if !player.try_stow(&item_id, &world.catalog) {
        return Err(InteractionError::BackpackFull { item: item_id });
    }
    let _ = world.entities.remove(entity);
    out_events.push(Event::ItemPickedUp {
        session: session.clone(),
        item: item_id,
    });
    Ok(())
}

fn open_container(
    world: &mut World,
    session: &SessionId,
    entity: EntityId,
    out_events: &mut Vec<Event>,
) -> Result<(), InteractionError> {
    let World {
        entities,
        players,
        catalog,
        rng,
        lore,
        ..
    } = world;
    let Some(container) = entities.container_mut(entity) else {
        return Err(InteractionError::NothingToInteract);
    };
    roll_loot(container, rng);
    let Some(player) = players.get_mut(session) else {
        return Ok(());
    };

    let revealed = container.first_lore();
    if let Some(lore_id) = revealed {
        let _ = player.learn(lore_id);
        if let Some(entry) = lore.iter().find(|entry| entry.id == lore_id) {
            out_events.push(Event::LoreRevealed {
                session: session.clone(),
                lore: lore_id,
                title: entry.title.clone(),
                text: entry.text.clone(),
            });
        }
    }

    let mut moved_total = 0_u32;
    let mut full_on: Option<String> = None;
    for slot in &mut container.contents {
        let ContainerSlot::Stack { item_id, quantity } = slot else {
            continue;
        };
        let mut moved = 0_u32;
        while *quantity > 0 && player.try_stow(item_id, catalog) {
            *quantity -= 1;
            moved += 1;
        }
        if *quantity > 0 && full_on.is_none() {
            full_on = Some(item_id.clone());
        }
        if moved > 0 {
            moved_total += moved;
            out_events.push(Event::ItemStowed {
                session: session.clone(),
                item: item_id.clone(),
                quantity: moved,
            });
        }
    }
    container.contents.retain(|slot| {
        !matches!(slot, ContainerSlot::Stack { quantity, .. } if *quantity == 0)
    });

    let remaining = container.stacked_units();
    if moved_total > 0 {
        out_events.push(Event::ContainerLooted {
            session: session.clone(),
            entity,
            moved: moved_total,
            remaining,
        });
        return Ok(());
    }
    if revealed.is_some() {
        return Ok(());
    }
    match full_on {
        Some(item) => Err(InteractionError::BackpackFull { item }),
        None => Err(InteractionError::ContainerEmpty),
    }
}

/// Rolls the loot table once; rolled stacks are placed ahead of any lore.
fn roll_loot(container: &mut Container, rng: &mut impl Rng) {
    if container.rolled {
        return;
    }
    container.rolled = true;
    let Some(table) = container.loot.as_ref() else {
        return;
    };
    let rolled = roll_table(table, rng);
    let lore_start = container
        .contents
        .iter()
        .position(|slot| matches!(slot, ContainerSlot::Lore(_)))
        .unwrap_or(container.contents.len());
    let _ = container.contents.splice(lore_start..lore_start, rolled);
}

pub(crate) fn roll_table(table: &LootTable, rng: &mut impl Rng) -> Vec<ContainerSlot> {
    let total: u64 = table.entries.iter().map(|entry| u64::from(entry.weight)).sum();
    let mut stacks: Vec<ContainerSlot> = Vec::new();
    if total == 0 {
        return stacks;
    }
    for _ in 0..table.rolls {
        let mut pick = rng.gen_range(0..total);
        let Some(entry) = table.entries.iter().find(|entry| {
            let weight = u64::from(entry.weight);
            if pick < weight {
                true
            } else {
                pick -= weight;
                false
            }
        }) else {
            continue;
        };
        let low = entry.min.min(entry.max);
        let high = entry.min.max(entry.max);
        let quantity = rng.gen_range(low..=high);
        if quantity == 0 {
            continue;
        }
        let existing = stacks.iter_mut().find_map(|slot| match slot {
            ContainerSlot::Stack { item_id, quantity } if *item_id == entry.item_id => {
                Some(quantity)
            }
            _ => None,
        });
        match existing {
            Some(stacked) => *stacked += quantity,
            None => stacks.push(ContainerSlot::Stack {
                item_id: entry.item_id.clone(),
                quantity,
            }),
        }
    }
    stacks
}

/// Places an item on the first free cardinal neighbour, silently giving up when none is free.
fn drop_near(
    world: &mut World,
    session: &SessionId,
    item: &str,
    origin: CellCoord,
    out_events: &mut Vec<Event>,
) -> bool {
    let Some(cell) = free_neighbour(world, origin) else {
        debug!(%session, item, "no free tile for a dropped item");
        return false;
    };
    let entity = world.item_entity(item, cell.center());
    let _ = world.entities.insert(entity);
    out_events.push(Event::ItemDropped {
        session: session.clone(),
        item: item.to_owned(),
        cell,
    });
    true
}

fn free_neighbour(world: &World, origin: CellCoord) -> Option<CellCoord> {
    CARDINAL_ORDER.into_iter().find_map(|(dx, dy)| {
        let cell = origin.offset(dx, dy, world.grid.columns(), world.grid.rows())?;
        world.rejection(cell).is_none().then_some(cell)
    })
}

/// Places the starter chest next to a freshly spawned player.
pub(crate) fn place_spawn_chest(world: &mut World, origin: CellCoord) {
    let chest_item = world.config.spawns.chest_item.clone();
    if world.catalog.item(&chest_item).is_none() {
        debug!(chest_item, "spawn chest item missing from catalog");
        return;
    }
    let Some(cell) = free_neighbour(world, origin) else {
        debug!(?origin, "no room for a spawn chest");
        return;
    };
    let entity = world.item_entity(&chest_item, cell.center());
    let _ = world.entities.insert(entity);
}

pub(crate) fn equip(
    world: &mut World,
    session: SessionId,
    slot: Slot,
    item: String,
    out_events: &mut Vec<Event>,
) {
    let catalog = &world.catalog;
    let Some(player) = world.players.get_mut(&session) else {
        return;
    };
    if !player.inventory().iter().any(|carried| *carried == item) {
        reject(session, InteractionError::NotCarried(item), out_events);
        return;
    }
    if !catalog.item(&item).is_some_and(|entry| entry.can_equip(slot)) {
        reject(session, InteractionError::NotEquippable { item, slot }, out_events);
        return;
    }
    let _ = player.take_from_inventory(&item, catalog);
    let previous = player.equip(slot, &item, catalog);
    let cell = player.cell();
    let displaced = previous.filter(|old| !player.try_stow(old, catalog));
    let equipment = player.equipment().clone();
    if let Some(old) = displaced {
        let _ = drop_near(world, &session, &old, cell, out_events);
    }
    out_events.push(Event::EquipmentChanged { session, equipment });
}

pub(crate) fn unequip(world: &mut World, session: SessionId, slot: Slot, out_events: &mut Vec<Event>) {
    let catalog = &world.catalog;
    let Some(player) = world.players.get_mut(&session) else {
        return;
    };
    let Some(item) = player.equipment().get(slot).map(str::to_owned) else {
        reject(session, InteractionError::SlotEmpty(slot), out_events);
        return;
    };
    // Without the backpack there is no capacity left to stow anything.
    if slot == Slot::Backpack {
        reject(session, InteractionError::BackpackFull { item }, out_events);
        return;
    }
    if !player.try_stow(&item, catalog) {
        reject(session, InteractionError::BackpackFull { item }, out_events);
        return;
    }
    let _ = player.unequip(slot);
    out_events.push(Event::EquipmentChanged {
        session,
        equipment: player.equipment().clone(),
    });
}

pub(crate) fn drop_item(
    world: &mut World,
    session: SessionId,
    item: String,
    out_events: &mut Vec<Event>,
) {
    let Some(player) = world.players.get(&session) else {
        return;
    };
    if !player.inventory().iter().any(|carried| *carried == item) {
        reject(session, InteractionError::NotCarried(item), out_events);
        return;
    }
    let origin = player.cell();
    if free_neighbour(world, origin).is_none() {
        reject(session, InteractionError::NoFreeTile, out_events);
        return;
    }
    if let Some(player) = world.players.get_mut(&session) {
        let _ = player.take_from_inventory(&item, &world.catalog);
    }
    let _ = drop_near(world, &session, &item, origin, out_events);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ContainerKind;
    use mazecrawl_core::{LootEntry, Position};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rolled_stacks_precede_lore() {
        let mut container = Container {
            item_id: "chest_basic".into(),
            position: Position::new(1.5, 1.5),
            sprite: mazecrawl_core::SpriteDescriptor::for_item("chest_basic"),
            kind: ContainerKind::Chest,
            contents: vec![ContainerSlot::Lore(mazecrawl_core::LoreId::new(0))],
            loot: Some(LootTable {
                rolls: 3,
                entries: vec![LootEntry {
                    item_id: "coin".into(),
                    weight: 1,
                    min: 1,
                    max: 2,
                }],
            }),
            rolled: false,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        roll_loot(&mut container, &mut rng);
        assert!(matches!(container.contents[0], ContainerSlot::Stack { .. }));
        assert!(matches!(
            container.contents.last(),
            Some(ContainerSlot::Lore(_))
        ));
        let units = container.stacked_units();
        assert!((3..=6).contains(&units));

        roll_loot(&mut container, &mut rng);
        assert_eq!(container.stacked_units(), units);
    }

    #[test]
    fn zero_weight_tables_roll_nothing() {
        let table = LootTable {
            rolls: 4,
            entries: vec![LootEntry {
                item_id: "coin".into(),
                weight: 0,
                min: 1,
                max: 1,
            }],
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(roll_table(&table, &mut rng).is_empty());
    }
}
