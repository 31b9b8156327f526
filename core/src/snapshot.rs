//! Per-player state that crosses the core boundary: equipment, fog masks and
//! the snapshot persisted when a session departs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CellCoord, LoreId, Slot};

const WORD_BITS: usize = 64;

/// Persistent per-player record of tiles that have been seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogMask {
    columns: u32,
    rows: u32,
    words: Vec<u64>,
}

impl FogMask {
    /// Creates a mask where nothing has been seen.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            words: vec![0; word_count(columns, rows)],
        }
    }

    /// Creates a mask where everything has been seen.
    #[must_use]
    pub fn filled(columns: u32, rows: u32) -> Self {
        let mut mask = Self::new(columns, rows);
        for row in 0..rows {
            for column in 0..columns {
                mask.mark(CellCoord::new(column, row));
            }
        }
        mask
    }

    /// Grid dimensions the mask was created for.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Whether the backing storage matches the recorded dimensions.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.words.len() == word_count(self.columns, self.rows)
    }

    /// Whether the cell has been seen. Cells outside the mask never are.
    #[must_use]
    pub fn is_seen(&self, cell: CellCoord) -> bool {
        self.bit(cell).map_or(false, |(word, bit)| {
            self.words
                .get(word)
                .map_or(false, |value| value & (1_u64 << bit) != 0)
        })
    }

    /// Marks the cell as seen; cells outside the mask are ignored.
    pub fn mark(&mut self, cell: CellCoord) {
        if let Some((word, bit)) = self.bit(cell) {
            if let Some(value) = self.words.get_mut(word) {
                *value |= 1_u64 << bit;
            }
        }
    }

    /// Adds every cell seen in `other`. Masks of different dimensions are ignored.
    pub fn union_with(&mut self, other: &FogMask) {
        if self.dimensions() != other.dimensions() {
            return;
        }
        for (word, other_word) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= *other_word;
        }
    }

    /// Number of seen cells.
    #[must_use]
    pub fn seen_count(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    fn bit(&self, cell: CellCoord) -> Option<(usize, u32)> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let index =
            usize::try_from(cell.row()).ok()? * width + usize::try_from(cell.column()).ok()?;
        Some((index / WORD_BITS, u32::try_from(index % WORD_BITS).ok()?))
    }
}

fn word_count(columns: u32, rows: u32) -> usize {
    let cells = u64::from(columns) * u64::from(rows);
    usize::try_from(cells.div_ceil(WORD_BITS as u64)).unwrap_or(0)
}

/// Mapping of equipment slots to item type identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Equipment {
    slots: BTreeMap<Slot, String>,
}

impl Equipment {
    /// Item held in the slot.
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Places an item in the slot, returning the previous occupant.
    pub fn insert(&mut self, slot: Slot, item: impl Into<String>) -> Option<String> {
        self.slots.insert(slot, item.into())
    }

    /// Empties the slot, returning its occupant.
    pub fn remove(&mut self, slot: Slot) -> Option<String> {
        self.slots.remove(&slot)
    }

    /// Filled slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.slots.iter().map(|(slot, item)| (*slot, item.as_str()))
    }

    /// Whether no slot is filled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// State persisted when a session departs and offered back when it rejoins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Cell the player occupied.
    pub cell: CellCoord,
    /// Settled facing in radians.
    pub angle: f32,
    /// Tiles the player has seen.
    pub seen: FogMask,
    /// Allocated character stats.
    #[serde(default)]
    pub stats: BTreeMap<String, i32>,
    /// Equipped items.
    #[serde(default)]
    pub equipment: Equipment,
    /// Items in the backpack.
    #[serde(default)]
    pub inventory: Vec<String>,
    /// Weight currently counted against the backpack.
    #[serde(default)]
    pub backpack_weight_used: f32,
    /// Chosen character or cosmetic reference.
    #[serde(default)]
    pub character: Option<String>,
    /// Lore entries the player has read.
    #[serde(default)]
    pub known_lore: Vec<LoreId>,
    /// Remaining durability of the tools held in each hand.
    #[serde(default)]
    pub tool_durability: BTreeMap<Slot, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_marks_and_reads_cells() {
        let mut mask = FogMask::new(70, 3);
        let far = CellCoord::new(69, 2);
        assert!(!mask.is_seen(far));
        mask.mark(far);
        mask.mark(CellCoord::new(70, 0));
        assert!(mask.is_seen(far));
        assert_eq!(mask.seen_count(), 1);
        assert!(mask.is_well_formed());
    }

    #[test]
    fn union_accumulates_matching_masks_only() {
        let mut first = FogMask::new(8, 8);
        let mut second = FogMask::new(8, 8);
        first.mark(CellCoord::new(1, 1));
        second.mark(CellCoord::new(2, 2));
        first.union_with(&second);
        assert_eq!(first.seen_count(), 2);

        let mut other = FogMask::new(4, 4);
        other.mark(CellCoord::new(3, 3));
        first.union_with(&other);
        assert_eq!(first.seen_count(), 2);
    }

    #[test]
    fn filled_mask_sees_everything() {
        let mask = FogMask::filled(5, 4);
        assert_eq!(mask.seen_count(), 20);
    }

    #[test]
    fn snapshot_round_trips_through_bincode() {
        let mut equipment = Equipment::default();
        let _ = equipment.insert(Slot::RightHand, "pickaxe_basic");
        let mut seen = FogMask::new(16, 16);
        seen.mark(CellCoord::new(4, 5));
        let snapshot = PlayerSnapshot {
            cell: CellCoord::new(4, 5),
            angle: 1.25,
            seen,
            stats: BTreeMap::from([("strength".to_owned(), 3)]),
            equipment,
            inventory: vec!["gem".to_owned()],
            backpack_weight_used: 0.5,
            character: Some("knight".to_owned()),
            known_lore: vec![LoreId::new(2)],
            tool_durability: BTreeMap::from([(Slot::RightHand, 7)]),
        };

        let bytes = bincode::serialize(&snapshot).expect("serialize");
        let restored: PlayerSnapshot = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn equipment_serialises_as_slot_map() {
        let mut equipment = Equipment::default();
        let _ = equipment.insert(Slot::LeftHand, "torch");
        let json = serde_json::to_string(&equipment).expect("serialize");
        assert_eq!(json, r#"{"left_hand":"torch"}"#);
    }
}
