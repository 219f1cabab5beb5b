use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::world::position::Cell;

/// Terrain-like marks an effect can put on the cells it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFlag {
    /// Walls: nothing walks through, no further ground effects placed here.
    Impassable,
    BlocksSight,
    /// Protects occupants from scripted area damage.
    Warded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellFlags {
    pub impassable: bool,
    pub blocks_sight: bool,
    pub warded: bool,
}

impl CellFlags {
    pub fn is_empty(self) -> bool {
        !self.impassable && !self.blocks_sight && !self.warded
    }
}

/// Reference-counted cell flags. Several units may mark the same cell; the
/// flag is only cleared once the last of them lets go, which is what restores
/// the cell to its pre-placement state.
#[derive(Debug, Default)]
pub struct CellReservations {
    counts: HashMap<(Cell, CellFlag), u32>,
}

impl CellReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the flag went from clear to set.
    pub fn reserve(&mut self, cell: Cell, flag: CellFlag) -> bool {
        let count = self.counts.entry((cell, flag)).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns true when the flag went from set to clear.
    pub fn release(&mut self, cell: Cell, flag: CellFlag) -> bool {
        let Some(count) = self.counts.get_mut(&(cell, flag)) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(&(cell, flag));
            return true;
        }
        false
    }

    pub fn is_set(&self, cell: Cell, flag: CellFlag) -> bool {
        self.counts.contains_key(&(cell, flag))
    }

    pub fn flags(&self, cell: Cell) -> CellFlags {
        CellFlags {
            impassable: self.is_set(cell, CellFlag::Impassable),
            blocks_sight: self.is_set(cell, CellFlag::BlocksSight),
            warded: self.is_set(cell, CellFlag::Warded),
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
