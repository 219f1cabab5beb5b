use std::collections::HashMap;

use crate::effects::ids::UnitId;
use crate::world::position::Cell;

/// Cell -> live units standing on it, in placement order.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cells: HashMap<Cell, Vec<UnitId>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cell: Cell, unit: UnitId) {
        let units = self.cells.entry(cell).or_default();
        if !units.contains(&unit) {
            units.push(unit);
        }
    }

    pub fn remove(&mut self, cell: Cell, unit: UnitId) -> bool {
        let Some(units) = self.cells.get_mut(&cell) else {
            return false;
        };
        let Some(index) = units.iter().position(|candidate| *candidate == unit) else {
            return false;
        };
        units.remove(index);
        if units.is_empty() {
            self.cells.remove(&cell);
        }
        true
    }

    /// Snapshot of the units on a cell; callers may mutate the index while
    /// walking it.
    pub fn units_at(&self, cell: Cell) -> Vec<UnitId> {
        self.cells.get(&cell).cloned().unwrap_or_default()
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
