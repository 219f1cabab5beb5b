use crate::effects::ids::{GroupId, UnitId};
use crate::world::position::Cell;

/// One occupied cell of an effect group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectUnit {
    pub id: UnitId,
    pub group: GroupId,
    pub cell: Cell,
    pub val1: i32,
    pub val2: i32,
    /// Ticks after the group's creation tick.
    pub limit: u64,
    /// 0 = own cell, >0 = square radius, <0 = disabled.
    pub range: i16,
    pub alive: bool,
    pub hidden: bool,
    /// Overlapping a matching performance of another group.
    pub dissonant: bool,
}

impl EffectUnit {
    pub fn is_disabled(&self) -> bool {
        self.range < 0
    }

    pub fn scan_radius(&self) -> Option<u16> {
        u16::try_from(self.range).ok()
    }
}
