use std::fmt;

use serde::{Deserialize, Serialize};

/// Effect kind id; the key into the kind table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectKind(pub u16);

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{:#06x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Wrapping id counter over `[first, first + capacity)`. Allocation probes
/// forward from the last issued id and gives up after one full lap, so a
/// saturated space is reported instead of spinning.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    first: u32,
    capacity: u32,
    next: u32,
}

impl IdAllocator {
    pub fn new(first: u32, capacity: u32) -> Self {
        let first = first.max(1);
        let room = u32::MAX - first;
        let capacity = capacity.clamp(1, room.max(1));
        Self {
            first,
            capacity,
            next: first,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn allocate(&mut self, mut in_use: impl FnMut(u32) -> bool) -> Option<u32> {
        let end = u64::from(self.first) + u64::from(self.capacity);
        for _ in 0..self.capacity {
            let candidate = self.next;
            self.next = if u64::from(candidate) + 1 >= end {
                self.first
            } else {
                candidate + 1
            };
            if !in_use(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}
