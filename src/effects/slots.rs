use std::collections::HashMap;

use crate::effects::ids::GroupId;
use crate::entities::actor::ActorId;

/// Per-caster table of owned groups, oldest first, capped at `capacity`.
#[derive(Debug)]
pub struct CasterSlots {
    capacity: usize,
    tables: HashMap<ActorId, Vec<GroupId>>,
}

impl CasterSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tables: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The group to evict before `actor` may own another one.
    pub fn eviction_candidate(&self, actor: ActorId) -> Option<GroupId> {
        let table = self.tables.get(&actor)?;
        if table.len() < self.capacity {
            return None;
        }
        table.first().copied()
    }

    pub fn push(&mut self, actor: ActorId, group: GroupId) {
        self.tables.entry(actor).or_default().push(group);
    }

    /// Removes and shifts the rest down. Returns false if not present.
    pub fn remove(&mut self, actor: ActorId, group: GroupId) -> bool {
        let Some(table) = self.tables.get_mut(&actor) else {
            return false;
        };
        let Some(index) = table.iter().position(|candidate| *candidate == group) else {
            return false;
        };
        table.remove(index);
        if table.is_empty() {
            self.tables.remove(&actor);
        }
        true
    }

    pub fn groups_of(&self, actor: ActorId) -> Vec<GroupId> {
        self.tables.get(&actor).cloned().unwrap_or_default()
    }

    pub fn count(&self, actor: ActorId) -> usize {
        self.tables.get(&actor).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
