use std::collections::HashMap;

use crate::effects::ids::{GroupId, UnitId};
use crate::entities::actor::ActorId;

/// Which groups each actor is currently "inside", and through which unit.
///
/// An entry exists exactly between a fired `on_place` and the matching
/// `on_left`, which is what keeps enter/leave callbacks paired.
#[derive(Debug, Default)]
pub struct Presence {
    entries: HashMap<(ActorId, GroupId), UnitId>,
    by_group: HashMap<GroupId, Vec<ActorId>>,
    by_actor: HashMap<ActorId, Vec<GroupId>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the actor was already inside the group.
    pub fn enter(&mut self, actor: ActorId, group: GroupId, unit: UnitId) -> bool {
        if self.entries.contains_key(&(actor, group)) {
            return false;
        }
        self.entries.insert((actor, group), unit);
        self.by_group.entry(group).or_default().push(actor);
        self.by_actor.entry(actor).or_default().push(group);
        true
    }

    pub fn leave(&mut self, actor: ActorId, group: GroupId) -> Option<UnitId> {
        let unit = self.entries.remove(&(actor, group))?;
        remove_from(&mut self.by_group, group, actor);
        remove_from(&mut self.by_actor, actor, group);
        Some(unit)
    }

    pub fn unit_of(&self, actor: ActorId, group: GroupId) -> Option<UnitId> {
        self.entries.get(&(actor, group)).copied()
    }

    /// In entry order.
    pub fn actors_in(&self, group: GroupId) -> Vec<ActorId> {
        self.by_group.get(&group).cloned().unwrap_or_default()
    }

    /// In entry order.
    pub fn groups_of(&self, actor: ActorId) -> Vec<GroupId> {
        self.by_actor.get(&actor).cloned().unwrap_or_default()
    }

    /// Actors whose presence in `group` runs through `unit`.
    pub fn actors_via(&self, group: GroupId, unit: UnitId) -> Vec<ActorId> {
        self.actors_in(group)
            .into_iter()
            .filter(|actor| self.unit_of(*actor, group) == Some(unit))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_group.clear();
        self.by_actor.clear();
    }
}

fn remove_from<K, V>(map: &mut HashMap<K, Vec<V>>, key: K, value: V)
where
    K: std::hash::Hash + Eq,
    V: PartialEq,
{
    if let Some(values) = map.get_mut(&key) {
        values.retain(|candidate| *candidate != value);
        if values.is_empty() {
            map.remove(&key);
        }
    }
}
