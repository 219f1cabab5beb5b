use std::collections::HashMap;

use crate::effects::ids::EffectKind;
use crate::entities::actor::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedPlacement {
    pub kind: EffectKind,
    pub level: u16,
}

/// Effects to re-create for an actor once it arrives on its new map.
/// Each record is consumed by the first arrival.
#[derive(Debug, Default)]
pub struct TransferQueue {
    saved: HashMap<ActorId, Vec<SavedPlacement>>,
}

impl TransferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, actor: ActorId, placement: SavedPlacement) {
        let saved = self.saved.entry(actor).or_default();
        if !saved.iter().any(|entry| entry.kind == placement.kind) {
            saved.push(placement);
        }
    }

    pub fn take(&mut self, actor: ActorId) -> Vec<SavedPlacement> {
        self.saved.remove(&actor).unwrap_or_default()
    }

    pub fn pending(&self, actor: ActorId) -> usize {
        self.saved.get(&actor).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.saved.clear();
    }
}
