use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::effects::ids::{EffectKind, GroupId};
use crate::entities::actor::ActorId;
use crate::world::time::GameTick;

/// What a tick bucket entry rate-limits: one group, or every group of a kind
/// for kinds whose hits must not stack across casters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicksetKey {
    Group(GroupId),
    Kind(EffectKind),
}

/// Per-actor "next hit allowed at" tables. Each bucket is a bounded LRU, so
/// an actor under many effects at once forgets the least recently hit entry
/// first.
#[derive(Debug)]
pub struct TickBuckets {
    capacity: NonZeroUsize,
    buckets: HashMap<ActorId, LruCache<TicksetKey, GameTick>>,
}

impl TickBuckets {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity,
            buckets: HashMap::new(),
        }
    }

    /// True when the actor is due for this key; records the next due tick.
    pub fn try_hit(&mut self, actor: ActorId, key: TicksetKey, now: GameTick, interval: u64) -> bool {
        let capacity = self.capacity;
        let bucket = self
            .buckets
            .entry(actor)
            .or_insert_with(|| LruCache::new(capacity));
        if let Some(next) = bucket.get(&key) {
            if *next > now {
                return false;
            }
        }
        bucket.put(key, now.after(interval.max(1)));
        true
    }

    pub fn forget_actor(&mut self, actor: ActorId) {
        self.buckets.remove(&actor);
    }

    pub fn forget_group(&mut self, group: GroupId) {
        for bucket in self.buckets.values_mut() {
            bucket.pop(&TicksetKey::Group(group));
        }
    }

    pub fn bucket_len(&self, actor: ActorId) -> usize {
        self.buckets.get(&actor).map_or(0, LruCache::len)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
