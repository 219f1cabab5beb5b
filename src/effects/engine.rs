//! The ground-effect registry and the context every lifecycle operation runs
//! against.
//!
//! `Engine` owns every group and unit, the cell index, cell reservations,
//! id allocators, per-caster slot tables and per-actor tick buckets. The
//! operations themselves live next door: placement in `placement.rs`, the
//! periodic pass in `scheduler.rs`, movement and actor lifecycle in
//! `movement.rs`, teardown in `teardown.rs`.
//!
//! Groups are never freed while a pass is running. Every public operation
//! opens a pass; teardowns inside it only mark the group removed and queue
//! it, and the queue is drained when the outermost pass closes. Iteration is
//! always over a snapshot of ids, and every id is re-checked before use.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::combat::rules::{self, CombatRules};
use crate::config::EngineConfig;
use crate::effects::behavior::{EffectBehavior, GroupView, HookCtx, HookRequest, UnitView};
use crate::effects::group::{EffectGroup, GroupState, TeardownReason};
use crate::effects::ids::{EffectKind, GroupId, IdAllocator, UnitId};
use crate::effects::kinds::{KindDef, KindTable, Performance};
use crate::effects::overlap::OverlapPolicy;
use crate::effects::presence::Presence;
use crate::effects::slots::CasterSlots;
use crate::effects::tickset::TickBuckets;
use crate::effects::transfer::TransferQueue;
use crate::effects::unit::EffectUnit;
use crate::entities::actor::{ActorId, ActorInfo, ActorKind};
use crate::error::{ConfigError, EffectError};
use crate::host::{Audience, Host};
use crate::world::cells::{CellFlags, CellReservations};
use crate::world::position::Cell;
use crate::world::spatial::SpatialIndex;
use crate::world::time::GameTick;

const UNIT_ID_CAPACITY: u32 = u32::MAX - 1;

#[derive(Debug, Clone, Copy)]
pub(crate) struct UnitSlot {
    pub(crate) group: GroupId,
    pub(crate) index: usize,
}

/// Kinds substituted for songs and dances while they overlap.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Dissonance {
    pub(crate) song: Option<EffectKind>,
    pub(crate) dance: Option<EffectKind>,
}

impl Dissonance {
    fn variant(&self, performance: Performance) -> Option<EffectKind> {
        match performance {
            Performance::Song => self.song,
            Performance::Dance => self.dance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDamage {
    pub remaining: i32,
    pub destroyed: bool,
}

pub struct Engine<H: Host> {
    pub(crate) rules: CombatRules,
    pub(crate) kinds: KindTable,
    pub(crate) overlap: OverlapPolicy,
    pub(crate) dissonance: Dissonance,
    pub(crate) host: H,
    pub(crate) groups: HashMap<GroupId, EffectGroup>,
    /// Insertion order; the scheduler visits groups in this order.
    pub(crate) order: Vec<GroupId>,
    pub(crate) units: HashMap<UnitId, UnitSlot>,
    pub(crate) spatial: SpatialIndex,
    pub(crate) cells: CellReservations,
    pub(crate) group_ids: IdAllocator,
    pub(crate) unit_ids: IdAllocator,
    pub(crate) slots: CasterSlots,
    pub(crate) ticksets: TickBuckets,
    pub(crate) presence: Presence,
    pub(crate) transfers: TransferQueue,
    pub(crate) now: GameTick,
    pass_depth: u32,
    pending_free: Vec<GroupId>,
}

impl<H: Host> Engine<H> {
    pub fn new(config: &EngineConfig, host: H) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rules: config.combat,
            kinds: KindTable::from_defs(config.kinds.iter().cloned()),
            overlap: OverlapPolicy::new(config.overlap_rules.iter().copied()),
            dissonance: Dissonance {
                song: config.performance.song_dissonance,
                dance: config.performance.dance_dissonance,
            },
            host,
            groups: HashMap::new(),
            order: Vec::new(),
            units: HashMap::new(),
            spatial: SpatialIndex::new(),
            cells: CellReservations::new(),
            group_ids: IdAllocator::new(config.first_group_id, config.group_id_capacity),
            unit_ids: IdAllocator::new(1, UNIT_ID_CAPACITY),
            slots: CasterSlots::new(config.max_groups_per_actor),
            ticksets: TickBuckets::new(config.tickset_capacity),
            presence: Presence::new(),
            transfers: TransferQueue::new(),
            now: GameTick::default(),
            pass_depth: 0,
            pending_free: Vec::new(),
        })
    }

    /// Replaces the stock family behavior of one kind.
    pub fn register_behavior(&mut self, kind: EffectKind, behavior: Arc<dyn EffectBehavior>) {
        self.kinds.register(kind, behavior);
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    /// Latest tick any operation has been driven with.
    pub fn now(&self) -> GameTick {
        self.now
    }

    pub fn group(&self, id: GroupId) -> Option<&EffectGroup> {
        self.groups
            .get(&id)
            .filter(|group| group.state() != GroupState::Removed)
    }

    pub fn unit(&self, id: UnitId) -> Option<&EffectUnit> {
        let slot = self.units.get(&id)?;
        let group = self.groups.get(&slot.group)?;
        group.units.get(slot.index).filter(|unit| unit.alive)
    }

    pub fn groups_owned_by(&self, actor: ActorId) -> Vec<GroupId> {
        self.slots.groups_of(actor)
    }

    pub fn groups(&self) -> impl Iterator<Item = &EffectGroup> {
        self.order
            .iter()
            .filter_map(|id| self.groups.get(id))
            .filter(|group| group.is_live())
    }

    pub fn live_group_count(&self) -> usize {
        self.groups.values().filter(|group| group.is_live()).count()
    }

    /// Groups still held in memory, including removed ones awaiting free.
    pub fn allocated_group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn live_unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn units_at(&self, cell: Cell) -> Vec<UnitId> {
        self.spatial.units_at(cell)
    }

    pub fn cell_flags(&self, cell: Cell) -> CellFlags {
        self.cells.flags(cell)
    }

    pub fn is_inside(&self, actor: ActorId, group: GroupId) -> bool {
        self.presence.unit_of(actor, group).is_some()
    }

    pub fn pending_transfers(&self, actor: ActorId) -> usize {
        self.transfers.pending(actor)
    }

    /// The kind a unit currently behaves as; differs from its group's kind
    /// while it is dissonant.
    pub fn effective_kind_of(&self, unit: UnitId) -> Option<EffectKind> {
        let slot = self.units.get(&unit)?;
        let group = self.groups.get(&slot.group)?;
        let unit = group.units.get(slot.index)?;
        Some(self.effective_kind(group, unit))
    }

    /// Ties two groups together so tearing down either tears down both.
    pub fn link_groups(&mut self, first: GroupId, second: GroupId) -> Result<(), EffectError> {
        for id in [first, second] {
            if !self.groups.get(&id).map_or(false, EffectGroup::is_live) {
                return Err(EffectError::GroupNotFound(id));
            }
        }
        if let Some(group) = self.groups.get_mut(&first) {
            group.link = Some(second);
        }
        if let Some(group) = self.groups.get_mut(&second) {
            group.link = Some(first);
        }
        Ok(())
    }

    /// Lets the combat system erode a destructible unit's hit points.
    pub fn damage_unit(&mut self, unit: UnitId, amount: i32) -> Result<UnitDamage, EffectError> {
        let slot = *self.units.get(&unit).ok_or(EffectError::UnitNotFound(unit))?;
        let group = self
            .groups
            .get_mut(&slot.group)
            .filter(|group| group.is_live())
            .ok_or(EffectError::UnitNotFound(unit))?;
        let destructible = self
            .kinds
            .def(group.kind)
            .map_or(false, |def| def.hit_points.is_some());
        let target = group
            .units
            .get_mut(slot.index)
            .filter(|candidate| candidate.alive)
            .ok_or(EffectError::UnitNotFound(unit))?;
        if !destructible {
            return Ok(UnitDamage {
                remaining: target.val1,
                destroyed: false,
            });
        }
        target.val1 = target.val1.saturating_sub(amount.max(0));
        let remaining = target.val1;
        if remaining > 0 {
            return Ok(UnitDamage {
                remaining,
                destroyed: false,
            });
        }
        let now = self.now;
        self.delete_unit(unit, false, now);
        Ok(UnitDamage {
            remaining,
            destroyed: true,
        })
    }

    /// Tears every group down and resets all registries.
    pub fn shutdown(&mut self) {
        self.begin_pass();
        let ids = self.order.clone();
        for id in ids {
            self.tear_down(id, TeardownReason::Shutdown);
        }
        self.end_pass();
        self.presence.clear();
        self.spatial.clear();
        self.ticksets.clear();
        self.transfers.clear();
        self.slots.clear();
    }

    pub(crate) fn observe(&mut self, now: GameTick) {
        if now > self.now {
            self.now = now;
        }
    }

    pub(crate) fn begin_pass(&mut self) {
        self.pass_depth += 1;
    }

    pub(crate) fn end_pass(&mut self) {
        self.pass_depth = self.pass_depth.saturating_sub(1);
        if self.pass_depth > 0 {
            return;
        }
        while !self.pending_free.is_empty() {
            let pending = std::mem::take(&mut self.pending_free);
            for id in pending {
                self.free_group(id);
            }
        }
    }

    /// Queues a removed group for release when the current pass closes.
    pub(crate) fn defer_free(&mut self, id: GroupId) {
        if !self.pending_free.contains(&id) {
            self.pending_free.push(id);
        }
    }

    /// Frees a torn-down group without waiting for the pass to close, so its
    /// id can be handed out again at once.
    pub(crate) fn free_now(&mut self, id: GroupId) {
        self.pending_free.retain(|pending| *pending != id);
        self.free_group(id);
    }

    fn free_group(&mut self, id: GroupId) {
        let removed = matches!(self.groups.get(&id), Some(group) if group.state() == GroupState::Removed);
        if !removed {
            return;
        }
        self.groups.remove(&id);
        self.order.retain(|candidate| *candidate != id);
    }

    pub(crate) fn allocate_unit_id(&mut self) -> Option<UnitId> {
        let units = &self.units;
        self.unit_ids
            .allocate(|id| units.contains_key(&UnitId(id)))
            .map(UnitId)
    }

    pub(crate) fn unit_is_live(&self, unit: UnitId) -> bool {
        let Some(slot) = self.units.get(&unit) else {
            return false;
        };
        self.groups.get(&slot.group).map_or(false, |group| {
            group.is_live() && group.units.get(slot.index).map_or(false, |unit| unit.alive)
        })
    }

    pub(crate) fn unit_mut(&mut self, unit: UnitId) -> Option<&mut EffectUnit> {
        let slot = *self.units.get(&unit)?;
        self.groups.get_mut(&slot.group)?.units.get_mut(slot.index)
    }

    pub(crate) fn effective_kind(&self, group: &EffectGroup, unit: &EffectUnit) -> EffectKind {
        if !unit.dissonant {
            return group.kind;
        }
        group
            .performance()
            .and_then(|performance| self.dissonance.variant(performance))
            .unwrap_or(group.kind)
    }

    pub(crate) fn audience(group: &EffectGroup, hidden: bool) -> Audience {
        if hidden {
            Audience::AlliesOf(group.owner)
        } else {
            Audience::Everyone
        }
    }

    /// Whether `unit` may act on the actor described by `info`.
    pub(crate) fn accepts(&self, unit: UnitId, info: &ActorInfo) -> bool {
        let Some(slot) = self.units.get(&unit) else {
            return false;
        };
        let Some(group) = self.groups.get(&slot.group) else {
            return false;
        };
        let Some(unit) = group.units.get(slot.index) else {
            return false;
        };
        if unit.is_disabled() {
            return false;
        }
        if !info.is_targetable() || info.hidden || info.cell.map != group.map {
            return false;
        }
        let (target, flags) = if unit.dissonant {
            match self.kinds.def(self.effective_kind(group, unit)) {
                Some(def) => (def.target, def.flags),
                None => (group.target, group.flags),
            }
        } else {
            (group.target, group.flags)
        };
        if flags.no_players && info.kind == ActorKind::Player {
            return false;
        }
        if flags.no_monsters && info.kind == ActorKind::Monster {
            return false;
        }
        target.allows(rules::relation(&self.rules, &group.owner, info))
    }

    /// Runs one behavior hook against a live unit, writes the unit's scratch
    /// values back, then applies whatever the hook requested.
    pub(crate) fn run_hook<R>(
        &mut self,
        unit: UnitId,
        now: GameTick,
        hook: impl FnOnce(&dyn EffectBehavior, &mut HookCtx<'_>) -> R,
    ) -> Option<R> {
        let slot = *self.units.get(&unit)?;
        let group = self.groups.get(&slot.group)?;
        let current = group.units.get(slot.index).filter(|unit| unit.alive)?;
        let kind = self.effective_kind(group, current);
        let Some(def) = self.kinds.def(kind) else {
            warn!(%kind, unit = unit.0, "no definition for effect kind, hook skipped");
            return None;
        };
        let behavior = self.kinds.behavior(kind);
        let group_view = GroupView::of(group, kind);
        let mut unit_view = UnitView::of(current);
        let mut requests = Vec::new();
        let result = {
            let mut ctx = HookCtx::new(
                now,
                def.as_ref(),
                &group_view,
                &mut unit_view,
                &mut self.host,
                &mut requests,
            );
            hook(behavior.as_ref(), &mut ctx)
        };
        if let Some(target) = self.unit_mut(unit) {
            target.val1 = unit_view.val1;
            target.val2 = unit_view.val2;
            target.range = unit_view.range;
        }
        self.apply_requests(slot.group, unit, requests, now);
        Some(result)
    }

    fn apply_requests(&mut self, group: GroupId, unit: UnitId, requests: Vec<HookRequest>, now: GameTick) {
        for request in requests {
            if !self.groups.get(&group).map_or(false, EffectGroup::is_live) {
                return;
            }
            match request {
                HookRequest::DeleteUnit => {
                    self.delete_unit(unit, false, now);
                }
                HookRequest::TearDownGroup => {
                    self.tear_down(group, TeardownReason::Cancelled);
                }
                HookRequest::Transform(transform) => {
                    self.transform_group(group, transform.kind, transform.lifetime, now);
                }
            }
        }
    }

    pub(crate) fn def_of(&self, group: GroupId) -> Option<Arc<KindDef>> {
        let kind = self.groups.get(&group)?.kind;
        self.kinds.def(kind)
    }
}
