//! Per-kind behavior hooks.
//!
//! The engine never looks at what an effect *does*; it only drives the
//! lifecycle and calls into an [`EffectBehavior`] at the transition points.
//! Hooks get a [`HookCtx`] holding copies of the group and unit state plus the
//! host. Structural changes (deleting the unit, tearing down the group,
//! switching phase) are queued as [`HookRequest`]s and applied by the engine
//! after the hook returns, so a hook can never invalidate the iteration that
//! called it.

use std::sync::Arc;

use crate::combat::rules::Side;
use crate::effects::group::EffectGroup;
use crate::effects::ids::{EffectKind, GroupId, UnitId};
use crate::effects::kinds::{Family, KindDef, Transform};
use crate::effects::unit::EffectUnit;
use crate::entities::actor::ActorId;
use crate::host::{Host, StatusGrant, Strike};
use crate::world::position::Cell;
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupView {
    pub id: GroupId,
    /// Kind in effect for this unit, after any dissonant substitution.
    pub kind: EffectKind,
    pub level: u16,
    pub owner: Side,
    pub tick: GameTick,
    pub limit: u64,
}

impl GroupView {
    pub fn of(group: &EffectGroup, kind: EffectKind) -> Self {
        Self {
            id: group.id,
            kind,
            level: group.level,
            owner: group.owner,
            tick: group.tick,
            limit: group.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitView {
    pub id: UnitId,
    pub cell: Cell,
    pub val1: i32,
    pub val2: i32,
    pub range: i16,
}

impl UnitView {
    pub fn of(unit: &EffectUnit) -> Self {
        Self {
            id: unit.id,
            cell: unit.cell,
            val1: unit.val1,
            val2: unit.val2,
            range: unit.range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRequest {
    DeleteUnit,
    TearDownGroup,
    Transform(Transform),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOutcome {
    Delete,
    /// Push the deadline out to `elapsed + lifetime`.
    Renew { lifetime: u64 },
    Transform(Transform),
}

pub struct HookCtx<'a> {
    pub now: GameTick,
    pub def: &'a KindDef,
    pub group: &'a GroupView,
    pub unit: &'a mut UnitView,
    pub host: &'a mut dyn Host,
    requests: &'a mut Vec<HookRequest>,
}

impl<'a> HookCtx<'a> {
    pub fn new(
        now: GameTick,
        def: &'a KindDef,
        group: &'a GroupView,
        unit: &'a mut UnitView,
        host: &'a mut dyn Host,
        requests: &'a mut Vec<HookRequest>,
    ) -> Self {
        Self {
            now,
            def,
            group,
            unit,
            host,
            requests,
        }
    }

    pub fn request(&mut self, request: HookRequest) {
        if !self.requests.contains(&request) {
            self.requests.push(request);
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.now.since(self.group.tick)
    }

    pub fn remaining_lifetime(&self) -> u64 {
        self.group.limit.saturating_sub(self.elapsed())
    }

    pub fn strike(&mut self, target: ActorId) {
        let strike = Strike {
            group: self.group.id,
            unit: self.unit.id,
            kind: self.group.kind,
            level: self.group.level,
            caster: self.group.owner.actor,
            target,
            tick: self.now,
        };
        self.host.strike(strike);
    }

    pub fn grant_status(&mut self, target: ActorId) {
        let Some(spec) = self.def.status else {
            return;
        };
        let duration = spec.duration.unwrap_or_else(|| self.remaining_lifetime());
        let grant = StatusGrant {
            status: spec.id,
            level: self.group.level,
            duration,
            source: self.group.id,
            caster: self.group.owner.actor,
        };
        self.host.apply_status(target, grant);
    }

    pub fn revoke_status(&mut self, target: ActorId) {
        if let Some(spec) = self.def.status {
            self.host.revoke_status(target, spec.id, self.group.id);
        }
    }
}

pub trait EffectBehavior {
    fn on_place(&self, _ctx: &mut HookCtx<'_>, _target: ActorId) {}

    fn on_out(&self, _ctx: &mut HookCtx<'_>, _target: ActorId) {}

    fn on_left(&self, _ctx: &mut HookCtx<'_>, _target: ActorId) {}

    fn on_tick(&self, _ctx: &mut HookCtx<'_>, _target: ActorId) {}

    /// Once per scheduler pass per live unit, before occupants are scanned.
    fn on_age(&self, _ctx: &mut HookCtx<'_>) {}

    fn on_expire(&self, ctx: &mut HookCtx<'_>) -> ExpireOutcome {
        default_expire(ctx)
    }
}

/// Renewal, then phase change, then item recovery, then plain deletion.
pub fn default_expire(ctx: &mut HookCtx<'_>) -> ExpireOutcome {
    if let Some(renewal) = ctx.def.renewal {
        if ctx.host.has_status(ctx.group.owner.actor, renewal.while_status) {
            return ExpireOutcome::Renew {
                lifetime: renewal.extend_by,
            };
        }
    }
    if let Some(transform) = ctx.def.expire_into {
        return ExpireOutcome::Transform(transform);
    }
    if let Some(drop) = ctx.def.recover_item {
        ctx.host.drop_item(ctx.unit.cell, drop.item, drop.amount);
    }
    ExpireOutcome::Delete
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Inert;

impl EffectBehavior for Inert {}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusZone;

impl EffectBehavior for StatusZone {
    fn on_place(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        ctx.grant_status(target);
    }

    fn on_left(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        ctx.revoke_status(target);
    }

    fn on_tick(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        ctx.grant_status(target);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicStrike;

impl PeriodicStrike {
    fn hit(ctx: &mut HookCtx<'_>, target: ActorId) {
        ctx.strike(target);
        ctx.grant_status(target);
        if ctx.def.hits.is_some() {
            ctx.unit.val2 -= 1;
            if ctx.unit.val2 <= 0 {
                ctx.request(HookRequest::DeleteUnit);
            }
        }
    }
}

impl EffectBehavior for PeriodicStrike {
    fn on_place(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        if ctx.def.flags.dual_mode {
            Self::hit(ctx, target);
        }
    }

    fn on_tick(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        Self::hit(ctx, target);
    }
}

/// Fires once on the first occupant, then moves to its spent phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trap;

impl Trap {
    const TRIGGERED: i32 = 1;

    fn trigger(ctx: &mut HookCtx<'_>, target: ActorId) {
        if ctx.unit.val2 == Self::TRIGGERED {
            return;
        }
        ctx.unit.val2 = Self::TRIGGERED;
        ctx.strike(target);
        ctx.grant_status(target);
        match ctx.def.trigger_into {
            Some(spent) => ctx.request(HookRequest::Transform(spent)),
            None => ctx.request(HookRequest::DeleteUnit),
        }
    }
}

impl EffectBehavior for Trap {
    fn on_place(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        Self::trigger(ctx, target);
    }

    fn on_tick(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        Self::trigger(ctx, target);
    }
}

/// Destructible cell blocker; `val1` holds its hit points.
#[derive(Debug, Clone, Copy, Default)]
pub struct Obstacle;

impl EffectBehavior for Obstacle {
    fn on_age(&self, ctx: &mut HookCtx<'_>) {
        if ctx.def.decay <= 0 || ctx.def.hit_points.is_none() {
            return;
        }
        ctx.unit.val1 = ctx.unit.val1.saturating_sub(ctx.def.decay);
        if ctx.unit.val1 <= 0 {
            ctx.request(HookRequest::DeleteUnit);
        }
    }
}

pub fn for_family(family: Family) -> Arc<dyn EffectBehavior> {
    match family {
        Family::StatusZone => Arc::new(StatusZone),
        Family::PeriodicStrike => Arc::new(PeriodicStrike),
        Family::Trap => Arc::new(Trap),
        Family::Obstacle => Arc::new(Obstacle),
        Family::Inert => Arc::new(Inert),
    }
}
