use tracing::{debug, trace};

use crate::effects::behavior::ExpireOutcome;
use crate::effects::engine::Engine;
use crate::effects::group::GroupState;
use crate::effects::ids::{GroupId, UnitId};
use crate::effects::tickset::TicksetKey;
use crate::host::{Host, UnitNotice};
use crate::world::time::GameTick;

/// What one scheduler pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub visited: usize,
    pub expired: usize,
    pub hits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    NotDue,
    Deleted,
    Renewed,
    Transformed,
}

impl<H: Host> Engine<H> {
    /// One scheduler pass over every live unit, in group insertion order.
    /// Each unit is checked for expiry first, then aged, then re-applied to
    /// its occupants if its group has an interval.
    pub fn run_tick(&mut self, now: GameTick) -> TickReport {
        self.observe(now);
        let mut report = TickReport::default();
        self.begin_pass();
        let snapshot = self.order.clone();
        for group in snapshot {
            let units: Vec<UnitId> = match self.groups.get(&group) {
                Some(current) if current.is_live() => current.live_units().map(|unit| unit.id).collect(),
                _ => continue,
            };
            for unit in units {
                if !self.unit_is_live(unit) {
                    continue;
                }
                report.visited += 1;
                match self.expire_if_due(group, unit, now) {
                    Expiry::NotDue => {}
                    Expiry::Deleted => {
                        report.expired += 1;
                        continue;
                    }
                    Expiry::Renewed | Expiry::Transformed => report.expired += 1,
                }
                self.run_hook(unit, now, |behavior, ctx| behavior.on_age(ctx));
                if !self.unit_is_live(unit) {
                    continue;
                }
                report.hits += self.pulse(group, unit, now);
            }
        }
        self.end_pass();
        if report.expired > 0 {
            debug!(tick = now.0, ?report, "scheduler pass");
        }
        report
    }

    fn expire_if_due(&mut self, group_id: GroupId, unit: UnitId, now: GameTick) -> Expiry {
        let due = match (self.groups.get(&group_id), self.unit(unit)) {
            (Some(group), Some(current)) => group.is_expired(current, now),
            _ => false,
        };
        if !due {
            return Expiry::NotDue;
        }
        if let Some(group) = self.groups.get_mut(&group_id) {
            group.set_state(GroupState::Expiring);
        }
        let outcome = self
            .run_hook(unit, now, |behavior, ctx| behavior.on_expire(ctx))
            .unwrap_or(ExpireOutcome::Delete);
        if !self.unit_is_live(unit) {
            return Expiry::Deleted;
        }
        match outcome {
            ExpireOutcome::Delete => {
                debug!(unit = unit.0, group = group_id.0, "effect unit expired");
                self.delete_unit(unit, true, now);
                if let Some(group) = self.groups.get_mut(&group_id).filter(|group| group.is_live()) {
                    if group.elapsed(now) < group.limit {
                        group.set_state(GroupState::Active);
                    }
                }
                Expiry::Deleted
            }
            ExpireOutcome::Renew { lifetime } => {
                let Some(group) = self.groups.get_mut(&group_id) else {
                    return Expiry::Deleted;
                };
                let limit = group.elapsed(now).saturating_add(lifetime).max(group.limit);
                group.limit = limit;
                group.set_state(GroupState::Active);
                if let Some(current) = self.unit_mut(unit) {
                    current.limit = limit;
                }
                debug!(unit = unit.0, group = group_id.0, limit, "effect renewed");
                Expiry::Renewed
            }
            ExpireOutcome::Transform(transform) => {
                debug!(unit = unit.0, group = group_id.0, into = %transform.kind, "effect changes phase on expiry");
                self.transform_group(group_id, transform.kind, transform.lifetime, now);
                Expiry::Transformed
            }
        }
    }

    /// Re-applies a unit to the occupants of its cell, or of its square
    /// radius, subject to each occupant's tick bucket.
    fn pulse(&mut self, group_id: GroupId, unit: UnitId, now: GameTick) -> usize {
        let (interval, key) = match self.groups.get(&group_id) {
            Some(group) => {
                let key = if group.flags.no_overlap {
                    TicksetKey::Kind(group.kind)
                } else {
                    TicksetKey::Group(group_id)
                };
                (group.interval, key)
            }
            None => return 0,
        };
        let Some(interval) = interval else {
            return 0;
        };
        let Some((cell, radius)) = self
            .unit(unit)
            .and_then(|current| current.scan_radius().map(|radius| (current.cell, radius)))
        else {
            return 0;
        };
        let occupants = if radius == 0 {
            self.host.actors_at(cell)
        } else {
            self.host.actors_near(cell, radius)
        };
        let mut hits = 0;
        for actor in occupants {
            if !self.unit_is_live(unit) {
                break;
            }
            let Some(info) = self.host.actor(actor) else {
                continue;
            };
            if !self.accepts(unit, &info) {
                continue;
            }
            if !self.ticksets.try_hit(actor, key, now, interval) {
                continue;
            }
            trace!(unit = unit.0, group = group_id.0, actor = actor.0, tick = now.0, "tick hit");
            self.run_hook(unit, now, |behavior, ctx| behavior.on_tick(ctx, actor));
            hits += 1;
        }
        hits
    }

    /// Re-announces a unit after something about it changed.
    pub(crate) fn announce_changed(&mut self, unit: UnitId) {
        let Some(slot) = self.units.get(&unit).copied() else {
            return;
        };
        let Some(group) = self.groups.get(&slot.group) else {
            return;
        };
        let Some(current) = group.units.get(slot.index) else {
            return;
        };
        let notice = UnitNotice::Changed {
            unit,
            kind: self.effective_kind(group, current),
            cell: current.cell,
            audience: Self::audience(group, current.hidden),
        };
        self.host.notify(notice);
    }
}
