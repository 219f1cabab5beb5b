use tracing::{debug, info, warn};

use crate::effects::engine::Engine;
use crate::effects::group::{EffectGroup, GroupState, TeardownReason};
use crate::effects::ids::{EffectKind, GroupId, UnitId};
use crate::entities::actor::ActorId;
use crate::host::{Host, UnitNotice};
use crate::world::position::Cell;
use crate::world::time::GameTick;

impl<H: Host> Engine<H> {
    /// Explicit cancellation. Returns false if the group was already gone or
    /// being torn down, which makes repeated calls harmless.
    pub fn force_teardown(&mut self, group: GroupId) -> bool {
        self.tear_down(group, TeardownReason::Cancelled)
    }

    /// Releases a group exactly once: backed statuses, cell flags, the
    /// caster slot, the units, the group itself, then any linked group.
    pub(crate) fn tear_down(&mut self, id: GroupId, reason: TeardownReason) -> bool {
        let Some(group) = self.groups.get_mut(&id) else {
            debug!(group = id.0, ?reason, "teardown of unknown group ignored");
            return false;
        };
        if !group.begin_teardown() {
            debug!(group = id.0, ?reason, "group already torn down");
            return false;
        }
        let owner = group.owner.actor;
        let kind = group.kind;
        let link = group.link.take();
        let cell_flag = group.cell_flag;
        let live: Vec<(UnitId, Cell)> = group.live_units().map(|unit| (unit.id, unit.cell)).collect();
        let now = self.now;

        self.begin_pass();

        if reason != TeardownReason::Rejected {
            if let Some(status) = self.kinds.def(kind).and_then(|def| def.caster_status) {
                self.host.revoke_status(owner, status, id);
            }
        }
        for actor in self.presence.actors_in(id) {
            self.exit_group(actor, id, now);
        }

        if let Some(flag) = cell_flag {
            for (_, cell) in &live {
                if self.cells.release(*cell, flag) {
                    self.host.set_cell_flag(*cell, flag, false);
                }
            }
        }

        self.slots.remove(owner, id);

        if let Some(group) = self.groups.get_mut(&id) {
            for index in 0..group.units.len() {
                group.kill_unit(index);
            }
        }
        for (unit, cell) in &live {
            self.units.remove(unit);
            self.spatial.remove(*cell, *unit);
            self.host.notify(UnitNotice::Disappeared {
                unit: *unit,
                cell: *cell,
                expired: false,
            });
        }
        for (_, cell) in &live {
            self.refresh_dissonance(*cell, now);
        }

        if let Some(group) = self.groups.get_mut(&id) {
            group.finish_teardown();
        }
        self.ticksets.forget_group(id);
        info!(group = id.0, %kind, caster = owner.0, ?reason, units = live.len(), "effect group torn down");
        self.defer_free(id);
        self.end_pass();

        if let Some(linked) = link {
            self.tear_down(linked, TeardownReason::Linked);
        }
        true
    }

    /// Deletes one unit, firing exits for whoever stood inside the group
    /// through it. The group goes with its last unit.
    pub(crate) fn delete_unit(&mut self, unit: UnitId, expired: bool, now: GameTick) -> bool {
        if !self.unit_is_live(unit) {
            return false;
        }
        let Some(slot) = self.units.get(&unit).copied() else {
            return false;
        };
        let group_id = slot.group;
        self.begin_pass();

        for actor in self.presence.actors_via(group_id, unit) {
            self.exit_group(actor, group_id, now);
        }

        let Some(group) = self.groups.get_mut(&group_id).filter(|group| group.is_live()) else {
            self.end_pass();
            return false;
        };
        let Some(cell) = group.units.get(slot.index).map(|unit| unit.cell) else {
            self.end_pass();
            return false;
        };
        if !group.kill_unit(slot.index) {
            self.end_pass();
            return false;
        }
        let remaining = group.alive_count();
        let flag = group.cell_flag;

        self.units.remove(&unit);
        self.spatial.remove(cell, unit);
        if let Some(flag) = flag {
            if self.cells.release(cell, flag) {
                self.host.set_cell_flag(cell, flag, false);
            }
        }
        self.host.notify(UnitNotice::Disappeared { unit, cell, expired });
        debug!(unit = unit.0, group = group_id.0, expired, remaining, "effect unit deleted");
        self.refresh_dissonance(cell, now);

        if remaining == 0 {
            self.tear_down(group_id, TeardownReason::Depleted);
        }
        self.end_pass();
        true
    }

    /// Switches a group to another kind in place, e.g. a trap going off or
    /// a warp opening. Timing restarts from `now` with the new lifetime.
    /// Occupants leave under the old kind and actors on its cells are
    /// re-entered under the new one.
    pub(crate) fn transform_group(&mut self, id: GroupId, kind: EffectKind, lifetime: u64, now: GameTick) {
        let Some(def) = self.kinds.def(kind) else {
            warn!(group = id.0, %kind, "transform into unknown kind, tearing group down");
            self.tear_down(id, TeardownReason::Depleted);
            return;
        };
        if !self.group_is_live(id) {
            return;
        }
        self.begin_pass();
        for actor in self.presence.actors_in(id) {
            self.exit_group(actor, id, now);
        }
        let Some(group) = self.groups.get_mut(&id).filter(|group| group.is_live()) else {
            self.end_pass();
            return;
        };
        let old_flag = group.cell_flag;
        group.kind = def.id;
        group.interval = def.interval;
        group.target = def.target;
        group.flags = def.flags;
        group.cell_flag = def.cell_flag;
        group.limit = group.elapsed(now).saturating_add(lifetime);
        group.set_state(GroupState::Active);
        let limit = group.limit;
        let range = def.range(group.level);
        for unit in group.units.iter_mut().filter(|unit| unit.alive) {
            unit.limit = limit;
            unit.range = range;
            unit.hidden = def.flags.hidden;
        }
        let cells: Vec<(UnitId, Cell, bool)> = group
            .live_units()
            .map(|unit| (unit.id, unit.cell, unit.hidden))
            .collect();
        let audiences: Vec<_> = cells
            .iter()
            .map(|(_, _, hidden)| Self::audience(group, *hidden))
            .collect();

        for (unit, cell, _) in &cells {
            if let Some(flag) = old_flag {
                if self.cells.release(*cell, flag) {
                    self.host.set_cell_flag(*cell, flag, false);
                }
            }
            if let Some(flag) = def.cell_flag {
                if self.cells.reserve(*cell, flag) {
                    self.host.set_cell_flag(*cell, flag, true);
                }
            }
            debug!(unit = unit.0, group = id.0, %kind, "effect unit transformed");
        }
        for ((unit, cell, _), audience) in cells.iter().zip(audiences) {
            let kind = self.effective_kind_of(*unit).unwrap_or(kind);
            self.host.notify(UnitNotice::Changed {
                unit: *unit,
                kind,
                cell: *cell,
                audience,
            });
        }
        for (unit, cell, _) in &cells {
            self.admit_standing(*unit, *cell, now);
        }
        self.end_pass();
    }

    /// Takes the actor out of a group: on_out and on_left through the unit
    /// it entered by. Presence is dropped first so a hook that deletes the
    /// unit cannot fire the pair twice.
    pub(crate) fn exit_group(&mut self, actor: ActorId, group: GroupId, now: GameTick) {
        let Some(unit) = self.presence.leave(actor, group) else {
            return;
        };
        debug!(actor = actor.0, group = group.0, unit = unit.0, "actor left effect group");
        self.run_hook(unit, now, |behavior, ctx| behavior.on_out(ctx, actor));
        self.run_hook(unit, now, |behavior, ctx| behavior.on_left(ctx, actor));
    }

    /// Whether `group` still holds a live unit anywhere.
    pub(crate) fn group_is_live(&self, group: GroupId) -> bool {
        self.groups.get(&group).map_or(false, EffectGroup::is_live)
    }
}
