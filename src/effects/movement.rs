use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::effects::engine::Engine;
use crate::effects::group::TeardownReason;
use crate::effects::ids::{GroupId, UnitId};
use crate::effects::kinds::Performance;
use crate::effects::placement::PlaceRequest;
use crate::effects::transfer::SavedPlacement;
use crate::entities::actor::{ActorId, ActorInfo};
use crate::host::{Host, Terrain};
use crate::world::position::{Cell, CellDelta};
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Logout,
    Death,
    MapChange,
}

impl<H: Host> Engine<H> {
    /// Called after the actor's position is committed. Fires on_out/on_left
    /// for what it walked out of, then on_place for what it walked into;
    /// each at most once per group.
    pub fn on_actor_moved(&mut self, actor: ActorId, old: Cell, new: Cell, now: GameTick) {
        self.observe(now);
        self.begin_pass();
        if let Some(delta) = old.delta_to(new).filter(|delta| !delta.is_zero()) {
            for group in self.slots.groups_of(actor) {
                let follows = self
                    .groups
                    .get(&group)
                    .map_or(false, |current| current.is_live() && current.flags.follows_caster);
                if follows {
                    self.move_group(group, delta, now);
                }
            }
        }
        self.settle_actor(actor, Some(new), now);
        self.end_pass();
    }

    /// Tears down everything the actor owns and takes it out of every group
    /// it stands in. A map change first saves the kinds that survive
    /// transfers, to be re-placed by [`Engine::on_actor_arrived`].
    pub fn on_actor_removed(&mut self, actor: ActorId, reason: RemovalReason, now: GameTick) {
        self.observe(now);
        self.begin_pass();
        let owned = self.slots.groups_of(actor);
        if reason == RemovalReason::MapChange {
            for group in &owned {
                let Some(current) = self.groups.get(group).filter(|current| current.is_live()) else {
                    continue;
                };
                let persists = self
                    .kinds
                    .def(current.kind)
                    .map_or(false, |def| def.persist_on_transfer);
                if persists {
                    let saved = SavedPlacement {
                        kind: current.kind,
                        level: current.level,
                    };
                    info!(actor = actor.0, kind = %saved.kind, level = saved.level, "effect queued for re-creation after map change");
                    self.transfers.record(actor, saved);
                }
            }
        }
        for group in owned {
            self.tear_down(group, TeardownReason::Cancelled);
        }
        for group in self.presence.groups_of(actor) {
            self.exit_group(actor, group, now);
        }
        self.ticksets.forget_actor(actor);
        debug!(actor = actor.0, ?reason, "actor removed from effects");
        self.end_pass();
    }

    /// Re-creates effects saved by a map change at the actor's new cell and
    /// activates whatever it landed in.
    pub fn on_actor_arrived(&mut self, actor: ActorId, now: GameTick) -> Vec<GroupId> {
        self.observe(now);
        let saved = self.transfers.take(actor);
        let Some(info) = self.host.actor(actor) else {
            if !saved.is_empty() {
                warn!(actor = actor.0, dropped = saved.len(), "arriving actor unknown, saved effects dropped");
            }
            return Vec::new();
        };
        self.begin_pass();
        let mut placed = Vec::new();
        for entry in saved {
            match self.place(PlaceRequest::new(actor, entry.kind, entry.level, info.cell), now) {
                Ok(group) => {
                    info!(actor = actor.0, kind = %entry.kind, group = group.0, "effect re-created after map change");
                    placed.push(group);
                }
                Err(err) => debug!(actor = actor.0, kind = %entry.kind, %err, "saved effect could not be re-created"),
            }
        }
        self.settle_actor(actor, Some(info.cell), now);
        self.end_pass();
        placed
    }

    /// Brings the actor's presence in line with the units covering `cell`.
    /// Exits fire before entries. Moving between two cells of one group
    /// fires on_out then on_place, without on_left.
    pub(crate) fn settle_actor(&mut self, actor: ActorId, cell: Option<Cell>, now: GameTick) {
        let info = self.host.actor(actor);
        let covering = match (info, cell) {
            (Some(info), Some(cell)) => self.covering_units(&info, cell),
            _ => Vec::new(),
        };

        let mut crossing: Vec<GroupId> = Vec::new();
        for group in self.presence.groups_of(actor) {
            let Some(current) = self.presence.unit_of(actor, group) else {
                continue;
            };
            match covering.iter().find(|(candidate, _)| *candidate == group) {
                Some((_, unit)) if *unit == current => {}
                Some(_) => {
                    self.presence.leave(actor, group);
                    debug!(actor = actor.0, group = group.0, unit = current.0, "actor crossed to another cell of group");
                    self.run_hook(current, now, |behavior, ctx| behavior.on_out(ctx, actor));
                    crossing.push(group);
                }
                None => self.exit_group(actor, group, now),
            }
        }

        for (group, unit) in covering {
            if self.presence.unit_of(actor, group).is_some() {
                continue;
            }
            if !self.unit_is_live(unit) {
                continue;
            }
            if crossing.contains(&group) {
                self.presence.enter(actor, group, unit);
                self.run_hook(unit, now, |behavior, ctx| behavior.on_place(ctx, actor));
            } else {
                self.enter_via(actor, unit, now);
            }
        }
    }

    /// First activation of one unit for one actor, if the unit accepts it
    /// and the actor is not already inside the group.
    pub(crate) fn enter_via(&mut self, actor: ActorId, unit: UnitId, now: GameTick) -> bool {
        let Some(group) = self.units.get(&unit).map(|slot| slot.group) else {
            return false;
        };
        if self.presence.unit_of(actor, group).is_some() {
            return false;
        }
        let Some(info) = self.host.actor(actor) else {
            return false;
        };
        if !self.accepts(unit, &info) {
            return false;
        }
        self.presence.enter(actor, group, unit);
        debug!(actor = actor.0, group = group.0, unit = unit.0, "actor entered effect group");
        self.run_hook(unit, now, |behavior, ctx| behavior.on_place(ctx, actor));
        true
    }

    /// First live accepting unit of each group on the cell.
    fn covering_units(&self, info: &ActorInfo, cell: Cell) -> Vec<(GroupId, UnitId)> {
        let mut covering: Vec<(GroupId, UnitId)> = Vec::new();
        for unit in self.spatial.units_at(cell) {
            let Some(group) = self.units.get(&unit).map(|slot| slot.group) else {
                continue;
            };
            if covering.iter().any(|(seen, _)| *seen == group) {
                continue;
            }
            if self.unit_is_live(unit) && self.accepts(unit, info) {
                covering.push((group, unit));
            }
        }
        covering
    }

    /// Shifts every unit of a caster-following group by `delta`. Units that
    /// would leave the map are deleted.
    pub(crate) fn move_group(&mut self, id: GroupId, delta: CellDelta, now: GameTick) {
        let Some(group) = self.groups.get(&id).filter(|group| group.is_live()) else {
            return;
        };
        let flag = group.cell_flag;
        let units: Vec<(UnitId, Cell)> = group.live_units().map(|unit| (unit.id, unit.cell)).collect();

        let mut moves: Vec<(UnitId, Cell, Cell)> = Vec::new();
        for (unit, from) in units {
            let to = from
                .offset(delta)
                .filter(|to| self.host.terrain(*to) != Terrain::OutOfBounds);
            match to {
                Some(to) => moves.push((unit, from, to)),
                None => {
                    debug!(unit = unit.0, group = id.0, "following unit left the map");
                    self.delete_unit(unit, false, now);
                }
            }
        }
        if !self.group_is_live(id) {
            return;
        }

        for (unit, from, _) in &moves {
            self.spatial.remove(*from, *unit);
            if let Some(flag) = flag {
                if self.cells.release(*from, flag) {
                    self.host.set_cell_flag(*from, flag, false);
                }
            }
        }
        for (unit, _, to) in &moves {
            self.spatial.insert(*to, *unit);
            if let Some(current) = self.unit_mut(*unit) {
                current.cell = *to;
            }
            if let Some(flag) = flag {
                if self.cells.reserve(*to, flag) {
                    self.host.set_cell_flag(*to, flag, true);
                }
            }
        }
        for (unit, _, _) in &moves {
            self.announce_changed(*unit);
        }

        let mut touched: Vec<Cell> = Vec::new();
        for (_, from, to) in &moves {
            for cell in [*from, *to] {
                if !touched.contains(&cell) {
                    touched.push(cell);
                }
            }
        }
        for cell in &touched {
            self.refresh_dissonance(*cell, now);
        }

        let mut affected = self.presence.actors_in(id);
        for (_, _, to) in &moves {
            for actor in self.host.actors_at(*to) {
                if !affected.contains(&actor) {
                    affected.push(actor);
                }
            }
        }
        for actor in affected {
            let cell = self.host.actor(actor).map(|info| info.cell);
            self.settle_actor(actor, cell, now);
        }
    }

    /// Recomputes song/dance substitution on one cell. A performance unit
    /// is dissonant exactly while another group's performance of the same
    /// class shares its cell. Occupants leave under the old variant; whoever
    /// stands on the cell is then let in again only if the new variant's
    /// target filter accepts them.
    pub(crate) fn refresh_dissonance(&mut self, cell: Cell, now: GameTick) {
        let mut performers: Vec<(UnitId, GroupId, Performance, bool)> = Vec::new();
        for unit in self.spatial.units_at(cell) {
            let Some(slot) = self.units.get(&unit).copied() else {
                continue;
            };
            let Some(group) = self.groups.get(&slot.group).filter(|group| group.is_live()) else {
                continue;
            };
            let Some(performance) = group.performance() else {
                continue;
            };
            let Some(current) = group.units.get(slot.index).filter(|current| current.alive) else {
                continue;
            };
            performers.push((unit, slot.group, performance, current.dissonant));
        }
        let flips: Vec<(UnitId, GroupId, bool)> = performers
            .iter()
            .filter_map(|(unit, group, performance, dissonant)| {
                let overlapped = performers
                    .iter()
                    .any(|(_, other, theirs, _)| other != group && theirs == performance);
                (overlapped != *dissonant).then_some((*unit, *group, overlapped))
            })
            .collect();

        for (unit, group, dissonant) in flips {
            if !self.unit_is_live(unit) {
                continue;
            }
            for actor in self.presence.actors_via(group, unit) {
                self.exit_group(actor, group, now);
            }
            let Some(current) = self.unit_mut(unit) else {
                continue;
            };
            current.dissonant = dissonant;
            debug!(unit = unit.0, group = group.0, dissonant, "performance overlap changed");
            self.announce_changed(unit);
            self.admit_standing(unit, cell, now);
        }
    }

    /// Runs entry for every actor standing on `cell` against `unit` as it
    /// is now. Used after a unit changes kind under its occupants.
    pub(crate) fn admit_standing(&mut self, unit: UnitId, cell: Cell, now: GameTick) {
        for actor in self.host.actors_at(cell) {
            if !self.unit_is_live(unit) {
                break;
            }
            self.enter_via(actor, unit, now);
        }
    }
}
