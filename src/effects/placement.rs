use tracing::{debug, info, warn};

use crate::combat::rules::Side;
use crate::effects::engine::{Engine, UnitSlot};
use crate::effects::group::{EffectGroup, TeardownReason};
use crate::effects::ids::{EffectKind, GroupId, UnitId};
use crate::effects::kinds::KindDef;
use crate::effects::overlap::OverlapAction;
use crate::effects::unit::EffectUnit;
use crate::entities::actor::ActorId;
use crate::error::EffectError;
use crate::host::{Host, StatusGrant, Terrain, UnitNotice};
use crate::world::position::{Cell, Direction};
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceRequest {
    pub caster: ActorId,
    pub kind: EffectKind,
    pub level: u16,
    pub origin: Cell,
    /// Orients wall layouts; ignored by symmetric ones.
    pub facing: Direction,
}

impl PlaceRequest {
    pub fn new(caster: ActorId, kind: EffectKind, level: u16, origin: Cell) -> Self {
        Self {
            caster,
            kind,
            level,
            origin,
            facing: Direction::South,
        }
    }

    pub fn facing(mut self, facing: Direction) -> Self {
        self.facing = facing;
        self
    }
}

enum CellVerdict {
    Usable { cancel: Vec<UnitId> },
    Rejected(&'static str),
}

impl<H: Host> Engine<H> {
    /// Builds a group with one unit per layout cell that survives terrain
    /// and overlap checks, then activates it for anyone already standing on
    /// those cells.
    pub fn place(&mut self, request: PlaceRequest, now: GameTick) -> Result<GroupId, EffectError> {
        self.observe(now);
        let def = self
            .kinds
            .def(request.kind)
            .ok_or(EffectError::UnknownKind(request.kind))?;
        let caster = self
            .host
            .actor(request.caster)
            .ok_or(EffectError::UnknownActor(request.caster))?;
        let offsets = def
            .layout(request.level)
            .map(|layout| layout.offsets(request.facing))
            .unwrap_or_default();

        if let Some(oldest) = self.slots.eviction_candidate(caster.id) {
            info!(
                caster = caster.id.0,
                group = oldest.0,
                limit = self.slots.capacity(),
                "caster group table full, evicting oldest group"
            );
            self.tear_down(oldest, TeardownReason::Evicted);
        }
        let id = self.allocate_group_id()?;

        self.begin_pass();
        let group = EffectGroup::new(id, &def, request.level, Side::from(&caster), request.origin.map, now);
        let limit = group.limit;
        self.groups.insert(id, group);
        self.order.push(id);
        self.slots.push(caster.id, id);

        let range = def.range(request.level);
        let mut placed: Vec<(UnitId, Cell)> = Vec::new();
        for offset in &offsets {
            let Some(cell) = request.origin.offset(*offset) else {
                debug!(kind = %def.id, ?offset, "layout cell falls off the grid");
                continue;
            };
            let cancel = match self.judge_cell(&def, request.level, id, cell) {
                CellVerdict::Usable { cancel } => cancel,
                CellVerdict::Rejected(why) => {
                    debug!(kind = %def.id, x = cell.x, y = cell.y, why, "layout cell rejected");
                    continue;
                }
            };
            for existing in cancel {
                debug!(kind = %def.id, unit = existing.0, "overlap cancels existing unit");
                self.delete_unit(existing, false, now);
            }
            let Some(unit_id) = self.allocate_unit_id() else {
                warn!(kind = %def.id, "unit id space exhausted");
                break;
            };
            let unit = EffectUnit {
                id: unit_id,
                group: id,
                cell,
                val1: def.hit_points.unwrap_or(0),
                val2: def.hits.unwrap_or(0),
                limit,
                range,
                alive: true,
                hidden: def.flags.hidden,
                dissonant: false,
            };
            let Some(group) = self.groups.get_mut(&id) else {
                break;
            };
            let index = group.add_unit(unit);
            let audience = Self::audience(group, def.flags.hidden);
            self.units.insert(unit_id, UnitSlot { group: id, index });
            self.spatial.insert(cell, unit_id);
            if let Some(flag) = def.cell_flag {
                if self.cells.reserve(cell, flag) {
                    self.host.set_cell_flag(cell, flag, true);
                }
            }
            self.host.notify(UnitNotice::Appeared {
                unit: unit_id,
                group: id,
                kind: def.id,
                cell,
                audience,
            });
            placed.push((unit_id, cell));
        }

        if placed.is_empty() {
            self.tear_down(id, TeardownReason::Rejected);
            self.end_pass();
            debug!(kind = %def.id, caster = caster.id.0, cells = offsets.len(), "placement rejected");
            return Err(EffectError::PlacementRejected {
                kind: def.id,
                cells: offsets.len(),
                refund_ammo: def.flags.ammo_consume,
            });
        }

        if let Some(status) = def.caster_status {
            self.host.apply_status(
                caster.id,
                StatusGrant {
                    status,
                    level: request.level,
                    duration: limit,
                    source: id,
                    caster: caster.id,
                },
            );
        }
        info!(
            group = id.0,
            kind = %def.id,
            caster = caster.id.0,
            level = request.level,
            units = placed.len(),
            of = offsets.len(),
            "effect group placed"
        );

        for (_, cell) in &placed {
            self.refresh_dissonance(*cell, now);
        }
        for (unit, cell) in &placed {
            self.admit_standing(*unit, *cell, now);
        }
        self.end_pass();
        Ok(id)
    }

    fn judge_cell(&self, def: &KindDef, level: u16, group: GroupId, cell: Cell) -> CellVerdict {
        match self.host.terrain(cell) {
            Terrain::OutOfBounds => return CellVerdict::Rejected("out of bounds"),
            Terrain::Blocked if def.flags.walkable_only && !def.flags.follows_caster => {
                return CellVerdict::Rejected("not walkable")
            }
            _ => {}
        }
        if def.flags.walkable_only && !def.flags.follows_caster && self.cells.flags(cell).impassable {
            return CellVerdict::Rejected("cell reserved impassable");
        }
        let mut cancel = Vec::new();
        for existing in self.spatial.units_at(cell) {
            let Some(slot) = self.units.get(&existing) else {
                continue;
            };
            if slot.group == group {
                continue;
            }
            let Some(other) = self.groups.get(&slot.group).filter(|other| other.is_live()) else {
                continue;
            };
            let Some(other_def) = self.kinds.def(other.kind) else {
                continue;
            };
            match self.overlap.resolve(def, level, &other_def, other.level) {
                OverlapAction::RejectNew => return CellVerdict::Rejected("overlap"),
                OverlapAction::CancelExisting => cancel.push(existing),
                OverlapAction::Coexist => {}
            }
        }
        CellVerdict::Usable { cancel }
    }

    /// Group ids wrap and probe for a free slot. A saturated space evicts the
    /// oldest live group, frees it even inside an open pass, and tries once
    /// more.
    fn allocate_group_id(&mut self) -> Result<GroupId, EffectError> {
        if let Some(id) = self.probe_group_id() {
            return Ok(id);
        }
        let oldest = self
            .order
            .iter()
            .copied()
            .find(|id| self.group_is_live(*id));
        let Some(oldest) = oldest else {
            warn!(capacity = self.group_ids.capacity(), "group id space exhausted");
            return Err(EffectError::CapacityExhausted("group ids"));
        };
        warn!(
            capacity = self.group_ids.capacity(),
            group = oldest.0,
            "group id space exhausted, evicting oldest group"
        );
        self.tear_down(oldest, TeardownReason::Evicted);
        self.free_now(oldest);
        self.probe_group_id()
            .ok_or(EffectError::CapacityExhausted("group ids"))
    }

    fn probe_group_id(&mut self) -> Option<GroupId> {
        let groups = &self.groups;
        self.group_ids
            .allocate(|id| groups.contains_key(&GroupId(id)))
            .map(GroupId)
    }
}
