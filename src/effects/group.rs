use crate::combat::rules::{Side, TargetScope};
use crate::effects::ids::{EffectKind, GroupId};
use crate::effects::kinds::{KindDef, KindFlags, Performance};
use crate::effects::unit::EffectUnit;
use crate::world::cells::CellFlag;
use crate::world::position::MapId;
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Active,
    Expiring,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Ran out of units through expiry, hits or destruction.
    Depleted,
    Cancelled,
    /// Made room for a newer group of the same caster.
    Evicted,
    /// No layout cell survived placement.
    Rejected,
    Linked,
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct EffectGroup {
    pub id: GroupId,
    pub kind: EffectKind,
    pub level: u16,
    pub owner: Side,
    pub map: MapId,
    pub tick: GameTick,
    /// Lifetime in ticks from `tick`.
    pub limit: u64,
    pub interval: Option<u64>,
    pub target: TargetScope,
    pub flags: KindFlags,
    pub cell_flag: Option<CellFlag>,
    pub link: Option<GroupId>,
    pub units: Vec<EffectUnit>,
    alive_count: usize,
    state: GroupState,
    in_teardown: bool,
}

impl EffectGroup {
    pub fn new(id: GroupId, def: &KindDef, level: u16, owner: Side, map: MapId, tick: GameTick) -> Self {
        Self {
            id,
            kind: def.id,
            level,
            owner,
            map,
            tick,
            limit: def.lifetime(level),
            interval: def.interval,
            target: def.target,
            flags: def.flags,
            cell_flag: def.cell_flag,
            link: None,
            units: Vec::new(),
            alive_count: 0,
            state: GroupState::Active,
            in_teardown: false,
        }
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    /// Still addressable: not removed and not part-way through teardown.
    pub fn is_live(&self) -> bool {
        self.state != GroupState::Removed && !self.in_teardown
    }

    pub fn elapsed(&self, now: GameTick) -> u64 {
        now.since(self.tick)
    }

    pub fn is_expired(&self, unit: &EffectUnit, now: GameTick) -> bool {
        let elapsed = self.elapsed(now);
        elapsed >= self.limit || elapsed >= unit.limit
    }

    pub fn performance(&self) -> Option<Performance> {
        if self.flags.song {
            Some(Performance::Song)
        } else if self.flags.dance {
            Some(Performance::Dance)
        } else {
            None
        }
    }

    pub fn add_unit(&mut self, unit: EffectUnit) -> usize {
        if unit.alive {
            self.alive_count += 1;
        }
        self.units.push(unit);
        self.units.len() - 1
    }

    /// Marks a unit dead. Returns false if it already was.
    pub fn kill_unit(&mut self, index: usize) -> bool {
        let Some(unit) = self.units.get_mut(index) else {
            return false;
        };
        if !unit.alive {
            return false;
        }
        unit.alive = false;
        self.alive_count -= 1;
        true
    }

    pub fn live_units(&self) -> impl Iterator<Item = &EffectUnit> {
        self.units.iter().filter(|unit| unit.alive)
    }

    pub(crate) fn set_state(&mut self, state: GroupState) {
        if self.state != GroupState::Removed {
            self.state = state;
        }
    }

    /// Returns false when teardown already began.
    pub(crate) fn begin_teardown(&mut self) -> bool {
        if self.in_teardown || self.state == GroupState::Removed {
            return false;
        }
        self.in_teardown = true;
        true
    }

    pub(crate) fn finish_teardown(&mut self) {
        self.state = GroupState::Removed;
    }
}
