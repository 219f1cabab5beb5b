//! In-memory stand-in for the rest of the server: maps with bounds and
//! blocked cells, a flat actor table, a status table and an event log of
//! every outbound call the engine made.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::effects::ids::{GroupId, ItemId, StatusId};
use crate::entities::actor::{ActorId, ActorInfo};
use crate::host::{Host, StatusGrant, Strike, Terrain, UnitNotice};
use crate::world::cells::CellFlag;
use crate::world::position::{Cell, MapId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    StatusApplied { target: ActorId, grant: StatusGrant },
    StatusRevoked { target: ActorId, status: StatusId, source: GroupId },
    CellFlag { cell: Cell, flag: CellFlag, on: bool },
    Struck(Strike),
    ItemDropped { cell: Cell, item: ItemId, amount: u16 },
    Notice(UnitNotice),
}

#[derive(Debug, Clone)]
struct SimMap {
    width: u16,
    height: u16,
    blocked: HashSet<(u16, u16)>,
}

#[derive(Debug, Default)]
pub struct SimHost {
    maps: HashMap<MapId, SimMap>,
    actors: BTreeMap<ActorId, ActorInfo>,
    statuses: HashMap<(ActorId, StatusId), Vec<GroupId>>,
    /// Statuses granted from outside the engine, e.g. a caster buff.
    innate: HashSet<(ActorId, StatusId)>,
    events: Vec<HostEvent>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_map(&mut self, id: MapId, width: u16, height: u16) {
        self.maps.insert(
            id,
            SimMap {
                width,
                height,
                blocked: HashSet::new(),
            },
        );
    }

    pub fn block(&mut self, cell: Cell) {
        if let Some(map) = self.maps.get_mut(&cell.map) {
            map.blocked.insert((cell.x, cell.y));
        }
    }

    pub fn add_actor(&mut self, info: ActorInfo) {
        self.actors.insert(info.id, info);
    }

    /// Commits a new position and returns the previous one.
    pub fn move_actor(&mut self, id: ActorId, cell: Cell) -> Option<Cell> {
        let actor = self.actors.get_mut(&id)?;
        let old = actor.cell;
        actor.cell = cell;
        Some(old)
    }

    pub fn remove_actor(&mut self, id: ActorId) -> Option<ActorInfo> {
        self.actors.remove(&id)
    }

    pub fn set_alive(&mut self, id: ActorId, alive: bool) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.alive = alive;
        }
    }

    pub fn grant_innate(&mut self, actor: ActorId, status: StatusId) {
        self.innate.insert((actor, status));
    }

    pub fn clear_innate(&mut self, actor: ActorId, status: StatusId) {
        self.innate.remove(&(actor, status));
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn strikes_on(&self, target: ActorId) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, HostEvent::Struck(strike) if strike.target == target))
            .count()
    }

    pub fn notices(&self) -> impl Iterator<Item = &UnitNotice> {
        self.events.iter().filter_map(|event| match event {
            HostEvent::Notice(notice) => Some(notice),
            _ => None,
        })
    }
}

impl Host for SimHost {
    fn actor(&self, id: ActorId) -> Option<ActorInfo> {
        self.actors.get(&id).copied()
    }

    fn actors_at(&self, cell: Cell) -> Vec<ActorId> {
        self.actors
            .values()
            .filter(|actor| actor.cell == cell)
            .map(|actor| actor.id)
            .collect()
    }

    fn terrain(&self, cell: Cell) -> Terrain {
        let Some(map) = self.maps.get(&cell.map) else {
            return Terrain::OutOfBounds;
        };
        if cell.x >= map.width || cell.y >= map.height {
            return Terrain::OutOfBounds;
        }
        if map.blocked.contains(&(cell.x, cell.y)) {
            Terrain::Blocked
        } else {
            Terrain::Walkable
        }
    }

    fn set_cell_flag(&mut self, cell: Cell, flag: CellFlag, on: bool) {
        self.events.push(HostEvent::CellFlag { cell, flag, on });
    }

    fn apply_status(&mut self, target: ActorId, grant: StatusGrant) {
        let sources = self.statuses.entry((target, grant.status)).or_default();
        if !sources.contains(&grant.source) {
            sources.push(grant.source);
        }
        self.events.push(HostEvent::StatusApplied { target, grant });
    }

    fn revoke_status(&mut self, target: ActorId, status: StatusId, source: GroupId) {
        if let Some(sources) = self.statuses.get_mut(&(target, status)) {
            sources.retain(|candidate| *candidate != source);
            if sources.is_empty() {
                self.statuses.remove(&(target, status));
            }
        }
        self.events.push(HostEvent::StatusRevoked {
            target,
            status,
            source,
        });
    }

    fn has_status(&self, actor: ActorId, status: StatusId) -> bool {
        self.innate.contains(&(actor, status)) || self.statuses.contains_key(&(actor, status))
    }

    fn strike(&mut self, strike: Strike) {
        self.events.push(HostEvent::Struck(strike));
    }

    fn drop_item(&mut self, cell: Cell, item: ItemId, amount: u16) {
        self.events.push(HostEvent::ItemDropped { cell, item, amount });
    }

    fn notify(&mut self, notice: UnitNotice) {
        self.events.push(HostEvent::Notice(notice));
    }
}
