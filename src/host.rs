//! The engine's view of the rest of the server.
//!
//! Everything here is a synchronous, non-blocking call into a collaborator:
//! the actor subsystem (positions, affiliations), the status subsystem, the
//! combat pipeline, the map (terrain and cell flags), item drops and the
//! presentation layer.

use crate::combat::rules::Side;
use crate::effects::ids::{EffectKind, GroupId, ItemId, StatusId, UnitId};
use crate::entities::actor::{ActorId, ActorInfo};
use crate::world::cells::CellFlag;
use crate::world::position::{Cell, CellDelta};
use crate::world::time::GameTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    OutOfBounds,
    Walkable,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusGrant {
    pub status: StatusId,
    pub level: u16,
    pub duration: u64,
    pub source: GroupId,
    pub caster: ActorId,
}

/// A request for the combat pipeline to resolve one hit of a ground effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub group: GroupId,
    pub unit: UnitId,
    pub kind: EffectKind,
    pub level: u16,
    pub caster: ActorId,
    pub target: ActorId,
    pub tick: GameTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    /// Hidden units: only the owner and their allies see them.
    AlliesOf(Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitNotice {
    Appeared {
        unit: UnitId,
        group: GroupId,
        kind: EffectKind,
        cell: Cell,
        audience: Audience,
    },
    Changed {
        unit: UnitId,
        kind: EffectKind,
        cell: Cell,
        audience: Audience,
    },
    Disappeared {
        unit: UnitId,
        cell: Cell,
        expired: bool,
    },
}

pub trait Host {
    fn actor(&self, id: ActorId) -> Option<ActorInfo>;

    fn actors_at(&self, cell: Cell) -> Vec<ActorId>;

    /// Actors within a square of the given radius around `center`.
    fn actors_near(&self, center: Cell, range: u16) -> Vec<ActorId> {
        let radius = i16::try_from(range).unwrap_or(i16::MAX);
        let mut found = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let Some(cell) = center.offset(CellDelta { dx, dy }) else {
                    continue;
                };
                for actor in self.actors_at(cell) {
                    if !found.contains(&actor) {
                        found.push(actor);
                    }
                }
            }
        }
        found
    }

    fn terrain(&self, cell: Cell) -> Terrain;

    /// Called when a cell flag actually changes state.
    fn set_cell_flag(&mut self, cell: Cell, flag: CellFlag, on: bool);

    fn apply_status(&mut self, target: ActorId, grant: StatusGrant);

    fn revoke_status(&mut self, target: ActorId, status: StatusId, source: GroupId);

    fn has_status(&self, actor: ActorId, status: StatusId) -> bool;

    fn strike(&mut self, strike: Strike);

    fn drop_item(&mut self, cell: Cell, item: ItemId, amount: u16);

    fn notify(&mut self, notice: UnitNotice);
}
