use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::combat::rules::TargetScope;
use crate::effects::behavior::{self, EffectBehavior};
use crate::effects::ids::{EffectKind, ItemId, StatusId};
use crate::world::area;
use crate::world::cells::CellFlag;
use crate::world::position::{CellDelta, Direction};

/// 15x15, the largest square a layout may cover.
pub const MAX_LAYOUT_CELLS: usize = 225;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Layout {
    Square { radius: u8 },
    Circle { radius: u8 },
    /// Perpendicular to the caster's facing.
    Wall { half_length: u8 },
    Cells { cells: Vec<(i16, i16)> },
}

impl Layout {
    pub fn offsets(&self, facing: Direction) -> Vec<CellDelta> {
        match self {
            Layout::Square { radius } => area::square_offsets(*radius),
            Layout::Circle { radius } => area::circle_offsets(*radius),
            Layout::Wall { half_length } => area::wall_offsets(facing, *half_length),
            Layout::Cells { cells } => area::explicit_offsets(cells),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindFlags {
    /// A second instance of the same kind can never share a cell.
    pub no_reiteration: bool,
    /// Tick hits are rate-limited per kind rather than per group.
    pub no_overlap: bool,
    pub walkable_only: bool,
    /// Rides along with the caster; exempt from terrain checks.
    pub follows_caster: bool,
    pub song: bool,
    pub dance: bool,
    /// Strikes on entry as well as on the interval.
    pub dual_mode: bool,
    pub hidden: bool,
    /// Casting uses up ammunition, which a rejected placement hands back.
    pub ammo_consume: bool,
    pub no_players: bool,
    pub no_monsters: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    StatusZone,
    PeriodicStrike,
    Trap,
    Obstacle,
    #[default]
    #[serde(other)]
    Inert,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapClass {
    #[default]
    None,
    SelfExclusive,
    /// One per cell among kinds sharing the same zone tag.
    ExclusiveZone,
    Trap,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSpec {
    pub id: StatusId,
    /// Ticks; the group's remaining lifetime when absent.
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform {
    pub kind: EffectKind,
    pub lifetime: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item: ItemId,
    #[serde(default = "default_amount")]
    pub amount: u16,
}

fn default_amount() -> u16 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renewal {
    /// Caster status that keeps the effect alive.
    pub while_status: StatusId,
    pub extend_by: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDef {
    pub id: EffectKind,
    pub name: String,
    #[serde(default)]
    pub family: Family,
    /// Indexed by level - 1; the last entry covers higher levels.
    pub layouts: Vec<Layout>,
    pub lifetimes: Vec<u64>,
    #[serde(default)]
    pub ranges: Vec<i16>,
    #[serde(default)]
    pub interval: Option<u64>,
    pub target: TargetScope,
    #[serde(default)]
    pub flags: KindFlags,
    #[serde(default)]
    pub overlap: OverlapClass,
    #[serde(default)]
    pub zone_tag: Option<String>,
    #[serde(default)]
    pub cell_flag: Option<CellFlag>,
    #[serde(default)]
    pub status: Option<StatusSpec>,
    #[serde(default)]
    pub caster_status: Option<StatusId>,
    #[serde(default)]
    pub hit_points: Option<i32>,
    #[serde(default)]
    pub decay: i32,
    #[serde(default)]
    pub hits: Option<i32>,
    #[serde(default)]
    pub trigger_into: Option<Transform>,
    #[serde(default)]
    pub expire_into: Option<Transform>,
    #[serde(default)]
    pub recover_item: Option<ItemDrop>,
    #[serde(default)]
    pub renewal: Option<Renewal>,
    #[serde(default)]
    pub persist_on_transfer: bool,
}

fn per_level<T: Copy>(values: &[T], level: u16) -> Option<T> {
    let index = usize::from(level.max(1) - 1).min(values.len().checked_sub(1)?);
    values.get(index).copied()
}

impl KindDef {
    pub fn layout(&self, level: u16) -> Option<&Layout> {
        let last = self.layouts.len().checked_sub(1)?;
        self.layouts.get(usize::from(level.max(1) - 1).min(last))
    }

    pub fn lifetime(&self, level: u16) -> u64 {
        per_level(&self.lifetimes, level).unwrap_or(0)
    }

    pub fn range(&self, level: u16) -> i16 {
        per_level(&self.ranges, level).unwrap_or(0)
    }

    pub fn zone_tag(&self) -> &str {
        self.zone_tag.as_deref().unwrap_or("")
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Performance {
    Song,
    Dance,
}

/// Kind definitions and the behavior registered for each kind.
#[derive(Clone, Default)]
pub struct KindTable {
    defs: HashMap<EffectKind, Arc<KindDef>>,
    behaviors: HashMap<EffectKind, Arc<dyn EffectBehavior>>,
}

impl std::fmt::Debug for KindTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindTable")
            .field("kinds", &self.defs.len())
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}

impl KindTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defs(defs: impl IntoIterator<Item = KindDef>) -> Self {
        let mut table = Self::new();
        for def in defs {
            table.insert(def);
        }
        table
    }

    /// Adds a kind with the stock behavior of its family.
    pub fn insert(&mut self, def: KindDef) {
        let id = def.id;
        self.behaviors.insert(id, behavior::for_family(def.family));
        self.defs.insert(id, Arc::new(def));
    }

    pub fn register(&mut self, kind: EffectKind, behavior: Arc<dyn EffectBehavior>) {
        self.behaviors.insert(kind, behavior);
    }

    pub fn def(&self, kind: EffectKind) -> Option<Arc<KindDef>> {
        self.defs.get(&kind).cloned()
    }

    pub fn behavior(&self, kind: EffectKind) -> Arc<dyn EffectBehavior> {
        self.behaviors
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| behavior::for_family(Family::Inert))
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.defs.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
