use serde::{Deserialize, Serialize};

use crate::world::position::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Player,
    Npc,
    Monster,
    Summon,
}

/// Party, guild and ally-team ids; zero means "none".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Affiliation {
    #[serde(default)]
    pub party_id: u32,
    #[serde(default)]
    pub guild_id: u32,
    #[serde(default)]
    pub team_id: u32,
}

impl Affiliation {
    pub const NONE: Self = Self {
        party_id: 0,
        guild_id: 0,
        team_id: 0,
    };

    pub fn shares_party(&self, other: &Affiliation) -> bool {
        self.party_id != 0 && self.party_id == other.party_id
    }

    pub fn shares_guild(&self, other: &Affiliation) -> bool {
        self.guild_id != 0 && self.guild_id == other.guild_id
    }

    pub fn shares_team(&self, other: &Affiliation) -> bool {
        self.team_id != 0 && self.team_id == other.team_id
    }
}

/// What the engine needs to know about an actor, as reported by the actor
/// subsystem at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorInfo {
    pub id: ActorId,
    pub kind: ActorKind,
    pub cell: Cell,
    pub affiliation: Affiliation,
    pub alive: bool,
    pub hidden: bool,
}

impl ActorInfo {
    /// Whether ground effects may touch this actor at all.
    pub fn is_targetable(&self) -> bool {
        self.alive && self.kind != ActorKind::Npc
    }
}
