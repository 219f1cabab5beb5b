use serde::{Deserialize, Serialize};

use crate::entities::actor::{ActorId, ActorInfo, ActorKind, Affiliation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRules {
    #[serde(default)]
    pub pvp_enabled: bool,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self { pvp_enabled: false }
    }
}

/// The side an effect was cast from, frozen at placement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Side {
    pub actor: ActorId,
    pub kind: ActorKind,
    pub affiliation: Affiliation,
}

impl From<&ActorInfo> for Side {
    fn from(info: &ActorInfo) -> Self {
        Self {
            actor: info.id,
            kind: info.kind,
            affiliation: info.affiliation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    SelfActor,
    Party,
    Guild,
    Ally,
    Neutral,
    Enemy,
}

impl Relation {
    pub const COUNT: usize = 6;

    pub fn mask(self) -> u8 {
        match self {
            Self::SelfActor => 1,
            Self::Party => 2,
            Self::Guild => 4,
            Self::Ally => 8,
            Self::Neutral => 16,
            Self::Enemy => 32,
        }
    }
}

/// Which relations a ground effect may act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetScope {
    Enemy,
    Friend,
    Party,
    Guild,
    SelfOnly,
    NoEnemy,
    All,
    NoOne,
}

impl TargetScope {
    pub fn mask(self) -> u8 {
        match self {
            Self::Enemy => Relation::Enemy.mask(),
            Self::Friend => {
                Relation::SelfActor.mask()
                    | Relation::Party.mask()
                    | Relation::Guild.mask()
                    | Relation::Ally.mask()
            }
            Self::Party => Relation::SelfActor.mask() | Relation::Party.mask(),
            Self::Guild => Relation::SelfActor.mask() | Relation::Guild.mask(),
            Self::SelfOnly => Relation::SelfActor.mask(),
            Self::NoEnemy => Self::All.mask() & !Relation::Enemy.mask(),
            Self::All => (1u8 << Relation::COUNT) - 1,
            Self::NoOne => 0,
        }
    }

    pub fn allows(self, relation: Relation) -> bool {
        self.mask() & relation.mask() != 0
    }
}

fn faction(kind: ActorKind) -> Option<u8> {
    match kind {
        ActorKind::Player | ActorKind::Summon => Some(0),
        ActorKind::Monster => Some(1),
        ActorKind::Npc => None,
    }
}

pub fn relation(rules: &CombatRules, source: &Side, target: &ActorInfo) -> Relation {
    if source.actor == target.id {
        return Relation::SelfActor;
    }
    let theirs = &target.affiliation;
    if source.affiliation.shares_party(theirs) {
        return Relation::Party;
    }
    if source.affiliation.shares_guild(theirs) {
        return Relation::Guild;
    }
    if source.affiliation.shares_team(theirs) {
        return Relation::Ally;
    }
    if source.affiliation.team_id != 0 && theirs.team_id != 0 {
        return Relation::Enemy;
    }
    match (faction(source.kind), faction(target.kind)) {
        (Some(a), Some(b)) if a != b => Relation::Enemy,
        (Some(1), Some(1)) => Relation::Ally,
        (Some(_), Some(_)) if rules.pvp_enabled => Relation::Enemy,
        _ => Relation::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::position::{Cell, MapId};

    fn actor(id: u32, kind: ActorKind, affiliation: Affiliation) -> ActorInfo {
        ActorInfo {
            id: ActorId(id),
            kind,
            cell: Cell::new(MapId(1), 0, 0),
            affiliation,
            alive: true,
            hidden: false,
        }
    }

    #[test]
    fn shared_team_is_ally_and_not_enemy() {
        let rules = CombatRules::default();
        let caster = actor(1, ActorKind::Player, Affiliation { team_id: 7, ..Affiliation::NONE });
        let mate = actor(2, ActorKind::Player, Affiliation { team_id: 7, ..Affiliation::NONE });
        let side = Side::from(&caster);
        assert_eq!(relation(&rules, &side, &mate), Relation::Ally);
        assert!(!TargetScope::Enemy.allows(Relation::Ally));
        assert!(TargetScope::Friend.allows(Relation::Ally));
        assert_eq!(relation(&rules, &side, &caster), Relation::SelfActor);
    }

    #[test]
    fn monsters_are_enemies_of_players() {
        let rules = CombatRules::default();
        let caster = Side::from(&actor(1, ActorKind::Player, Affiliation::NONE));
        let mob = actor(9, ActorKind::Monster, Affiliation::NONE);
        let stranger = actor(3, ActorKind::Player, Affiliation::NONE);
        assert_eq!(relation(&rules, &caster, &mob), Relation::Enemy);
        assert_eq!(relation(&rules, &caster, &stranger), Relation::Neutral);

        let pvp = CombatRules { pvp_enabled: true };
        assert_eq!(relation(&pvp, &caster, &stranger), Relation::Enemy);
    }

    #[test]
    fn scope_masks() {
        assert!(TargetScope::All.allows(Relation::Neutral));
        assert!(TargetScope::NoEnemy.allows(Relation::Neutral));
        assert!(!TargetScope::NoEnemy.allows(Relation::Enemy));
        assert!(!TargetScope::NoOne.allows(Relation::SelfActor));
        assert!(TargetScope::Party.allows(Relation::SelfActor));
    }
}
