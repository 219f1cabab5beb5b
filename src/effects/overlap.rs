use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::ids::EffectKind;
use crate::effects::kinds::{KindDef, OverlapClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapAction {
    RejectNew,
    CancelExisting,
    Coexist,
}

/// One explicit exception for an (incoming, existing) kind pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRule {
    pub incoming: EffectKind,
    pub existing: EffectKind,
    pub action: OverlapAction,
    #[serde(default)]
    pub min_incoming_level: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlapPolicy {
    rules: HashMap<(EffectKind, EffectKind), Vec<OverlapRule>>,
}

impl OverlapPolicy {
    pub fn new(rules: impl IntoIterator<Item = OverlapRule>) -> Self {
        let mut policy = Self::default();
        for rule in rules {
            policy
                .rules
                .entry((rule.incoming, rule.existing))
                .or_default()
                .push(rule);
        }
        policy
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Explicit rules first (first matching level wins), then the class
    /// defaults, then coexist.
    pub fn resolve(
        &self,
        incoming: &KindDef,
        incoming_level: u16,
        existing: &KindDef,
        existing_level: u16,
    ) -> OverlapAction {
        if let Some(rules) = self.rules.get(&(incoming.id, existing.id)) {
            for rule in rules {
                if rule
                    .min_incoming_level
                    .map_or(true, |min| incoming_level >= min)
                {
                    debug!(
                        incoming = %incoming.id,
                        existing = %existing.id,
                        existing_level,
                        action = ?rule.action,
                        "overlap rule matched"
                    );
                    return rule.action;
                }
            }
        }
        class_default(incoming, existing)
    }
}

fn class_default(incoming: &KindDef, existing: &KindDef) -> OverlapAction {
    let same_kind = incoming.id == existing.id;
    if same_kind && incoming.flags.no_reiteration {
        return OverlapAction::RejectNew;
    }
    match (incoming.overlap, existing.overlap) {
        (OverlapClass::ExclusiveZone, OverlapClass::ExclusiveZone)
            if incoming.zone_tag() == existing.zone_tag() =>
        {
            OverlapAction::CancelExisting
        }
        (OverlapClass::SelfExclusive, _) | (OverlapClass::Trap, _) if same_kind => {
            OverlapAction::RejectNew
        }
        _ => OverlapAction::Coexist,
    }
}
