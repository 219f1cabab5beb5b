use std::path::PathBuf;

use thiserror::Error;

use crate::effects::ids::{EffectKind, GroupId, UnitId};
use crate::entities::actor::ActorId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EffectError {
    #[error("unknown effect kind {0}")]
    UnknownKind(EffectKind),
    #[error("unknown actor {0:?}")]
    UnknownActor(ActorId),
    /// No layout cell survived terrain and overlap checks. Callers refund
    /// whatever the cast consumed; `refund_ammo` is set for kinds that use
    /// up ammunition when cast.
    #[error("placement of {kind} rejected: 0 of {cells} cells usable")]
    PlacementRejected {
        kind: EffectKind,
        cells: usize,
        refund_ammo: bool,
    },
    #[error("capacity exhausted: {0}")]
    CapacityExhausted(&'static str),
    #[error("effect group {0:?} not found")]
    GroupNotFound(GroupId),
    #[error("effect unit {0:?} not found")]
    UnitNotFound(UnitId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
