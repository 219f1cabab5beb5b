#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ground_effects::effects::behavior::{EffectBehavior, HookCtx};
use ground_effects::effects::ids::{EffectKind, GroupId};
use ground_effects::entities::actor::{ActorId, ActorInfo, ActorKind, Affiliation};
use ground_effects::sim::SimHost;
use ground_effects::world::position::{Cell, MapId};
use ground_effects::world::time::GameTick;
use ground_effects::{Engine, EngineConfig};

pub const MAP: MapId = MapId(1);

pub fn cell(x: u16, y: u16) -> Cell {
    Cell::new(MAP, x, y)
}

pub fn config(yaml: &str) -> EngineConfig {
    serde_yaml::from_str(yaml).expect("engine config yaml")
}

pub fn engine(yaml: &str) -> Engine<SimHost> {
    engine_with(config(yaml))
}

pub fn engine_with(config: EngineConfig) -> Engine<SimHost> {
    let mut host = SimHost::new();
    host.add_map(MAP, 64, 64);
    Engine::new(&config, host).expect("valid engine config")
}

pub fn actor(id: u32, kind: ActorKind, x: u16, y: u16, team_id: u32) -> ActorInfo {
    ActorInfo {
        id: ActorId(id),
        kind,
        cell: cell(x, y),
        affiliation: Affiliation {
            team_id,
            ..Affiliation::NONE
        },
        alive: true,
        hidden: false,
    }
}

pub fn spawn(engine: &mut Engine<SimHost>, info: ActorInfo) {
    engine.host_mut().add_actor(info);
}

/// Commits the move in the host, then tells the engine.
pub fn walk(engine: &mut Engine<SimHost>, id: u32, x: u16, y: u16, tick: u64) {
    let actor = ActorId(id);
    let old = engine
        .host_mut()
        .move_actor(actor, cell(x, y))
        .expect("actor exists");
    engine.on_actor_moved(actor, old, cell(x, y), GameTick(tick));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Place,
    Out,
    Left,
    Tick,
}

/// Records every transition hook it sees, keyed by actor and group.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<(Hook, ActorId, GroupId, EffectKind)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, engine: &mut Engine<SimHost>, kinds: &[u16]) {
        for kind in kinds {
            engine.register_behavior(EffectKind(*kind), Arc::new(self.clone()));
        }
    }

    fn push(&self, hook: Hook, ctx: &HookCtx<'_>, actor: ActorId) {
        self.log
            .lock()
            .expect("recorder lock")
            .push((hook, actor, ctx.group.id, ctx.group.kind));
    }

    pub fn entries(&self) -> Vec<(Hook, ActorId, GroupId, EffectKind)> {
        self.log.lock().expect("recorder lock").clone()
    }

    pub fn count(&self, hook: Hook, actor: ActorId, group: GroupId) -> usize {
        self.entries()
            .iter()
            .filter(|(seen, who, which, _)| *seen == hook && *who == actor && *which == group)
            .count()
    }

    /// place minus out for every (actor, group) pair seen so far.
    pub fn balances(&self) -> HashMap<(ActorId, GroupId), i64> {
        let mut balances = HashMap::new();
        for (hook, actor, group, _) in self.entries() {
            let entry = balances.entry((actor, group)).or_insert(0i64);
            match hook {
                Hook::Place => *entry += 1,
                Hook::Out => *entry -= 1,
                Hook::Left | Hook::Tick => {}
            }
        }
        balances
    }
}

impl EffectBehavior for Recorder {
    fn on_place(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        self.push(Hook::Place, ctx, target);
    }

    fn on_out(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        self.push(Hook::Out, ctx, target);
    }

    fn on_left(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        self.push(Hook::Left, ctx, target);
    }

    fn on_tick(&self, ctx: &mut HookCtx<'_>, target: ActorId) {
        self.push(Hook::Tick, ctx, target);
    }
}
