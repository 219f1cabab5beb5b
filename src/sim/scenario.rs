use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::effects::engine::Engine;
use crate::effects::ids::EffectKind;
use crate::effects::movement::RemovalReason;
use crate::effects::placement::PlaceRequest;
use crate::entities::actor::{ActorId, ActorInfo, ActorKind, Affiliation};
use crate::error::{ConfigError, EffectError};
use crate::host::Host;
use crate::sim::host::{HostEvent, SimHost};
use crate::world::position::{Cell, Direction, MapId};
use crate::world::time::{GameClock, GameTick};

#[derive(Debug, Clone, Deserialize)]
pub struct MapSpec {
    pub id: MapId,
    pub width: u16,
    pub height: u16,
    #[serde(default)]
    pub blocked: Vec<(u16, u16)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorSpec {
    pub id: ActorId,
    pub kind: ActorKind,
    pub map: MapId,
    pub x: u16,
    pub y: u16,
    #[serde(flatten)]
    pub affiliation: Affiliation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    Place {
        caster: ActorId,
        kind: EffectKind,
        #[serde(default = "default_level")]
        level: u16,
        x: u16,
        y: u16,
        #[serde(default = "default_facing")]
        facing: Direction,
    },
    Move {
        actor: ActorId,
        x: u16,
        y: u16,
    },
    /// Cancels every group the caster owns, or only those of `kind`.
    Cancel {
        caster: ActorId,
        #[serde(default)]
        kind: Option<EffectKind>,
    },
    Damage {
        map: MapId,
        x: u16,
        y: u16,
        amount: i32,
    },
    Remove {
        actor: ActorId,
        reason: RemovalReason,
    },
    Arrive {
        actor: ActorId,
        map: MapId,
        x: u16,
        y: u16,
    },
}

fn default_level() -> u16 {
    1
}

fn default_facing() -> Direction {
    Direction::South
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioEvent {
    pub at: u64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    pub maps: Vec<MapSpec>,
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

fn default_ticks() -> u64 {
    100
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioSummary {
    pub ticks: u64,
    pub placed: usize,
    pub rejected: usize,
    pub ammo_refunded: usize,
    pub strikes: usize,
    pub statuses_applied: usize,
    pub units_expired: usize,
    pub live_groups: usize,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build_host(&self) -> SimHost {
        let mut host = SimHost::new();
        for map in &self.maps {
            host.add_map(map.id, map.width, map.height);
            for (x, y) in &map.blocked {
                host.block(Cell::new(map.id, *x, *y));
            }
        }
        for actor in &self.actors {
            host.add_actor(ActorInfo {
                id: actor.id,
                kind: actor.kind,
                cell: Cell::new(actor.map, actor.x, actor.y),
                affiliation: actor.affiliation,
                alive: true,
                hidden: false,
            });
        }
        host
    }

    /// Drives the scenario on a fixed-tick clock: due events first, then one
    /// scheduler pass per tick.
    pub fn run(&self, config: &EngineConfig, ticks: Option<u64>) -> Result<ScenarioSummary, ConfigError> {
        let ticks = ticks.unwrap_or(self.ticks);
        let mut engine = Engine::new(config, self.build_host())?;
        let mut clock = GameClock::new(Duration::from_millis(config.tick_interval_ms));
        let mut summary = ScenarioSummary {
            ticks,
            ..ScenarioSummary::default()
        };
        let mut events: Vec<&ScenarioEvent> = self.events.iter().collect();
        events.sort_by_key(|event| event.at);
        let mut next = 0;
        let mut departed = HashMap::new();

        for _ in 0..ticks {
            let now = clock.now();
            while next < events.len() && events[next].at <= now.0 {
                apply(&mut engine, &events[next].action, now, &mut summary, &mut departed);
                next += 1;
            }
            let report = engine.run_tick(now);
            summary.units_expired += report.expired;
            clock.advance(1);
        }

        for event in engine.host_mut().take_events() {
            match event {
                HostEvent::Struck(_) => summary.strikes += 1,
                HostEvent::StatusApplied { .. } => summary.statuses_applied += 1,
                _ => {}
            }
        }
        summary.live_groups = engine.live_group_count();
        info!(
            ticks,
            simulated = ?clock.duration_for_ticks(ticks),
            placed = summary.placed,
            rejected = summary.rejected,
            ammo_refunded = summary.ammo_refunded,
            strikes = summary.strikes,
            statuses = summary.statuses_applied,
            expired = summary.units_expired,
            live_groups = summary.live_groups,
            "scenario finished"
        );
        engine.shutdown();
        Ok(summary)
    }
}

/// Actors that left their map wait in `departed` until they arrive.
fn apply(
    engine: &mut Engine<SimHost>,
    action: &ScenarioAction,
    now: GameTick,
    summary: &mut ScenarioSummary,
    departed: &mut HashMap<ActorId, ActorInfo>,
) {
    match *action {
        ScenarioAction::Place {
            caster,
            kind,
            level,
            x,
            y,
            facing,
        } => {
            let Some(map) = engine.host().actor(caster).map(|info| info.cell.map) else {
                warn!(caster = caster.0, "scenario caster does not exist");
                summary.rejected += 1;
                return;
            };
            let request = PlaceRequest::new(caster, kind, level, Cell::new(map, x, y)).facing(facing);
            match engine.place(request, now) {
                Ok(_) => summary.placed += 1,
                Err(EffectError::PlacementRejected { kind, refund_ammo: true, .. }) => {
                    debug!(%kind, "scenario placement rejected, ammo refunded");
                    summary.rejected += 1;
                    summary.ammo_refunded += 1;
                }
                Err(err) => {
                    debug!(%err, "scenario placement failed");
                    summary.rejected += 1;
                }
            }
        }
        ScenarioAction::Move { actor, x, y } => {
            let Some(old) = engine.host().actor(actor).map(|info| info.cell) else {
                warn!(actor = actor.0, "scenario mover does not exist");
                return;
            };
            let new = Cell::new(old.map, x, y);
            engine.host_mut().move_actor(actor, new);
            engine.on_actor_moved(actor, old, new, now);
        }
        ScenarioAction::Cancel { caster, kind } => {
            for group in engine.groups_owned_by(caster) {
                let matches = kind.map_or(true, |kind| {
                    engine.group(group).map_or(false, |current| current.kind == kind)
                });
                if matches {
                    engine.force_teardown(group);
                }
            }
        }
        ScenarioAction::Damage { map, x, y, amount } => {
            for unit in engine.units_at(Cell::new(map, x, y)) {
                if let Err(err) = engine.damage_unit(unit, amount) {
                    debug!(%err, "scenario damage skipped");
                }
            }
        }
        ScenarioAction::Remove { actor, reason } => {
            engine.on_actor_removed(actor, reason, now);
            match reason {
                RemovalReason::Death => engine.host_mut().set_alive(actor, false),
                RemovalReason::Logout => {
                    engine.host_mut().remove_actor(actor);
                }
                RemovalReason::MapChange => {
                    if let Some(info) = engine.host_mut().remove_actor(actor) {
                        departed.insert(actor, info);
                    }
                }
            }
        }
        ScenarioAction::Arrive { actor, map, x, y } => {
            let Some(mut info) = departed.remove(&actor) else {
                warn!(actor = actor.0, "arrival without a prior map change ignored");
                return;
            };
            info.cell = Cell::new(map, x, y);
            engine.host_mut().add_actor(info);
            engine.on_actor_arrived(actor, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_parse_with_action_tag() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
ticks: 5
maps: [{ id: 1, width: 8, height: 8, blocked: [[1, 1]] }]
actors:
  - { id: 1, kind: player, map: 1, x: 2, y: 2, team_id: 4 }
events:
  - { at: 0, action: place, caster: 1, kind: 3, x: 4, y: 4 }
  - { at: 2, action: move, actor: 1, x: 3, y: 2 }
  - { at: 3, action: remove, actor: 1, reason: map_change }
"#,
        )
        .expect("scenario yaml");
        assert_eq!(scenario.events.len(), 3);
        assert_eq!(scenario.actors[0].affiliation.team_id, 4);
        assert!(matches!(
            scenario.events[0].action,
            ScenarioAction::Place { level: 1, facing: Direction::South, .. }
        ));
        let host = scenario.build_host();
        assert!(host.events().is_empty());
    }
}
