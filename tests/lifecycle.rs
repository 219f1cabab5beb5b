mod common;

use std::sync::Arc;

use common::{actor, cell, config, engine, engine_with, spawn, walk, Hook, Recorder};
use ground_effects::effects::behavior::{EffectBehavior, HookCtx};
use ground_effects::effects::ids::{EffectKind, GroupId, ItemId, StatusId};
use ground_effects::entities::actor::{ActorId, ActorKind};
use ground_effects::host::{Audience, UnitNotice};
use ground_effects::sim::{HostEvent, SimHost};
use ground_effects::world::position::{Cell, MapId};
use ground_effects::world::time::GameTick;
use ground_effects::{EffectError, Engine, PlaceRequest, RemovalReason};

const KINDS: &str = r#"
kinds:
  - { id: 10, name: barrier, family: obstacle, layouts: [{ shape: wall, half_length: 1 }], lifetimes: [100], target: no_one, cell_flag: impassable, hit_points: 100, flags: { walkable_only: true, ammo_consume: true } }
  - { id: 11, name: snare, family: trap, layouts: [{ shape: square, radius: 0 }], lifetimes: [30], interval: 1, target: enemy, overlap: trap, status: { id: 20, duration: 4 }, trigger_into: { kind: 12, lifetime: 5 }, recover_item: { item: 1065 }, flags: { hidden: true } }
  - { id: 12, name: spent_snare, layouts: [{ shape: square, radius: 0 }], lifetimes: [5], target: no_one }
  - { id: 13, name: pulse, family: periodic_strike, layouts: [{ shape: square, radius: 0 }], lifetimes: [40], interval: 3, target: enemy }
  - { id: 14, name: bonfire, family: status_zone, layouts: [{ shape: square, radius: 0 }], lifetimes: [10], target: all, status: { id: 60 }, renewal: { while_status: 61, extend_by: 10 } }
  - { id: 15, name: aura, family: status_zone, layouts: [{ shape: square, radius: 1 }], lifetimes: [200], target: all, status: { id: 70 }, persist_on_transfer: true, flags: { follows_caster: true } }
  - { id: 16, name: gate_waiting, layouts: [{ shape: square, radius: 0 }], lifetimes: [3], target: no_one, expire_into: { kind: 17, lifetime: 6 } }
  - { id: 17, name: gate_open, layouts: [{ shape: square, radius: 0 }], lifetimes: [6], target: all }
  - { id: 18, name: volley, family: periodic_strike, layouts: [{ shape: square, radius: 0 }], lifetimes: [100], interval: 1, target: enemy, hits: 2 }
  - { id: 19, name: fire_ground, family: status_zone, layouts: [{ shape: square, radius: 1 }], lifetimes: [100], target: all, overlap: exclusive_zone, zone_tag: element }
  - { id: 20, name: water_ground, family: status_zone, layouts: [{ shape: square, radius: 1 }], lifetimes: [100], target: all, overlap: exclusive_zone, zone_tag: element }
  - { id: 21, name: fading_ward, family: status_zone, layouts: [{ shape: square, radius: 0 }], lifetimes: [50], target: all, status: { id: 80 } }
"#;

fn place(engine: &mut Engine<SimHost>, caster: u32, kind: u16, x: u16, y: u16, tick: u64) -> Result<GroupId, EffectError> {
    engine.place(
        PlaceRequest::new(ActorId(caster), EffectKind(kind), 1, cell(x, y)),
        GameTick(tick),
    )
}

fn run(engine: &mut Engine<SimHost>, ticks: std::ops::RangeInclusive<u64>) {
    for tick in ticks {
        engine.run_tick(GameTick(tick));
    }
}

#[test]
fn damage_erodes_walls_until_the_group_is_gone() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    let group = place(&mut engine, 1, 10, 10, 10, 0).expect("wall placed");
    let units: Vec<_> = engine
        .group(group)
        .map(|group| group.live_units().map(|unit| unit.id).collect())
        .unwrap_or_default();
    assert_eq!(units.len(), 3);

    let hit = engine.damage_unit(units[0], 40).expect("unit exists");
    assert_eq!((hit.remaining, hit.destroyed), (60, false));
    let hit = engine.damage_unit(units[0], 60).expect("unit exists");
    assert!(hit.destroyed);
    assert_eq!(engine.group(group).map(|group| group.alive_count()), Some(2));
    assert_eq!(engine.damage_unit(units[0], 1), Err(EffectError::UnitNotFound(units[0])));

    for unit in &units[1..] {
        let hit = engine.damage_unit(*unit, 500).expect("unit exists");
        assert!(hit.destroyed);
    }
    assert!(engine.group(group).is_none());
    assert_eq!(engine.allocated_group_count(), 0);
    for x in 9..=11 {
        assert!(engine.cell_flags(cell(x, 10)).is_empty());
    }
}

#[test]
fn walkable_only_layouts_skip_blocked_and_reserved_cells() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    engine.host_mut().block(cell(20, 20));

    let first = place(&mut engine, 1, 10, 20, 20, 0).expect("two cells survive");
    assert_eq!(engine.group(first).map(|group| group.alive_count()), Some(2));
    assert!(engine.units_at(cell(20, 20)).is_empty());

    let second = place(&mut engine, 1, 10, 20, 20, 1);
    assert_eq!(
        second,
        Err(EffectError::PlacementRejected {
            kind: EffectKind(10),
            cells: 3,
            refund_ammo: true
        })
    );
    assert_eq!(engine.live_group_count(), 1);
}

#[test]
fn trap_fires_once_and_turns_into_its_spent_phase() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    spawn(&mut engine, actor(2, ActorKind::Monster, 5, 6, 0));
    let group = place(&mut engine, 1, 11, 5, 5, 0).expect("trap placed");
    assert!(engine.host().notices().any(|notice| matches!(
        notice,
        UnitNotice::Appeared { group: seen, audience: Audience::AlliesOf(side), .. }
            if *seen == group && side.actor == ActorId(1)
    )));

    walk(&mut engine, 2, 5, 5, 1);
    assert_eq!(engine.host().strikes_on(ActorId(2)), 1);
    assert_eq!(engine.group(group).map(|group| group.kind), Some(EffectKind(12)));
    assert!(!engine.is_inside(ActorId(2), group));
    assert!(engine
        .host()
        .notices()
        .any(|notice| matches!(notice, UnitNotice::Changed { kind, .. } if *kind == EffectKind(12))));

    run(&mut engine, 2..=5);
    assert!(engine.group(group).is_some());
    run(&mut engine, 6..=6);
    assert!(engine.group(group).is_none());
    assert_eq!(engine.host().strikes_on(ActorId(2)), 1);
    assert!(!engine
        .host()
        .events()
        .iter()
        .any(|event| matches!(event, HostEvent::ItemDropped { .. })));
}

#[test]
fn untriggered_trap_returns_its_item() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    let group = place(&mut engine, 1, 11, 5, 5, 0).expect("trap placed");

    run(&mut engine, 1..=30);

    assert!(engine.group(group).is_none());
    let drops: Vec<_> = engine
        .host()
        .events()
        .iter()
        .filter_map(|event| match event {
            HostEvent::ItemDropped { cell: at, item, amount } => Some((*at, *item, *amount)),
            _ => None,
        })
        .collect();
    assert_eq!(drops, vec![(cell(5, 5), ItemId(1065), 1)]);
}

#[test]
fn periodic_hits_respect_the_interval() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    spawn(&mut engine, actor(2, ActorKind::Monster, 8, 8, 0));
    place(&mut engine, 1, 13, 8, 8, 0).expect("pulse placed");

    let mut hits = 0;
    for tick in 0..=9 {
        hits += engine.run_tick(GameTick(tick)).hits;
    }

    assert_eq!(hits, 4);
    assert_eq!(engine.host().strikes_on(ActorId(2)), 4);
}

#[test]
fn hit_budget_deletes_the_unit() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    spawn(&mut engine, actor(2, ActorKind::Monster, 8, 8, 0));
    let group = place(&mut engine, 1, 18, 8, 8, 0).expect("volley placed");

    run(&mut engine, 0..=4);

    assert_eq!(engine.host().strikes_on(ActorId(2)), 2);
    assert!(engine.group(group).is_none());
}

#[test]
fn renewal_lasts_while_the_caster_keeps_the_status() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    engine.host_mut().grant_innate(ActorId(1), StatusId(61));
    let group = place(&mut engine, 1, 14, 4, 4, 0).expect("bonfire placed");

    run(&mut engine, 1..=15);
    assert_eq!(engine.group(group).map(|group| group.limit), Some(20));

    engine.host_mut().clear_innate(ActorId(1), StatusId(61));
    run(&mut engine, 16..=19);
    assert!(engine.group(group).is_some());
    run(&mut engine, 20..=20);
    assert!(engine.group(group).is_none());
}

#[test]
fn expiry_can_move_a_group_to_its_next_phase() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    let group = place(&mut engine, 1, 16, 6, 6, 0).expect("gate placed");

    run(&mut engine, 1..=3);
    let current = engine.group(group).expect("gate still open");
    assert_eq!(current.kind, EffectKind(17));
    assert_eq!(current.limit, 9);

    run(&mut engine, 4..=8);
    assert!(engine.group(group).is_some());
    run(&mut engine, 9..=9);
    assert!(engine.group(group).is_none());
}

#[test]
fn opening_phase_activates_for_whoever_already_stands_there() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    spawn(&mut engine, actor(2, ActorKind::Player, 6, 6, 0));
    let recorder = Recorder::new();
    recorder.install(&mut engine, &[16, 17]);
    let group = place(&mut engine, 1, 16, 6, 6, 0).expect("gate placed");
    let traveller = ActorId(2);
    assert!(!engine.is_inside(traveller, group));

    run(&mut engine, 1..=3);

    assert_eq!(engine.group(group).map(|group| group.kind), Some(EffectKind(17)));
    assert!(engine.is_inside(traveller, group));
    let places: Vec<EffectKind> = recorder
        .entries()
        .into_iter()
        .filter(|(hook, actor, seen, _)| *hook == Hook::Place && *actor == traveller && *seen == group)
        .map(|(_, _, _, kind)| kind)
        .collect();
    assert_eq!(places, vec![EffectKind(17)]);
}

/// Switches its unit off on the first aging pass.
struct Fade;

impl EffectBehavior for Fade {
    fn on_age(&self, ctx: &mut HookCtx<'_>) {
        ctx.unit.range = -1;
    }
}

#[test]
fn disabled_unit_ignores_entry() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    spawn(&mut engine, actor(2, ActorKind::Player, 20, 20, 0));
    engine.register_behavior(EffectKind(21), Arc::new(Fade));
    let group = place(&mut engine, 1, 21, 12, 12, 0).expect("ward placed");
    let unit = engine.units_at(cell(12, 12))[0];

    engine.run_tick(GameTick(1));
    assert_eq!(engine.unit(unit).map(|unit| unit.range), Some(-1));

    walk(&mut engine, 2, 12, 12, 2);
    assert!(!engine.is_inside(ActorId(2), group));
    assert!(engine.group(group).is_some());
}

#[test]
fn caster_following_group_moves_and_survives_map_change() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 10, 10, 0));
    spawn(&mut engine, actor(2, ActorKind::Player, 12, 11, 0));
    let group = place(&mut engine, 1, 15, 10, 10, 0).expect("aura placed");
    assert!(engine.is_inside(ActorId(1), group));
    assert!(!engine.is_inside(ActorId(2), group));

    walk(&mut engine, 1, 11, 10, 1);
    assert!(!engine.units_at(cell(12, 10)).is_empty());
    assert!(engine.units_at(cell(9, 10)).is_empty());
    assert!(engine.is_inside(ActorId(2), group));

    engine.on_actor_removed(ActorId(1), RemovalReason::MapChange, GameTick(2));
    assert!(engine.group(group).is_none());
    assert!(!engine.is_inside(ActorId(2), group));
    assert_eq!(engine.pending_transfers(ActorId(1)), 1);

    let elsewhere = Cell::new(MapId(2), 5, 5);
    engine.host_mut().add_map(MapId(2), 32, 32);
    engine.host_mut().move_actor(ActorId(1), elsewhere);
    let recreated = engine.on_actor_arrived(ActorId(1), GameTick(3));
    assert_eq!(recreated.len(), 1);
    assert_eq!(engine.group(recreated[0]).map(|group| group.map), Some(MapId(2)));
    assert_eq!(engine.group(recreated[0]).map(|group| group.kind), Some(EffectKind(15)));
    assert_eq!(engine.pending_transfers(ActorId(1)), 0);
    assert!(engine.on_actor_arrived(ActorId(1), GameTick(4)).is_empty());
}

#[test]
fn crossing_inside_one_group_skips_on_left() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 30, 30, 0));
    spawn(&mut engine, actor(2, ActorKind::Player, 0, 0, 0));
    let recorder = Recorder::new();
    recorder.install(&mut engine, &[19]);
    let group = place(&mut engine, 1, 19, 10, 10, 0).expect("zone placed");
    let visitor = ActorId(2);

    walk(&mut engine, 2, 10, 10, 1);
    walk(&mut engine, 2, 11, 10, 2);
    walk(&mut engine, 2, 20, 20, 3);

    let hooks: Vec<Hook> = recorder
        .entries()
        .into_iter()
        .filter(|(_, actor, seen, _)| *actor == visitor && *seen == group)
        .map(|(hook, _, _, _)| hook)
        .collect();
    assert_eq!(hooks, vec![Hook::Place, Hook::Out, Hook::Place, Hook::Out, Hook::Left]);
    assert_eq!(recorder.count(Hook::Left, visitor, group), 1);
}

#[test]
fn exclusive_zones_replace_each_other_cell_by_cell() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    let fire = place(&mut engine, 1, 19, 30, 30, 0).expect("fire placed");
    let water = place(&mut engine, 1, 20, 31, 30, 1).expect("water placed");

    assert_eq!(engine.group(fire).map(|group| group.alive_count()), Some(3));
    assert_eq!(engine.group(water).map(|group| group.alive_count()), Some(9));
    assert_eq!(engine.units_at(cell(30, 30)).len(), 1);
}

#[test]
fn full_caster_table_evicts_the_oldest_group() {
    let mut settings = config(KINDS);
    settings.max_groups_per_actor = 2;
    let mut engine = engine_with(settings);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));

    let first = place(&mut engine, 1, 13, 3, 3, 0).expect("first");
    let second = place(&mut engine, 1, 13, 4, 4, 0).expect("second");
    let third = place(&mut engine, 1, 13, 5, 5, 0).expect("third");

    assert!(engine.group(first).is_none());
    assert_eq!(engine.groups_owned_by(ActorId(1)), vec![second, third]);
}

#[test]
fn saturated_id_space_recycles_the_oldest_id() {
    let mut settings = config(KINDS);
    settings.group_id_capacity = 2;
    let mut engine = engine_with(settings);
    for id in 1..=3 {
        spawn(&mut engine, actor(id, ActorKind::Player, 0, id as u16, 0));
    }

    let first = place(&mut engine, 1, 13, 3, 3, 0).expect("first");
    place(&mut engine, 2, 13, 4, 4, 0).expect("second");
    let third = place(&mut engine, 3, 13, 5, 5, 0).expect("third evicts first");

    assert_eq!(third, first);
    assert_eq!(engine.group(third).map(|group| group.owner.actor), Some(ActorId(3)));
    assert_eq!(engine.live_group_count(), 2);
    assert!(engine.groups_owned_by(ActorId(1)).is_empty());
}

#[test]
fn arrival_recycles_an_id_when_the_space_is_full() {
    let mut settings = config(KINDS);
    settings.group_id_capacity = 2;
    let mut engine = engine_with(settings);
    for id in 1..=3 {
        spawn(&mut engine, actor(id, ActorKind::Player, 10 * id as u16, 10, 0));
    }
    place(&mut engine, 1, 15, 10, 10, 0).expect("aura placed");
    engine.on_actor_removed(ActorId(1), RemovalReason::MapChange, GameTick(1));
    let oldest = place(&mut engine, 2, 13, 3, 3, 2).expect("first pulse");
    place(&mut engine, 3, 13, 5, 5, 2).expect("second pulse");
    assert_eq!(engine.live_group_count(), 2);

    engine.host_mut().add_map(MapId(2), 32, 32);
    engine.host_mut().move_actor(ActorId(1), Cell::new(MapId(2), 8, 8));
    let recreated = engine.on_actor_arrived(ActorId(1), GameTick(3));

    assert_eq!(recreated, vec![oldest]);
    assert_eq!(engine.group(oldest).map(|group| group.owner.actor), Some(ActorId(1)));
    assert!(engine.groups_owned_by(ActorId(2)).is_empty());
    assert_eq!(engine.live_group_count(), 2);
}

#[test]
fn linked_groups_fall_together() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    let waiting = place(&mut engine, 1, 13, 3, 3, 0).expect("first");
    let open = place(&mut engine, 1, 13, 9, 9, 0).expect("second");
    engine.link_groups(waiting, open).expect("both live");

    assert!(engine.force_teardown(open));
    assert!(engine.group(waiting).is_none());
    assert_eq!(engine.allocated_group_count(), 0);
    assert_eq!(
        engine.link_groups(waiting, open),
        Err(EffectError::GroupNotFound(waiting))
    );
}

#[test]
fn hidden_and_dead_actors_are_left_alone() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    let mut sneaky = actor(2, ActorKind::Monster, 8, 8, 0);
    sneaky.hidden = true;
    spawn(&mut engine, sneaky);
    spawn(&mut engine, actor(3, ActorKind::Monster, 8, 8, 0));
    engine.host_mut().set_alive(ActorId(3), false);
    place(&mut engine, 1, 13, 8, 8, 0).expect("pulse placed");

    run(&mut engine, 0..=6);

    assert_eq!(engine.host().strikes_on(ActorId(2)), 0);
    assert_eq!(engine.host().strikes_on(ActorId(3)), 0);
}

#[test]
fn shutdown_releases_everything() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    place(&mut engine, 1, 10, 10, 10, 0).expect("wall");
    place(&mut engine, 1, 15, 20, 20, 0).expect("aura");

    engine.shutdown();

    assert_eq!(engine.allocated_group_count(), 0);
    assert_eq!(engine.live_unit_count(), 0);
    assert!(engine.cell_flags(cell(10, 10)).is_empty());
    assert!(engine.groups_owned_by(ActorId(1)).is_empty());
}

#[test]
fn unknown_kinds_and_actors_are_errors() {
    let mut engine = engine(KINDS);
    spawn(&mut engine, actor(1, ActorKind::Player, 0, 0, 0));
    assert_eq!(
        place(&mut engine, 1, 99, 3, 3, 0),
        Err(EffectError::UnknownKind(EffectKind(99)))
    );
    assert_eq!(
        place(&mut engine, 7, 13, 3, 3, 0),
        Err(EffectError::UnknownActor(ActorId(7)))
    );
    assert_eq!(engine.allocated_group_count(), 0);
}
