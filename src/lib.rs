pub mod combat;
pub mod config;
pub mod effects;
pub mod entities;
pub mod error;
pub mod host;
pub mod sim;
pub mod telemetry;
pub mod world;

pub use config::{AppConfig, EngineConfig};
pub use effects::{Engine, PlaceRequest, RemovalReason, TickReport, UnitDamage};
pub use error::{ConfigError, EffectError};
pub use host::Host;

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.log)?;
    let engine_config =
        config::EngineConfig::load(&config.effects_path).map_err(|err| err.to_string())?;
    println!("ground-effects: effect table");
    println!("- file: {}", config.effects_path.display());
    println!("- kinds: {}", engine_config.kinds.len());
    println!("- overlap rules: {}", engine_config.overlap_rules.len());
    println!("- tick interval: {}ms", engine_config.tick_interval_ms);
    println!("- max groups per actor: {}", engine_config.max_groups_per_actor);

    let Some(scenario_path) = config.scenario_path.as_ref() else {
        return Ok(());
    };
    let scenario = sim::Scenario::load(scenario_path).map_err(|err| err.to_string())?;
    let summary = scenario
        .run(&engine_config, config.ticks)
        .map_err(|err| err.to_string())?;
    println!("ground-effects: scenario {}", scenario_path.display());
    println!("- ticks: {}", summary.ticks);
    println!(
        "- placements: ok={}, rejected={}, ammo refunded={}",
        summary.placed, summary.rejected, summary.ammo_refunded
    );
    println!("- strikes: {}", summary.strikes);
    println!("- statuses applied: {}", summary.statuses_applied);
    println!("- units expired: {}", summary.units_expired);
    println!("- groups live at end: {}", summary.live_groups);
    Ok(())
}
