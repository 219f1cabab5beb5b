use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::combat::rules::CombatRules;
use crate::effects::ids::EffectKind;
use crate::effects::kinds::{KindDef, MAX_LAYOUT_CELLS};
use crate::effects::overlap::OverlapRule;
use crate::error::ConfigError;
use crate::telemetry::logging::LogConfig;
use crate::world::position::Direction;

#[derive(Debug)]
pub struct AppConfig {
    pub effects_path: PathBuf,
    pub scenario_path: Option<PathBuf>,
    pub log: LogConfig,
    /// Overrides the scenario's own tick count.
    pub ticks: Option<u64>,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: ground-effects <effects.yaml> [scenario.yaml]".to_string());
        }

        let effects_path = Path::new(&args[1]).to_path_buf();
        let scenario_path = if args.len() > 2 {
            Some(Path::new(&args[2]).to_path_buf())
        } else {
            None
        };
        let level = env_value("GROUND_EFFECTS_LOG").unwrap_or_else(|| "info".to_string());
        let file = env_value("GROUND_EFFECTS_LOG_FILE").map(PathBuf::from);
        let ticks = match env_value("GROUND_EFFECTS_TICKS") {
            Some(value) => match value.parse::<u64>() {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    return Err(format!("invalid GROUND_EFFECTS_TICKS '{}'", value));
                }
            },
            None => None,
        };
        Ok(Self {
            effects_path,
            scenario_path,
            log: LogConfig { level, file },
            ticks,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Variants substituted for overlapping songs and dances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default)]
    pub song_dissonance: Option<EffectKind>,
    #[serde(default)]
    pub dance_dissonance: Option<EffectKind>,
}

/// Everything the effect engine is built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Wall-clock length of one scheduler tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Concurrent groups one caster may own before the oldest is evicted.
    #[serde(default = "default_max_groups_per_actor")]
    pub max_groups_per_actor: usize,
    #[serde(default = "default_tickset_capacity")]
    pub tickset_capacity: usize,
    #[serde(default = "default_group_id_capacity")]
    pub group_id_capacity: u32,
    #[serde(default = "default_first_group_id")]
    pub first_group_id: u32,
    #[serde(default)]
    pub combat: CombatRules,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub kinds: Vec<KindDef>,
    #[serde(default)]
    pub overlap_rules: Vec<OverlapRule>,
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_max_groups_per_actor() -> usize {
    25
}

fn default_tickset_capacity() -> usize {
    25
}

fn default_group_id_capacity() -> u32 {
    1_000_000
}

fn default_first_group_id() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_groups_per_actor: default_max_groups_per_actor(),
            tickset_capacity: default_tickset_capacity(),
            group_id_capacity: default_group_id_capacity(),
            first_group_id: default_first_group_id(),
            combat: CombatRules::default(),
            performance: PerformanceConfig::default(),
            kinds: Vec::new(),
            overlap_rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".to_string()));
        }
        if self.max_groups_per_actor == 0 {
            return Err(ConfigError::Invalid("max_groups_per_actor must be positive".to_string()));
        }
        if self.tickset_capacity == 0 {
            return Err(ConfigError::Invalid("tickset_capacity must be positive".to_string()));
        }
        if self.group_id_capacity == 0 || self.first_group_id == 0 {
            return Err(ConfigError::Invalid(
                "group_id_capacity and first_group_id must be positive".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for def in &self.kinds {
            if !ids.insert(def.id) {
                return Err(ConfigError::Invalid(format!("duplicate effect kind {}", def.id)));
            }
        }
        for def in &self.kinds {
            validate_kind(def, &ids)?;
        }
        for rule in &self.overlap_rules {
            for kind in [rule.incoming, rule.existing] {
                if !ids.contains(&kind) {
                    return Err(ConfigError::Invalid(format!(
                        "overlap rule references undefined {}",
                        kind
                    )));
                }
            }
        }
        for kind in [self.performance.song_dissonance, self.performance.dance_dissonance]
            .into_iter()
            .flatten()
        {
            if !ids.contains(&kind) {
                return Err(ConfigError::Invalid(format!(
                    "performance variant references undefined {}",
                    kind
                )));
            }
        }
        Ok(())
    }

    pub fn kind(&self, id: EffectKind) -> Option<&KindDef> {
        self.kinds.iter().find(|def| def.id == id)
    }
}

fn validate_kind(def: &KindDef, ids: &HashSet<EffectKind>) -> Result<(), ConfigError> {
    if def.layouts.is_empty() {
        return Err(ConfigError::Invalid(format!("{} ({}) has no layout", def.id, def.name)));
    }
    if def.lifetimes.is_empty() {
        return Err(ConfigError::Invalid(format!("{} ({}) has no lifetime", def.id, def.name)));
    }
    if def.interval == Some(0) {
        return Err(ConfigError::Invalid(format!(
            "{} ({}) has a zero interval; omit it to disable ticking",
            def.id, def.name
        )));
    }
    for layout in &def.layouts {
        let cells = layout.offsets(Direction::South).len();
        if cells == 0 || cells > MAX_LAYOUT_CELLS {
            return Err(ConfigError::Invalid(format!(
                "{} ({}) layout covers {} cells, allowed 1..={}",
                def.id, def.name, cells, MAX_LAYOUT_CELLS
            )));
        }
    }
    let references = [def.trigger_into, def.expire_into]
        .into_iter()
        .flatten()
        .map(|transform| transform.kind);
    for kind in references {
        if !ids.contains(&kind) {
            return Err(ConfigError::Invalid(format!(
                "{} ({}) transforms into undefined {}",
                def.id, def.name, kind
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn from_args_requires_effects_file() {
        assert!(AppConfig::from_args(&args(&["ground-effects"])).is_err());
        let config = AppConfig::from_args(&args(&["ground-effects", "fx.yaml", "run.yaml"]))
            .expect("config");
        assert_eq!(config.effects_path, PathBuf::from("fx.yaml"));
        assert_eq!(config.scenario_path, Some(PathBuf::from("run.yaml")));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: EngineConfig = serde_yaml::from_str("kinds: []").expect("yaml");
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.max_groups_per_actor, 25);
        assert_eq!(config.tickset_capacity, 25);
        assert_eq!(config.first_group_id, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let config: EngineConfig = serde_yaml::from_str(
            r#"
kinds:
  - { id: 1, name: a, layouts: [{ shape: square, radius: 0 }], lifetimes: [5], target: all }
  - { id: 1, name: b, layouts: [{ shape: square, radius: 0 }], lifetimes: [5], target: all }
"#,
        )
        .expect("yaml");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversize_layouts_and_dangling_references_are_rejected() {
        let oversize: EngineConfig = serde_yaml::from_str(
            "kinds: [{ id: 1, name: a, layouts: [{ shape: square, radius: 8 }], lifetimes: [5], target: all }]",
        )
        .expect("yaml");
        assert!(oversize.validate().is_err());

        let dangling: EngineConfig = serde_yaml::from_str(
            "kinds: [{ id: 1, name: a, layouts: [{ shape: square, radius: 0 }], lifetimes: [5], target: all, expire_into: { kind: 9, lifetime: 3 } }]",
        )
        .expect("yaml");
        assert!(dangling.validate().is_err());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = EngineConfig {
            max_groups_per_actor: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
