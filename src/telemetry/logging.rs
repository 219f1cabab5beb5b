use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::warn;
use tracing_subscriber::filter::EnvFilter;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset, e.g. `info` or
    /// `ground_effects=debug`.
    pub level: String,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber. Later calls are no-ops. A subscriber
/// set by someone else is left in place and reported.
pub fn init(config: &LogConfig) -> Result<(), String> {
    install(config).map(|_| ())
}

/// Like [`init`], but says whether this crate's subscriber holds the
/// global slot afterwards.
fn install(config: &LogConfig) -> Result<bool, String> {
    if INSTALLED.get().is_some() {
        return Ok(true);
    }
    let filter = build_filter(config)?;

    let installed = match config.file.as_ref() {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|err| format!("log directory create failed: {}", err))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| format!("open log {} failed: {}", path.display(), err))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    match installed {
        Ok(()) => {
            let _ = INSTALLED.set(());
            Ok(true)
        }
        Err(err) => {
            warn!(%err, "global subscriber already set, keeping it");
            eprintln!("ground-effects: logging not installed: {}", err);
            Ok(false)
        }
    }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter, String> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config.level.trim())
        .map_err(|err| format!("invalid log level '{}': {}", config.level, err))
}
