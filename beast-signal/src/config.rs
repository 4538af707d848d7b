use std::cell::Cell;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Default nesting depth at which re-entrant emissions start being logged.
pub const DEFAULT_WARN_EMISSION_DEPTH: usize = 64;
const WARN_EMISSION_DEPTH_CEILING: usize = 4096;

thread_local! {
    /// Options picked up by `Event::new` on this thread; loaded on first use.
    static CURRENT_OPTIONS: Cell<Option<EventOptions>> = const { Cell::new(None) };
}

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    dispatch: DispatchConfig,
}

#[derive(Deserialize, Default)]
struct DispatchConfig {
    warn_emission_depth: Option<usize>,
    log_emissions: Option<bool>,
}

/// Per-event dispatch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOptions {
    /// Nested emissions at or beyond this depth are logged at `warn`.
    pub warn_emission_depth: usize,
    /// Trace every emission start.
    pub log_emissions: bool,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            warn_emission_depth: DEFAULT_WARN_EMISSION_DEPTH,
            log_emissions: false,
        }
    }
}

impl EventOptions {
    /// Options for events created on this thread.
    ///
    /// The first call loads [`Config::load`] unless [`Config::install`] ran
    /// before it.
    pub fn current() -> Self {
        CURRENT_OPTIONS.with(|current| match current.get() {
            Some(options) => options,
            None => {
                let options = Config::load().event_options();
                current.set(Some(options));
                options
            }
        })
    }
}

pub struct Config {
    dispatch: DispatchConfig,
}

impl Config {
    /// Embedded defaults, overridden by the user's config file if present.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::embedded(),
        }
    }

    /// Embedded defaults, overridden by `path` if it exists and parses.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::embedded();
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge_dispatch(&mut config.dispatch, user.dispatch),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }
        config
    }

    fn embedded() -> Self {
        let base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "config", "embedded config.toml is malformed: {}", e);
            ConfigFile::default()
        });
        Config {
            dispatch: base.dispatch,
        }
    }

    /// Re-entrancy warning depth (clamped to 1..=4096).
    pub fn warn_emission_depth(&self) -> usize {
        self.dispatch
            .warn_emission_depth
            .unwrap_or(DEFAULT_WARN_EMISSION_DEPTH)
            .clamp(1, WARN_EMISSION_DEPTH_CEILING)
    }

    pub fn log_emissions(&self) -> bool {
        self.dispatch.log_emissions.unwrap_or(false)
    }

    pub fn event_options(&self) -> EventOptions {
        EventOptions {
            warn_emission_depth: self.warn_emission_depth(),
            log_emissions: self.log_emissions(),
        }
    }

    /// Make these settings the ones `Event::new` uses on this thread.
    pub fn install(&self) {
        let options = self.event_options();
        CURRENT_OPTIONS.with(|current| current.set(Some(options)));
        log::debug!(target: "config", "installed dispatch options {:?}", options);
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("beast-signal").join("config.toml"))
}

fn merge_dispatch(base: &mut DispatchConfig, user: DispatchConfig) {
    if user.warn_emission_depth.is_some() {
        base.warn_emission_depth = user.warn_emission_depth;
    }
    if user.log_emissions.is_some() {
        base.log_emissions = user.log_emissions;
    }
}
