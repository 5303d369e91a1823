use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    time::Duration,
};

use crate::health::SimulationSettings;
use crate::sync::{DEFAULT_RECORD_TYPE, DEFAULT_SYNC_INTERVAL};

pub const CONFIG_ENV: &str = "HEALTHSYNC_CONFIG";
pub const DEBUG_ENV: &str = "HEALTHSYNC_DEBUG";
pub const DEFAULT_CONFIG_FILE: &str = "healthsync.json";

const DEBUG_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSettings {
    pub interval_secs: u64,
    pub record_type: String,
    pub database_path: PathBuf,
    pub simulation: SimulationSettings,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            record_type: DEFAULT_RECORD_TYPE.into(),
            database_path: PathBuf::from("healthsync.sqlite3"),
            simulation: SimulationSettings::default(),
        }
    }
}

impl SyncSettings {
    /// Cycle interval, shortened when `HEALTHSYNC_DEBUG` is set.
    pub fn interval(&self) -> Duration {
        if debug_mode() {
            DEBUG_INTERVAL
        } else {
            Duration::from_secs(self.interval_secs.max(1))
        }
    }
}

fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Settings file path from `HEALTHSYNC_CONFIG`, else `healthsync.json`.
pub fn settings_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub struct SettingsStore {
    path: PathBuf,
    data: SyncSettings,
}

impl SettingsStore {
    /// Loads `path`, writing the defaults there on first run so they can be edited.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                SyncSettings::default()
            })
        } else {
            SyncSettings::default()
        };

        let store = Self { path, data };
        if !store.path.exists() {
            if let Err(err) = store.persist() {
                warn!("Could not write default settings: {err:#}");
            }
        }
        Ok(store)
    }

    pub fn settings(&self) -> SyncSettings {
        self.data.clone()
    }

    fn persist(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
