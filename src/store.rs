//! Durable storage for settings and hostname-scoped values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::effects::VideoFilters;
use crate::error::StoreError;
use crate::settings::Settings;

/// Environment variable overriding the settings file location.
pub const SETTINGS_PATH_ENV: &str = "VSC_SETTINGS_PATH";

/// Everything the service persists. Hostname maps are ordered so exports are
/// stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    #[serde(flatten)]
    pub settings: Settings,
    pub saved_speeds: BTreeMap<String, f64>,
    pub preset_speeds: BTreeMap<String, f64>,
    pub saved_filters: BTreeMap<String, VideoFilters>,
    pub saved_volumes: BTreeMap<String, f64>,
}

pub trait SettingsStore {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<PersistedState>, StoreError>;
    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Default location: `$VSC_SETTINGS_PATH`, else `$HOME/.vsc/settings.json`.
pub fn default_settings_path() -> Result<PathBuf, StoreError> {
    if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    match std::env::var("HOME") {
        Ok(home) => Ok(PathBuf::from(home).join(".vsc").join("settings.json")),
        Err(_) => Err(StoreError::Location {
            reason: format!("neither {} nor HOME is set", SETTINGS_PATH_ENV),
        }),
    }
}

/// Single JSON document on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_str(&content)?;
        log::debug!("Loaded settings from {}", self.path.display());
        Ok(Some(state))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        // Write then rename so a crash never leaves a truncated document.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        log::trace!("Saved settings to {}", self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store; counts writes so batching can be observed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Option<PersistedState>,
    writes: usize,
}

impl MemoryStore {
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Some(state),
            writes: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn stored(&self) -> Option<&PersistedState> {
        self.state.as_ref()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), StoreError> {
        self.state = Some(state.clone());
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.state = None;
        Ok(())
    }
}
