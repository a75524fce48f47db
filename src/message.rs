//! Messages exchanged between page engines and the settings service.

use serde::{Deserialize, Serialize};

use crate::effects::VideoFilters;
use crate::rules::{AccessDecision, UrlRuleMatch};
use crate::settings::Settings;

/// Page (or popup) to service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    GetSettings,
    SaveSettings { settings: Box<Settings> },
    GetSavedSpeed { hostname: String },
    SaveSpeed { hostname: String, speed: f64 },
    GetPresetSpeed { hostname: String },
    /// `None` unpins the preset.
    SavePresetSpeed { hostname: String, speed: Option<f64> },
    GetFilters { hostname: String },
    SaveFilters { hostname: String, filters: VideoFilters },
    GetVolumeBoost { hostname: String },
    SaveVolumeBoost { hostname: String, gain: f64 },
    CheckSiteAccess { url: String },
    GetUrlRuleSpeed { url: String },
    GetIntroOutroConfig { hostname: String },
    AddTimeSaved { seconds: f64 },
    /// Stamp the document with the current wall-clock time.
    UpdateSyncTime,
    GetSyncStatus,
    ExportSettings,
    ImportSettings { document: serde_json::Value },
    ResetSettings,
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::GetSettings => "getSettings",
            Request::SaveSettings { .. } => "saveSettings",
            Request::GetSavedSpeed { .. } => "getSavedSpeed",
            Request::SaveSpeed { .. } => "saveSpeed",
            Request::GetPresetSpeed { .. } => "getPresetSpeed",
            Request::SavePresetSpeed { .. } => "savePresetSpeed",
            Request::GetFilters { .. } => "getFilters",
            Request::SaveFilters { .. } => "saveFilters",
            Request::GetVolumeBoost { .. } => "getVolumeBoost",
            Request::SaveVolumeBoost { .. } => "saveVolumeBoost",
            Request::CheckSiteAccess { .. } => "checkSiteAccess",
            Request::GetUrlRuleSpeed { .. } => "getUrlRuleSpeed",
            Request::GetIntroOutroConfig { .. } => "getIntroOutroConfig",
            Request::AddTimeSaved { .. } => "addTimeSaved",
            Request::UpdateSyncTime => "updateSyncTime",
            Request::GetSyncStatus => "getSyncStatus",
            Request::ExportSettings => "exportSettings",
            Request::ImportSettings { .. } => "importSettings",
            Request::ResetSettings => "resetSettings",
        }
    }
}

/// Per-hostname intro/outro configuration as resolved by the service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroOutroConfig {
    pub enabled: bool,
    pub intro_skip_seconds: f64,
    pub outro_skip_seconds: f64,
    pub auto_skip_intro: bool,
    pub hotkeys_enabled: bool,
    pub intro_key: String,
    pub outro_key: String,
    /// True when a site rule supplied the seconds.
    pub site_specific: bool,
}

impl Default for IntroOutroConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            intro_skip_seconds: 0.0,
            outro_skip_seconds: 0.0,
            auto_skip_intro: false,
            hotkeys_enabled: false,
            intro_key: String::new(),
            outro_key: String::new(),
            site_specific: false,
        }
    }
}

/// Service to page (or popup).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Response {
    Settings { settings: Box<Settings> },
    Speed { speed: Option<f64> },
    Filters { filters: Option<VideoFilters> },
    VolumeBoost { gain: Option<f64> },
    SiteAccess(AccessDecision),
    UrlRule(UrlRuleMatch),
    IntroOutro(IntroOutroConfig),
    TimeSaved { total: f64 },
    /// Milliseconds since the Unix epoch; `None` if never synced.
    SyncStatus { last_sync_time: Option<i64> },
    Export { document: serde_json::Value },
    Ack,
    Error { message: String },
}

/// Global hotkeys registered by the extension manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalCommand {
    ToggleController,
    IncreaseSpeed,
    DecreaseSpeed,
    ResetSpeed,
}

/// Pushed to a page by the service, the popup or the manifest hotkeys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    SettingsUpdated { settings: Box<Settings> },
    Command { command: GlobalCommand },
    SetSpeed { speed: f64 },
}
