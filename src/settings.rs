//! User configuration snapshot.
//!
//! A `Settings` value is replaced wholesale on every change notification.
//! Every field carries a serde default so documents written by older versions
//! merge cleanly with newly added options.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerMode {
    /// Speed badge only.
    #[default]
    Minimal,
    /// Panel with buttons, presets, seek and pitch controls.
    Full,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteAccessMode {
    #[default]
    Blocklist,
    Allowlist,
    AllowAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Ctrl, or Meta on macOS keyboards.
    Ctrl,
    Alt,
    Shift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    ShowController,
    DecreaseSpeed,
    IncreaseSpeed,
    Rewind,
    Advance,
    ResetSpeed,
    PreferredSpeed,
    FrameForward,
    FrameBackward,
    SetLoopA,
    SetLoopB,
    ClearLoop,
    ToggleLoop,
    TogglePip,
    Screenshot,
    VolumeUp,
    VolumeDown,
}

impl Action {
    /// Value used when a binding does not carry one.
    pub fn default_value(self) -> f64 {
        match self {
            Action::DecreaseSpeed | Action::IncreaseSpeed => 0.1,
            Action::Rewind | Action::Advance => 10.0,
            Action::ResetSpeed => 1.0,
            Action::PreferredSpeed => 2.0,
            Action::VolumeUp | Action::VolumeDown => 0.25,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutBinding {
    pub action: Action,
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl ShortcutBinding {
    fn new(action: Action, key: &str, value: Option<f64>) -> Self {
        Self {
            action,
            key: key.to_string(),
            modifiers: Vec::new(),
            value,
            enabled: true,
        }
    }

    fn with_modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.modifiers = modifiers.to_vec();
        self
    }

    /// The bound value, falling back to the action's default.
    pub fn value_or_default(&self) -> f64 {
        self.value.unwrap_or_else(|| self.action.default_value())
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRule {
    pub pattern: String,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipSiteRule {
    pub pattern: String,
    pub intro_seconds: f64,
    pub outro_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntroOutroSettings {
    pub enabled: bool,
    pub auto_skip_intro: bool,
    pub intro_skip_seconds: f64,
    pub outro_skip_seconds: f64,
    pub hotkeys_enabled: bool,
    pub intro_key: String,
    pub outro_key: String,
    pub site_rules: Vec<SkipSiteRule>,
}

impl Default for IntroOutroSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_skip_intro: true,
            intro_skip_seconds: 0.0,
            outro_skip_seconds: 0.0,
            hotkeys_enabled: true,
            intro_key: "I".to_string(),
            outro_key: "O".to_string(),
            site_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Colors {
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            accent: "#4f8cff".to_string(),
            background: "#000000".to_string(),
            text: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled: bool,
    pub hide_by_default: bool,
    pub remember_speed: bool,
    pub force_speed: bool,
    pub work_on_audio: bool,
    /// Keep pitch constant when the rate changes, where the element supports it.
    pub preserve_pitch: bool,
    pub opacity: f64,
    /// Seconds of inactivity before the overlay hides; 0 disables auto-hide.
    pub auto_hide_delay: f64,
    pub controller_mode: ControllerMode,
    pub show_pip_indicator: bool,
    pub colors: Colors,
    pub shortcuts: Vec<ShortcutBinding>,
    pub site_access_mode: SiteAccessMode,
    pub blocklist: Vec<String>,
    pub allowlist: Vec<String>,
    pub url_rules: Vec<UrlRule>,
    pub intro_outro: IntroOutroSettings,
    pub time_saved: f64,
    pub last_sync_time: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            hide_by_default: false,
            remember_speed: true,
            force_speed: false,
            work_on_audio: false,
            preserve_pitch: true,
            opacity: 0.8,
            auto_hide_delay: 0.0,
            controller_mode: ControllerMode::Minimal,
            show_pip_indicator: true,
            colors: Colors::default(),
            shortcuts: default_shortcuts(),
            site_access_mode: SiteAccessMode::Blocklist,
            blocklist: Vec::new(),
            allowlist: Vec::new(),
            url_rules: Vec::new(),
            intro_outro: IntroOutroSettings::default(),
            time_saved: 0.0,
            last_sync_time: None,
        }
    }
}

pub fn default_shortcuts() -> Vec<ShortcutBinding> {
    vec![
        ShortcutBinding::new(Action::ShowController, "V", None),
        ShortcutBinding::new(Action::DecreaseSpeed, "S", Some(0.1)),
        ShortcutBinding::new(Action::IncreaseSpeed, "D", Some(0.1)),
        ShortcutBinding::new(Action::Rewind, "Z", Some(10.0)),
        ShortcutBinding::new(Action::Advance, "X", Some(10.0)),
        ShortcutBinding::new(Action::ResetSpeed, "R", Some(1.0)),
        ShortcutBinding::new(Action::PreferredSpeed, "G", Some(3.0)),
        ShortcutBinding::new(Action::FrameForward, ".", None),
        ShortcutBinding::new(Action::FrameBackward, ",", None),
        ShortcutBinding::new(Action::SetLoopA, "[", None),
        ShortcutBinding::new(Action::SetLoopB, "]", None),
        ShortcutBinding::new(Action::ClearLoop, "\\", None),
        ShortcutBinding::new(Action::ToggleLoop, "L", None),
        ShortcutBinding::new(Action::TogglePip, "P", None),
        ShortcutBinding::new(Action::Screenshot, "S", None).with_modifiers(&[Modifier::Shift]),
        ShortcutBinding::new(Action::VolumeUp, "+", Some(0.25)),
        ShortcutBinding::new(Action::VolumeDown, "-", Some(0.25)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_merges_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"rememberSpeed": false, "opacity": 0.5}"#).unwrap();
        assert!(!settings.remember_speed);
        assert_eq!(settings.opacity, 0.5);
        assert!(settings.enabled);
        assert_eq!(settings.shortcuts, default_shortcuts());
        assert_eq!(settings.intro_outro.intro_key, "I");
    }

    #[test]
    fn wire_names_are_kebab_and_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["controllerMode"], "minimal");
        assert_eq!(json["siteAccessMode"], "blocklist");
        assert_eq!(json["shortcuts"][6]["action"], "preferred-speed");
    }

    #[test]
    fn missing_binding_value_falls_back_to_action_default() {
        let binding: ShortcutBinding =
            serde_json::from_str(r#"{"action": "rewind", "key": "Z"}"#).unwrap();
        assert!(binding.enabled);
        assert_eq!(binding.value_or_default(), 10.0);
    }
}
