//! Keyboard shortcut matching and long-press tracking.

use crate::message::IntroOutroConfig;
use crate::settings::{Action, Modifier, ShortcutBinding};
use crate::skip::SkipDirection;

/// A key event as delivered by the document-level capture listener.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
    /// Target is an input, textarea or contenteditable element.
    pub in_text_field: bool,
}

impl KeyInput {
    pub fn key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    fn key_matches(&self, key: &str) -> bool {
        !key.is_empty() && self.key.eq_ignore_ascii_case(key)
    }
}

/// Modifiers must match exactly: each is compared present-or-absent.
fn modifiers_match(binding: &ShortcutBinding, input: &KeyInput) -> bool {
    let wants = |m: Modifier| binding.modifiers.contains(&m);
    wants(Modifier::Ctrl) == (input.ctrl || input.meta)
        && wants(Modifier::Alt) == input.alt
        && wants(Modifier::Shift) == input.shift
}

/// First enabled binding with the same key and modifier set.
pub fn match_shortcut<'a>(bindings: &'a [ShortcutBinding], input: &KeyInput) -> Option<&'a ShortcutBinding> {
    bindings
        .iter()
        .find(|b| b.enabled && input.key_matches(&b.key) && modifiers_match(b, input))
}

/// Intro/outro hotkeys take priority over regular shortcuts.
pub fn match_skip_hotkey(config: &IntroOutroConfig, input: &KeyInput) -> Option<SkipDirection> {
    if !config.enabled || !config.hotkeys_enabled {
        return None;
    }
    if input.key_matches(&config.intro_key) {
        Some(SkipDirection::Intro)
    } else if input.key_matches(&config.outro_key) {
        Some(SkipDirection::Outro)
    } else {
        None
    }
}

/// Whether a key-up releases the preferred-speed long press.
pub fn is_long_press_release(bindings: &[ShortcutBinding], input: &KeyInput) -> bool {
    bindings
        .iter()
        .any(|b| b.enabled && b.action == Action::PreferredSpeed && input.key_matches(&b.key))
}

/// Hold-to-boost state for the preferred-speed action.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LongPress {
    restore_to: Option<f64>,
}

impl LongPress {
    pub fn is_active(&self) -> bool {
        self.restore_to.is_some()
    }

    /// Returns true on the first key-down; auto-repeat is ignored.
    pub fn press(&mut self, current_rate: f64) -> bool {
        if self.restore_to.is_some() {
            return false;
        }
        self.restore_to = Some(current_rate);
        true
    }

    /// The rate to restore, if a press was in progress.
    pub fn release(&mut self) -> Option<f64> {
        self.restore_to.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::default_shortcuts;

    #[test]
    fn key_match_ignores_case() {
        let bindings = default_shortcuts();
        let found = match_shortcut(&bindings, &KeyInput::key("d")).unwrap();
        assert_eq!(found.action, Action::IncreaseSpeed);
    }

    #[test]
    fn modifier_set_must_match_exactly() {
        let bindings = default_shortcuts();
        assert!(match_shortcut(&bindings, &KeyInput::key("d").with_ctrl()).is_none());
        let shifted = match_shortcut(&bindings, &KeyInput::key("S").with_shift()).unwrap();
        assert_eq!(shifted.action, Action::Screenshot);
        let plain = match_shortcut(&bindings, &KeyInput::key("s")).unwrap();
        assert_eq!(plain.action, Action::DecreaseSpeed);
    }

    #[test]
    fn meta_counts_as_ctrl() {
        let bindings = vec![ShortcutBinding {
            action: Action::ResetSpeed,
            key: "r".into(),
            modifiers: vec![Modifier::Ctrl],
            value: None,
            enabled: true,
        }];
        let input = KeyInput {
            meta: true,
            ..KeyInput::key("R")
        };
        assert!(match_shortcut(&bindings, &input).is_some());
    }

    #[test]
    fn disabled_bindings_are_skipped() {
        let mut bindings = default_shortcuts();
        bindings[2].enabled = false;
        assert!(match_shortcut(&bindings, &KeyInput::key("D")).is_none());
    }

    #[test]
    fn first_enabled_duplicate_wins() {
        let mut bindings = default_shortcuts();
        bindings.insert(
            0,
            ShortcutBinding {
                action: Action::Advance,
                key: "D".into(),
                modifiers: vec![],
                value: Some(5.0),
                enabled: true,
            },
        );
        let found = match_shortcut(&bindings, &KeyInput::key("d")).unwrap();
        assert_eq!(found.action, Action::Advance);
    }

    #[test]
    fn long_press_ignores_repeats_and_restores_once() {
        let mut press = LongPress::default();
        assert!(press.press(1.25));
        assert!(!press.press(3.0));
        assert_eq!(press.release(), Some(1.25));
        assert_eq!(press.release(), None);
    }

    #[test]
    fn skip_hotkeys_need_feature_and_hotkeys_enabled() {
        let mut config = IntroOutroConfig {
            enabled: true,
            hotkeys_enabled: true,
            intro_key: "I".into(),
            outro_key: "O".into(),
            ..IntroOutroConfig::default()
        };
        assert_eq!(match_skip_hotkey(&config, &KeyInput::key("i")), Some(SkipDirection::Intro));
        assert_eq!(match_skip_hotkey(&config, &KeyInput::key("o")), Some(SkipDirection::Outro));
        config.hotkeys_enabled = false;
        assert_eq!(match_skip_hotkey(&config, &KeyInput::key("i")), None);
    }
}
