//! Overlay view model and context-menu contents.
//!
//! The engine renders nothing itself: it builds an `OverlayView` and hands it
//! to the host, which owns markup and styling.

use crate::settings::{ControllerMode, Settings};

/// Preset buttons in the full panel.
pub const PANEL_PRESETS: [f64; 5] = [0.5, 1.0, 1.5, 2.0, 3.0];
/// Right-click menu presets.
pub const MENU_PRESETS: [f64; 7] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0];

/// Format a speed for display.
pub fn format_speed(speed: f64) -> String {
    format!("{:.2}x", speed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchControl {
    /// Rendered disabled.
    Unsupported,
    On,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoopBadge {
    None,
    PointA(f64),
    Active { a: f64, b: f64 },
    Paused { a: f64, b: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayView {
    pub mode: ControllerMode,
    pub speed: f64,
    pub speed_label: String,
    pub hidden: bool,
    pub highlighted: bool,
    pub opacity: f64,
    pub accent_color: String,
    pub background_color: String,
    pub text_color: String,
    /// Preset whose value equals the current speed, if any.
    pub active_preset: Option<f64>,
    pub pitch: PitchControl,
    pub loop_badge: LoopBadge,
    pub volume_boost: Option<f64>,
    pub picture_in_picture: bool,
}

impl OverlayView {
    pub fn new(settings: &Settings, speed: f64) -> Self {
        Self {
            mode: settings.controller_mode,
            speed,
            speed_label: format_speed(speed),
            hidden: settings.hide_by_default,
            highlighted: false,
            opacity: settings.opacity,
            accent_color: settings.colors.accent.clone(),
            background_color: settings.colors.background.clone(),
            text_color: settings.colors.text.clone(),
            active_preset: active_preset(speed),
            pitch: PitchControl::Unsupported,
            loop_badge: LoopBadge::None,
            volume_boost: None,
            picture_in_picture: false,
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
        self.speed_label = format_speed(speed);
        self.active_preset = active_preset(speed);
    }

    /// Pick up appearance changes from a new settings snapshot.
    pub fn restyle(&mut self, settings: &Settings) {
        self.mode = settings.controller_mode;
        self.hidden = settings.hide_by_default;
        self.opacity = settings.opacity;
        self.accent_color = settings.colors.accent.clone();
        self.background_color = settings.colors.background.clone();
        self.text_color = settings.colors.text.clone();
    }
}

fn active_preset(speed: f64) -> Option<f64> {
    PANEL_PRESETS.iter().copied().find(|p| (p - speed).abs() < f64::EPSILON)
}

/// Actions issued from the overlay itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlayAction {
    Increase,
    Decrease,
    Reset,
    Preset(f64),
    Seek(f64),
    TogglePitch,
    /// Mouse wheel; negative `delta_y` scrolls up and speeds up.
    Wheel { delta_y: f64 },
    /// Pointer entered the overlay.
    Hover,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub speed: f64,
}

pub fn speed_menu() -> Vec<MenuItem> {
    MENU_PRESETS
        .iter()
        .map(|&speed| MenuItem {
            label: if speed == 1.0 {
                "1x (Normal)".to_string()
            } else {
                format!("{}x", speed)
            },
            speed,
        })
        .collect()
}
