//! Intro/outro skip state machine.
//!
//! One instance per controlled element. The session flags are one-shot and
//! reset on SPA navigation or when the element is re-attached.

use crate::message::IntroOutroConfig;

/// Automatic intro skips only fire near the start of playback.
pub const INTRO_WINDOW_SECONDS: f64 = 2.0;
/// Outro skips land this far before the end and never fire closer than it.
pub const OUTRO_TAIL_SECONDS: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipDirection {
    Intro,
    Outro,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkipAction {
    pub direction: SkipDirection,
    pub seek_to: f64,
}

impl SkipAction {
    pub fn feedback(&self) -> String {
        match self.direction {
            SkipDirection::Intro => format!("Skipped intro ({:.0}s)", self.seek_to),
            SkipDirection::Outro => "Skipped outro".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipSession {
    intro_skipped: bool,
    outro_triggered: bool,
}

impl SkipSession {
    pub fn intro_skipped(&self) -> bool {
        self.intro_skipped
    }

    pub fn outro_triggered(&self) -> bool {
        self.outro_triggered
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `play` or `loadedmetadata`.
    pub fn on_playback_start(
        &mut self,
        config: &IntroOutroConfig,
        position: f64,
        duration: Option<f64>,
    ) -> Option<SkipAction> {
        if !config.enabled || !config.auto_skip_intro || self.intro_skipped {
            return None;
        }
        if position >= INTRO_WINDOW_SECONDS {
            return None;
        }
        self.intro_skip(config, duration)
    }

    /// Position tick. Kept allocation-free.
    pub fn on_time_update(
        &mut self,
        config: &IntroOutroConfig,
        position: f64,
        duration: Option<f64>,
    ) -> Option<SkipAction> {
        if !config.enabled || self.outro_triggered {
            return None;
        }
        self.outro_skip(config, position, duration)
    }

    /// Hotkey-triggered intro skip; honored even after an automatic one.
    pub fn manual_intro(&mut self, config: &IntroOutroConfig, duration: Option<f64>) -> Option<SkipAction> {
        if !config.enabled {
            return None;
        }
        self.intro_skipped = false;
        self.intro_skip(config, duration)
    }

    /// Hotkey-triggered outro skip; jumps to the tail regardless of the window.
    pub fn manual_outro(&mut self, config: &IntroOutroConfig, duration: Option<f64>) -> Option<SkipAction> {
        if !config.enabled {
            return None;
        }
        self.outro_triggered = false;
        let duration = duration?;
        if duration <= OUTRO_TAIL_SECONDS {
            return None;
        }
        self.outro_triggered = true;
        Some(SkipAction {
            direction: SkipDirection::Outro,
            seek_to: duration - OUTRO_TAIL_SECONDS,
        })
    }

    fn intro_skip(&mut self, config: &IntroOutroConfig, duration: Option<f64>) -> Option<SkipAction> {
        let skip_to = config.intro_skip_seconds;
        if skip_to <= 0.0 {
            return None;
        }
        // Media shorter than the intro offset is left alone.
        if !duration.is_some_and(|d| d >= skip_to) {
            return None;
        }
        self.intro_skipped = true;
        Some(SkipAction {
            direction: SkipDirection::Intro,
            seek_to: skip_to,
        })
    }

    fn outro_skip(&mut self, config: &IntroOutroConfig, position: f64, duration: Option<f64>) -> Option<SkipAction> {
        let window = config.outro_skip_seconds;
        if window <= 0.0 {
            return None;
        }
        let duration = duration?;
        // A window covering the whole media would skip it outright.
        if window >= duration {
            return None;
        }
        let remaining = duration - position;
        if remaining > OUTRO_TAIL_SECONDS && remaining <= window {
            self.outro_triggered = true;
            return Some(SkipAction {
                direction: SkipDirection::Outro,
                seek_to: duration - OUTRO_TAIL_SECONDS,
            });
        }
        None
    }
}
