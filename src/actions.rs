//! Direct operations on a controlled element: speed, seeking, loop points,
//! pitch, volume boost, filters, screenshots and picture-in-picture.

use std::time::Duration;

use crate::ab_loop::LoopTransition;
use crate::effects::{VideoFilters, clamp_volume_boost};
use crate::host::{HostChannel, MediaEventKind, NodeId, PageHost, ReadyState};
use crate::overlay::{LoopBadge, OverlayAction, PitchControl};
use crate::pitch::normalize_speed;
use crate::settings::Action;
use crate::state::{Engine, GainState, TimerKind};
use crate::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPoint {
    A,
    B,
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

impl<P: PageHost, C: HostChannel> Engine<P, C> {
    /// Sets the playback rate of `node`, returning the stored rate.
    pub fn set_speed(&mut self, node: NodeId, speed: f64) -> Option<f64> {
        if !self.is_running() || !self.is_tracked(node) {
            return None;
        }
        Some(self.apply_speed(node, speed, true))
    }

    /// `set_speed(current + delta)`.
    pub fn change_speed(&mut self, node: NodeId, delta: f64) -> Option<f64> {
        if !self.is_running() || !self.is_tracked(node) {
            return None;
        }
        let current = self.page.playback_rate(node);
        self.set_speed(node, current + delta)
    }

    pub(crate) fn apply_speed(&mut self, node: NodeId, speed: f64, persist: bool) -> f64 {
        let applied = normalize_speed(speed);
        trace::log_speed_set(node, speed, applied);
        self.page.set_playback_rate(node, applied);
        if let Some(element) = self.element_mut(node) {
            element.view.set_speed(applied);
            element.view.highlighted = true;
        }
        self.render(node);
        let delay = self.config.highlight_duration;
        self.timers.rearm(&mut self.page, TimerKind::HighlightEnd(node), delay);

        if persist && self.settings.remember_speed && !self.hostname.is_empty() {
            self.pending_speed = Some(applied);
            let delay = self.config.persist_debounce;
            self.timers.rearm(&mut self.page, TimerKind::PersistSpeed, delay);
        }
        applied
    }

    /// Moves the play position by `delta` seconds, staying inside the media.
    pub fn seek(&mut self, node: NodeId, delta: f64) -> bool {
        if !self.is_running() || !self.is_tracked(node) {
            return false;
        }
        let target = self.page.current_time(node) + delta;
        let upper = self.page.duration(node).map_or(f64::INFINITY, |d| d.max(0.0));
        self.page.set_current_time(node, target.clamp(0.0, upper));
        true
    }

    /// Pauses and steps one approximate frame forward or backward.
    pub fn frame_step(&mut self, node: NodeId, forward: bool) -> bool {
        if !self.is_running() || !self.is_tracked(node) {
            return false;
        }
        self.page.pause(node);
        let step = self.config.frame_duration;
        self.seek(node, if forward { step } else { -step })
    }

    pub fn toggle_overlay(&mut self, node: NodeId) -> bool {
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        element.view.hidden = !element.view.hidden;
        self.render(node);
        true
    }

    /// Shows the overlay and restarts its auto-hide countdown.
    pub fn reset_auto_hide(&mut self, node: NodeId) {
        self.timers.cancel_where(&mut self.page, |k| *k == TimerKind::AutoHide(node));
        let Some(element) = self.element_mut(node) else {
            return;
        };
        element.view.hidden = false;
        self.render(node);
        let delay = self.settings.auto_hide_delay;
        if delay > 0.0 {
            if let Ok(delay) = Duration::try_from_secs_f64(delay) {
                self.timers.rearm(&mut self.page, TimerKind::AutoHide(node), delay);
            }
        }
    }

    pub fn set_loop_point(&mut self, node: NodeId, point: LoopPoint) -> bool {
        if !self.is_running() {
            return false;
        }
        let position = self.page.current_time(node);
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        let transition = match point {
            LoopPoint::A => element.ab_loop.set_point_a(position),
            LoopPoint::B => element.ab_loop.set_point_b(position),
        };
        let label = match point {
            LoopPoint::A => "A",
            LoopPoint::B => "B",
        };
        self.apply_loop_transition(node, transition);
        self.page
            .show_toast(node, &format!("Loop {} set at {}", label, format_clock(position)));
        true
    }

    pub fn clear_loop(&mut self, node: NodeId) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        let transition = element.ab_loop.clear();
        self.apply_loop_transition(node, transition);
        self.page.show_toast(node, "Loop cleared");
        true
    }

    /// Flips the loop on or off without discarding its points.
    pub fn toggle_loop(&mut self, node: NodeId) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        match element.ab_loop.toggle() {
            Ok(transition) => {
                let on = transition == LoopTransition::Activated;
                self.apply_loop_transition(node, transition);
                self.page.show_toast(node, if on { "Loop on" } else { "Loop off" });
                true
            }
            Err(e) => {
                self.page.show_toast(node, &e.to_string());
                false
            }
        }
    }

    /// Installs, replaces or removes the loop's position listener and
    /// refreshes the badge.
    fn apply_loop_transition(&mut self, node: NodeId, transition: LoopTransition) {
        let Some(element) = self.elements.iter_mut().find(|e| e.node == node) else {
            return;
        };
        match transition {
            LoopTransition::Activated => {
                if let Some(old) = element.loop_listener.take() {
                    self.page.remove_listener(old);
                }
                element.loop_listener = Some(self.page.add_listener(node, MediaEventKind::TimeUpdate));
            }
            LoopTransition::Deactivated => {
                if let Some(old) = element.loop_listener.take() {
                    self.page.remove_listener(old);
                }
            }
            LoopTransition::Unchanged => {}
        }
        let ab = element.ab_loop;
        element.view.loop_badge = match (ab.point_a(), ab.point_b()) {
            (Some(a), Some(b)) if ab.is_active() => LoopBadge::Active { a, b },
            (Some(a), Some(b)) => LoopBadge::Paused { a, b },
            (Some(a), None) => LoopBadge::PointA(a),
            _ => LoopBadge::None,
        };
        trace::log_loop(node, &format!("{:?}", transition), ab.point_a(), ab.point_b());
        self.render(node);
    }

    /// Returns the new pitch-preservation state, `None` when unsupported.
    pub fn toggle_pitch(&mut self, node: NodeId) -> Option<bool> {
        if !self.is_running() {
            return None;
        }
        let pitch = self.element(node)?.pitch;
        if !pitch.is_supported() {
            return None;
        }
        let preserve = !pitch.get(&self.page, node).unwrap_or(true);
        pitch.set(&mut self.page, node, preserve);
        if let Some(element) = self.element_mut(node) {
            element.view.pitch = if preserve { PitchControl::On } else { PitchControl::Off };
        }
        self.render(node);
        Some(preserve)
    }

    pub fn adjust_volume_boost(&mut self, node: NodeId, delta: f64) -> Option<f64> {
        let current = match self.element(node)?.gain {
            GainState::Active { gain, .. } => gain,
            GainState::NotCreated => 1.0,
            GainState::Unsupported => return None,
        };
        self.set_volume_boost(node, current + delta, true)
    }

    /// Builds the gain node on first use. Failure disables the feature for
    /// this element only.
    pub fn set_volume_boost(&mut self, node: NodeId, gain: f64, persist: bool) -> Option<f64> {
        if !self.is_running() {
            return None;
        }
        let gain = clamp_volume_boost(gain);
        let state = self.element(node)?.gain;
        let gain_node = match state {
            GainState::Active { node: gain_node, .. } => gain_node,
            GainState::Unsupported => return None,
            GainState::NotCreated => match self.page.create_gain_node(node) {
                Ok(gain_node) => gain_node,
                Err(e) => {
                    trace::log_feature_unavailable(node, "Volume boost", &e);
                    if let Some(element) = self.element_mut(node) {
                        element.gain = GainState::Unsupported;
                        element.view.volume_boost = None;
                    }
                    self.page.show_toast(node, "Volume boost unavailable");
                    self.render(node);
                    return None;
                }
            },
        };
        self.page.set_gain(gain_node, gain);
        if let Some(element) = self.element_mut(node) {
            element.gain = GainState::Active { node: gain_node, gain };
            element.view.volume_boost = Some(gain);
        }
        self.render(node);
        if persist && !self.hostname.is_empty() {
            self.saved_volume = Some(gain);
            self.pending_volume = Some(gain);
            let delay = self.config.persist_debounce;
            self.timers.rearm(&mut self.page, TimerKind::PersistVolume, delay);
        }
        Some(gain)
    }

    pub fn set_filters(&mut self, node: NodeId, filters: VideoFilters) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(element) = self.element_mut(node) else {
            return false;
        };
        element.filters = filters;
        self.page.set_css_filter(node, &filters.to_css());
        if !self.hostname.is_empty() {
            self.saved_filters = Some(filters);
            self.pending_filters = Some(filters);
            let delay = self.config.persist_debounce;
            self.timers.rearm(&mut self.page, TimerKind::PersistFilters, delay);
        }
        true
    }

    /// Hands the current frame to the host once there is one to capture.
    pub fn screenshot(&mut self, node: NodeId) -> bool {
        if !self.is_running() || !self.is_tracked(node) {
            return false;
        }
        if self.page.ready_state(node) < ReadyState::HaveCurrentData {
            self.page.show_toast(node, "Video not ready for a screenshot");
            return false;
        }
        match self.page.capture_frame(node) {
            Ok(()) => true,
            Err(e) => {
                trace::log_feature_unavailable(node, "Screenshot", &e);
                false
            }
        }
    }

    pub fn toggle_picture_in_picture(&mut self, node: NodeId) -> bool {
        if !self.is_running() || !self.is_tracked(node) {
            return false;
        }
        match self.page.toggle_picture_in_picture(node) {
            Ok(()) => true,
            Err(e) => {
                trace::log_feature_unavailable(node, "Picture-in-picture", &e);
                false
            }
        }
    }

    /// Handles a click, wheel or hover on the overlay. Any interaction
    /// restarts the auto-hide countdown.
    pub fn overlay_action(&mut self, node: NodeId, action: OverlayAction) {
        if !self.is_running() || !self.is_tracked(node) {
            return;
        }
        match action {
            OverlayAction::Increase => {
                self.change_speed(node, 0.1);
            }
            OverlayAction::Decrease => {
                self.change_speed(node, -0.1);
            }
            OverlayAction::Reset => {
                self.set_speed(node, 1.0);
            }
            OverlayAction::Preset(speed) => {
                self.set_speed(node, speed);
            }
            OverlayAction::Seek(delta) => {
                self.seek(node, delta);
            }
            OverlayAction::TogglePitch => {
                self.toggle_pitch(node);
            }
            OverlayAction::Wheel { delta_y } if delta_y != 0.0 => {
                self.change_speed(node, if delta_y < 0.0 { 0.1 } else { -0.1 });
            }
            OverlayAction::Wheel { .. } | OverlayAction::Hover => {}
        }
        self.active = Some(node);
        self.reset_auto_hide(node);
    }

    /// Runs a shortcut action against `node`.
    pub fn dispatch_action(&mut self, node: NodeId, action: Action, value: f64) {
        match action {
            Action::ShowController => {
                self.toggle_overlay(node);
            }
            Action::IncreaseSpeed => {
                self.change_speed(node, value);
            }
            Action::DecreaseSpeed => {
                self.change_speed(node, -value);
            }
            Action::Rewind => {
                self.seek(node, -value);
            }
            Action::Advance => {
                self.seek(node, value);
            }
            Action::ResetSpeed => {
                self.set_speed(node, value);
            }
            Action::PreferredSpeed => {
                let current = self.page.playback_rate(node);
                if self.long_press.press(current) {
                    self.set_speed(node, value);
                }
            }
            Action::FrameForward => {
                self.frame_step(node, true);
            }
            Action::FrameBackward => {
                self.frame_step(node, false);
            }
            Action::SetLoopA => {
                self.set_loop_point(node, LoopPoint::A);
            }
            Action::SetLoopB => {
                self.set_loop_point(node, LoopPoint::B);
            }
            Action::ClearLoop => {
                self.clear_loop(node);
            }
            Action::ToggleLoop => {
                self.toggle_loop(node);
            }
            Action::TogglePip => {
                self.toggle_picture_in_picture(node);
            }
            Action::Screenshot => {
                self.screenshot(node);
            }
            Action::VolumeUp => {
                self.adjust_volume_boost(node, value);
            }
            Action::VolumeDown => {
                self.adjust_volume_boost(node, -value);
            }
        }
    }
}
