use std::time::Instant;

use crate::commands::{KeyInput, is_long_press_release, match_shortcut, match_skip_hotkey};
use crate::discovery::ELEMENT_EVENTS;
use crate::guard::Reply;
use crate::host::{HostChannel, ListenerId, MediaEventKind, MediaKind, NodeId, PageHost, TimerId};
use crate::message::{GlobalCommand, InboundMessage, Request, Response};
use crate::navigation::NavigationWatcher;
use crate::overlay::{PitchControl, speed_menu};
use crate::resolve::{fetch_skip_config, resolve_rate};
use crate::rules::{BlockReason, hostname_of};
use crate::settings::Settings;
use crate::skip::{SkipAction, SkipDirection};
use crate::state::{Engine, EngineStatus, OpenMenu, TimerKind};
use crate::tracker::TimeSavedTracker;
use crate::trace;

/// What a fired listener is wired to.
enum ListenerSlot {
    Element(MediaEventKind),
    Loop,
}

impl<P: PageHost, C: HostChannel> Engine<P, C> {
    /// Brings the engine up on the current page: site access, settings,
    /// per-site state, navigation and tracking, then the initial scan.
    pub async fn init(&mut self) -> EngineStatus {
        if self.torn_down || self.status != EngineStatus::Uninitialized {
            return self.status;
        }
        self.page_url = self.page.location();
        self.hostname = hostname_of(&self.page_url);

        let access = self
            .guard
            .request(Request::CheckSiteAccess {
                url: self.page_url.clone(),
            })
            .await;
        if let Reply::Value(Response::SiteAccess(decision)) = &access {
            if decision.blocked {
                let reason = decision.reason.unwrap_or(BlockReason::Disabled);
                log::info!("[LIFECYCLE] {} is blocked ({:?})", self.page_url, reason);
                self.status = EngineStatus::Blocked(reason);
                return self.status;
            }
        }

        match self.guard.request(Request::GetSettings).await {
            Reply::Value(Response::Settings { settings }) => self.settings = *settings,
            _ if self.guard.is_tripped() => {
                self.shutdown();
                return self.status;
            }
            _ => log::warn!("[LIFECYCLE] settings unavailable, using defaults"),
        }
        if !self.settings.enabled {
            self.status = EngineStatus::Blocked(BlockReason::Disabled);
            return self.status;
        }

        let hostname = self.hostname.clone();
        let (skip_config, filters, volume) = futures::join!(
            fetch_skip_config(&self.guard, &hostname),
            self.guard.request(Request::GetFilters {
                hostname: hostname.clone(),
            }),
            self.guard.request(Request::GetVolumeBoost {
                hostname: hostname.clone(),
            }),
        );
        if self.guard.is_tripped() {
            self.shutdown();
            return self.status;
        }
        self.skip_config = skip_config;
        if let Reply::Value(Response::Filters { filters }) = filters {
            self.saved_filters = filters;
        }
        if let Reply::Value(Response::VolumeBoost { gain }) = volume {
            self.saved_volume = gain;
        }

        self.navigation = Some(NavigationWatcher::new(
            self.page_url.clone(),
            self.page.supports_navigation_api(),
        ));
        self.arm_recurring_timers();

        self.status = EngineStatus::Active;
        log::info!("[LIFECYCLE] Engine active on {}", self.hostname);
        let attached = self.scan();
        self.resolve_and_apply(&attached).await;
        self.status
    }

    /// Starts the navigation poll (when polling) and the time-saved tick.
    fn arm_recurring_timers(&mut self) {
        if let Some(interval) = self.navigation.as_ref().and_then(|n| n.poll_interval()) {
            self.timers.rearm(&mut self.page, TimerKind::NavigationPoll, interval);
        }
        self.tracker = TimeSavedTracker::new(Instant::now());
        let period = self.config.tracker_period;
        self.timers.rearm(&mut self.page, TimerKind::TimeSavedTick, period);
    }

    fn listener_slot(&self, listener: ListenerId) -> Option<(NodeId, ListenerSlot)> {
        self.elements.iter().find_map(|e| {
            if e.loop_listener == Some(listener) {
                return Some((e.node, ListenerSlot::Loop));
            }
            e.listeners
                .iter()
                .position(|l| *l == listener)
                .and_then(|i| ELEMENT_EVENTS.get(i))
                .map(|kind| (e.node, ListenerSlot::Element(*kind)))
        })
    }

    /// Dispatches a fired media listener.
    pub fn handle_media_event(&mut self, listener: ListenerId) {
        if !self.is_running() {
            return;
        }
        let Some((node, slot)) = self.listener_slot(listener) else {
            return;
        };
        match slot {
            ListenerSlot::Loop => self.enforce_loop(node),
            ListenerSlot::Element(MediaEventKind::Play) => {
                self.active = Some(node);
                self.check_intro(node);
            }
            ListenerSlot::Element(MediaEventKind::LoadedMetadata) => self.check_intro(node),
            ListenerSlot::Element(MediaEventKind::Pause) => {}
            ListenerSlot::Element(MediaEventKind::RateChange) => self.sync_rate(node),
            ListenerSlot::Element(MediaEventKind::TimeUpdate) => self.check_outro(node),
            ListenerSlot::Element(MediaEventKind::EnterPictureInPicture) => self.set_pip_indicator(node, true),
            ListenerSlot::Element(MediaEventKind::LeavePictureInPicture) => self.set_pip_indicator(node, false),
        }
    }

    fn enforce_loop(&mut self, node: NodeId) {
        let position = self.page.current_time(node);
        let restart = self.element(node).and_then(|e| e.ab_loop.on_time_update(position));
        if let Some(point_a) = restart {
            self.page.set_current_time(node, point_a);
        }
    }

    /// Rate changed outside the engine (page script or native controls).
    fn sync_rate(&mut self, node: NodeId) {
        let rate = self.page.playback_rate(node);
        let Some(element) = self.element_mut(node) else {
            return;
        };
        if element.view.speed != rate {
            element.view.set_speed(rate);
            self.render(node);
        }
    }

    fn set_pip_indicator(&mut self, node: NodeId, on: bool) {
        let shown = on && self.settings.show_pip_indicator;
        if let Some(element) = self.element_mut(node) {
            element.view.picture_in_picture = shown;
        }
        self.render(node);
    }

    fn check_intro(&mut self, node: NodeId) {
        let position = self.page.current_time(node);
        let duration = self.page.duration(node);
        let Some(element) = self.elements.iter_mut().find(|e| e.node == node) else {
            return;
        };
        if let Some(action) = element.skip.on_playback_start(&self.skip_config, position, duration) {
            self.perform_skip(node, &action, false);
        }
    }

    fn check_outro(&mut self, node: NodeId) {
        let position = self.page.current_time(node);
        let duration = self.page.duration(node);
        let Some(element) = self.elements.iter_mut().find(|e| e.node == node) else {
            return;
        };
        if let Some(action) = element.skip.on_time_update(&self.skip_config, position, duration) {
            self.perform_skip(node, &action, false);
        }
    }

    /// Hotkey skip; always honored, even after an automatic one.
    pub fn manual_skip(&mut self, node: NodeId, direction: SkipDirection) -> bool {
        if !self.is_running() {
            return false;
        }
        let duration = self.page.duration(node);
        let Some(element) = self.elements.iter_mut().find(|e| e.node == node) else {
            return false;
        };
        let action = match direction {
            SkipDirection::Intro => element.skip.manual_intro(&self.skip_config, duration),
            SkipDirection::Outro => element.skip.manual_outro(&self.skip_config, duration),
        };
        match action {
            Some(action) => {
                self.perform_skip(node, &action, true);
                true
            }
            None => false,
        }
    }

    fn perform_skip(&mut self, node: NodeId, action: &SkipAction, manual: bool) {
        trace::log_skip(node, action, manual);
        self.page.set_current_time(node, action.seek_to);
        self.page.show_toast(node, &action.feedback());
    }

    /// Document key-down in capture phase. Returns true when the event was
    /// consumed.
    pub fn handle_key_down(&mut self, input: &KeyInput) -> bool {
        if !self.is_running() || input.in_text_field {
            return false;
        }
        if let Some(direction) = match_skip_hotkey(&self.skip_config, input) {
            return match self.resolve_active() {
                Some(node) => {
                    self.manual_skip(node, direction);
                    true
                }
                None => false,
            };
        }
        let Some(binding) = match_shortcut(&self.settings.shortcuts, input) else {
            return false;
        };
        let (action, value) = (binding.action, binding.value_or_default());
        let Some(node) = self.resolve_active() else {
            return false;
        };
        self.dispatch_action(node, action, value);
        true
    }

    /// Ends a preferred-speed long press, restoring the earlier rate.
    pub fn handle_key_up(&mut self, input: &KeyInput) -> bool {
        if !self.is_running() || input.in_text_field {
            return false;
        }
        if !is_long_press_release(&self.settings.shortcuts, input) {
            return false;
        }
        let Some(restore_to) = self.long_press.release() else {
            return false;
        };
        if let Some(node) = self.resolve_active() {
            self.set_speed(node, restore_to);
        }
        true
    }

    /// Right-click on a media element or its overlay. Returns true when the
    /// native menu should be suppressed.
    pub fn handle_context_menu(&mut self, node: NodeId, x: f64, y: f64) -> bool {
        if !self.is_running() || !self.is_tracked(node) {
            return false;
        }
        self.close_menu();
        let id = self.page.open_menu(x, y, &speed_menu());
        self.menu = Some(OpenMenu { id, target: node });
        true
    }

    pub fn handle_menu_select(&mut self, index: usize) -> bool {
        let Some(menu) = self.menu else {
            return false;
        };
        let Some(item) = speed_menu().into_iter().nth(index) else {
            return false;
        };
        self.close_menu();
        self.set_speed(menu.target, item.speed).is_some()
    }

    pub fn handle_document_click(&mut self) {
        self.close_menu();
    }

    pub fn has_open_menu(&self) -> bool {
        self.menu.is_some()
    }

    pub(crate) fn close_menu(&mut self) {
        if let Some(menu) = self.menu.take() {
            self.page.close_menu(menu.id);
        }
    }

    /// Messages pushed by the service, the popup and manifest hotkeys.
    pub async fn handle_message(&mut self, message: InboundMessage) {
        if self.torn_down {
            return;
        }
        match message {
            InboundMessage::SettingsUpdated { settings } => self.apply_settings(*settings).await,
            InboundMessage::Command { command } => self.run_global_command(command),
            InboundMessage::SetSpeed { speed } => {
                if let Some(node) = self.resolve_active() {
                    self.set_speed(node, speed);
                }
            }
        }
    }

    fn run_global_command(&mut self, command: GlobalCommand) {
        if !self.is_running() {
            return;
        }
        log::debug!("[LIFECYCLE] global command {:?}", command);
        let Some(node) = self.resolve_active() else {
            return;
        };
        match command {
            GlobalCommand::IncreaseSpeed => {
                self.change_speed(node, 0.1);
            }
            GlobalCommand::DecreaseSpeed => {
                self.change_speed(node, -0.1);
            }
            GlobalCommand::ResetSpeed => {
                self.set_speed(node, 1.0);
            }
            GlobalCommand::ToggleController => {
                self.toggle_overlay(node);
            }
        }
    }

    /// Replaces the settings snapshot and reconciles what depends on it.
    pub async fn apply_settings(&mut self, settings: Settings) {
        if self.torn_down {
            return;
        }
        let previous = std::mem::replace(&mut self.settings, settings);
        match self.status {
            EngineStatus::Active if !self.settings.enabled => {
                for node in self.tracked_nodes() {
                    self.detach(node);
                }
                self.close_menu();
                self.status = EngineStatus::Blocked(BlockReason::Disabled);
                log::info!("[LIFECYCLE] Disabled, released every element");
                return;
            }
            EngineStatus::Blocked(BlockReason::Disabled) if self.settings.enabled && self.navigation.is_some() => {
                self.status = EngineStatus::Active;
                log::info!("[LIFECYCLE] Re-enabled, rescanning");
                self.arm_recurring_timers();
                let attached = self.scan();
                self.resolve_and_apply(&attached).await;
                return;
            }
            EngineStatus::Active => {}
            _ => return,
        }

        for element in &mut self.elements {
            element.view.restyle(&self.settings);
        }
        if previous.preserve_pitch != self.settings.preserve_pitch {
            let preserve = self.settings.preserve_pitch;
            for element in &mut self.elements {
                if element.pitch.set(&mut self.page, element.node, preserve) {
                    element.view.pitch = if preserve { PitchControl::On } else { PitchControl::Off };
                }
            }
        }
        for node in self.tracked_nodes() {
            self.render(node);
        }

        if previous.work_on_audio != self.settings.work_on_audio {
            if self.settings.work_on_audio {
                let attached = self.scan();
                self.resolve_and_apply(&attached).await;
            } else {
                let audio: Vec<NodeId> = self
                    .elements
                    .iter()
                    .filter(|e| e.kind == MediaKind::Audio)
                    .map(|e| e.node)
                    .collect();
                for node in audio {
                    self.detach(node);
                }
            }
        }

        if previous.intro_outro != self.settings.intro_outro && self.is_running() {
            self.skip_config = fetch_skip_config(&self.guard, &self.hostname).await;
            if self.guard.is_tripped() {
                self.shutdown();
            }
        }
    }

    /// A timer armed through the host fired.
    pub async fn on_timer(&mut self, id: TimerId) {
        let Some(kind) = self.timers.fired(id) else {
            return;
        };
        if !self.is_running() {
            return;
        }
        match kind {
            TimerKind::HighlightEnd(node) => {
                if let Some(element) = self.element_mut(node) {
                    element.view.highlighted = false;
                }
                self.render(node);
            }
            TimerKind::AutoHide(node) => {
                if let Some(element) = self.element_mut(node) {
                    element.view.hidden = true;
                }
                self.render(node);
            }
            TimerKind::PersistSpeed => {
                if let Some(speed) = self.pending_speed.take() {
                    let hostname = self.hostname.clone();
                    self.guard.notify(Request::SaveSpeed { hostname, speed }).await;
                }
            }
            TimerKind::PersistVolume => {
                if let Some(gain) = self.pending_volume.take() {
                    let hostname = self.hostname.clone();
                    self.guard.notify(Request::SaveVolumeBoost { hostname, gain }).await;
                }
            }
            TimerKind::PersistFilters => {
                if let Some(filters) = self.pending_filters.take() {
                    let hostname = self.hostname.clone();
                    self.guard.notify(Request::SaveFilters { hostname, filters }).await;
                }
            }
            TimerKind::NavigationPoll => {
                self.on_navigation().await;
                let interval = self.navigation.as_ref().and_then(|n| n.poll_interval());
                match interval {
                    Some(interval) if self.is_running() => {
                        self.timers.rearm(&mut self.page, TimerKind::NavigationPoll, interval);
                    }
                    _ => {}
                }
            }
            TimerKind::TimeSavedTick => {
                self.track_time_saved(Instant::now()).await;
                if self.is_running() {
                    let period = self.config.tracker_period;
                    self.timers.rearm(&mut self.page, TimerKind::TimeSavedTick, period);
                }
            }
        }
        if self.guard.is_tripped() {
            self.shutdown();
        }
    }

    /// Address may have changed without a reload (navigation event, history
    /// back/forward, or a poll tick). Returns true when it had.
    pub async fn on_navigation(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        let url = self.page.location();
        let Some(change) = self.navigation.as_mut().and_then(|n| n.observe(&url)) else {
            return false;
        };
        self.page_url = change.to;
        self.hostname = hostname_of(&self.page_url);
        for element in &mut self.elements {
            element.skip.reset();
        }

        let (decision, skip_config) = futures::join!(
            resolve_rate(&self.guard, &self.settings, &self.page_url, &self.hostname),
            fetch_skip_config(&self.guard, &self.hostname),
        );
        if self.guard.is_tripped() {
            self.shutdown();
            return false;
        }
        self.skip_config = skip_config;
        for node in self.tracked_nodes() {
            self.apply_decision(node, &decision);
        }
        true
    }

    /// One time-saved tick; reports the sum for all fast elements at once.
    pub async fn track_time_saved(&mut self, now: Instant) {
        if !self.is_running() {
            return;
        }
        let visible = self.page.is_visible();
        let page = &self.page;
        let rates = self
            .elements
            .iter()
            .filter(|e| !page.is_paused(e.node))
            .map(|e| page.playback_rate(e.node));
        let Some(seconds) = self.tracker.tick(now, visible, rates) else {
            return;
        };
        self.guard.notify(Request::AddTimeSaved { seconds }).await;
        if self.guard.is_tripped() {
            self.shutdown();
        }
    }

    /// Unwinds everything the engine put on the page. Idempotent.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        let timers = self.timers.cancel_all(&mut self.page);
        let elements = std::mem::take(&mut self.elements);
        let listeners: usize = elements
            .iter()
            .map(|e| e.listeners.len() + usize::from(e.loop_listener.is_some()))
            .sum();
        for element in &elements {
            self.release(element);
        }
        self.close_menu();
        if let Some(navigation) = self.navigation.as_mut() {
            navigation.stop();
        }
        self.active = None;
        self.long_press = Default::default();
        self.pending_speed = None;
        self.pending_volume = None;
        self.pending_filters = None;
        self.status = EngineStatus::Uninitialized;
        trace::log_shutdown(elements.len(), timers, listeners);
    }
}
