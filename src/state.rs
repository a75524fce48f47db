use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ab_loop::AbLoop;
use crate::commands::LongPress;
use crate::effects::VideoFilters;
use crate::guard::ContextGuard;
use crate::host::{GainNodeId, HostChannel, ListenerId, MediaKind, MenuId, NodeId, OverlayId, PageHost, TimerId};
use crate::message::IntroOutroConfig;
use crate::navigation::NavigationWatcher;
use crate::overlay::OverlayView;
use crate::pitch::PitchSupport;
use crate::rules::BlockReason;
use crate::settings::Settings;
use crate::skip::SkipSession;
use crate::tracker::{TICK_PERIOD, TimeSavedTracker};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Videos smaller than this in both dimensions are treated as ad or
    /// tracking pixels.
    pub min_video_size: f64,
    /// Approximate frame length used by frame stepping.
    pub frame_duration: f64,
    pub highlight_duration: Duration,
    /// Rapid speed, volume and filter changes are coalesced into one write.
    pub persist_debounce: Duration,
    pub tracker_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_video_size: 100.0,
            frame_duration: 1.0 / 30.0,
            highlight_duration: Duration::from_millis(200),
            persist_debounce: Duration::from_millis(500),
            tracker_period: TICK_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    Active,
    Blocked(BlockReason),
}

/// Volume boost audio graph for one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainState {
    NotCreated,
    Active { node: GainNodeId, gain: f64 },
    /// Graph construction failed; the control is shown disabled.
    Unsupported,
}

/// One media element under control.
#[derive(Debug)]
pub struct ControlledElement {
    pub node: NodeId,
    pub kind: MediaKind,
    pub overlay: OverlayId,
    pub view: OverlayView,
    pub pitch: PitchSupport,
    pub ab_loop: AbLoop,
    pub loop_listener: Option<ListenerId>,
    pub skip: SkipSession,
    pub listeners: Vec<ListenerId>,
    pub gain: GainState,
    pub filters: VideoFilters,
    /// Container created because no positioned ancestor existed.
    pub wrapper: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    HighlightEnd(NodeId),
    AutoHide(NodeId),
    PersistSpeed,
    PersistVolume,
    PersistFilters,
    NavigationPoll,
    TimeSavedTick,
}

impl TimerKind {
    fn belongs_to(&self, node: NodeId) -> bool {
        matches!(self, TimerKind::HighlightEnd(n) | TimerKind::AutoHide(n) if *n == node)
    }
}

/// Every timer the engine has armed on the host, so each can be cancelled
/// alone or all at once.
#[derive(Debug, Default)]
pub struct Timers {
    armed: HashMap<TimerId, TimerKind>,
}

impl Timers {
    /// Arms `kind`, replacing an armed timer of the same kind.
    pub fn rearm<P: PageHost>(&mut self, page: &mut P, kind: TimerKind, delay: Duration) -> TimerId {
        self.cancel_where(page, |k| *k == kind);
        let id = page.set_timer(delay);
        self.armed.insert(id, kind);
        id
    }

    /// Removes a fired timer, returning what it was for.
    pub fn fired(&mut self, id: TimerId) -> Option<TimerKind> {
        self.armed.remove(&id)
    }

    pub fn cancel_where<P: PageHost>(&mut self, page: &mut P, pred: impl Fn(&TimerKind) -> bool) -> usize {
        let ids: Vec<TimerId> = self
            .armed
            .iter()
            .filter(|(_, kind)| pred(kind))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.armed.remove(id);
            page.clear_timer(*id);
        }
        ids.len()
    }

    pub fn cancel_for_node<P: PageHost>(&mut self, page: &mut P, node: NodeId) -> usize {
        self.cancel_where(page, |kind| kind.belongs_to(node))
    }

    pub fn cancel_all<P: PageHost>(&mut self, page: &mut P) -> usize {
        self.cancel_where(page, |_| true)
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed.values().any(|k| *k == kind)
    }

    pub fn id_of(&self, kind: TimerKind) -> Option<TimerId> {
        self.armed.iter().find(|(_, k)| **k == kind).map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenMenu {
    pub id: MenuId,
    pub target: NodeId,
}

/// Per-page media control engine. One instance per page context; all state
/// lives here rather than in globals so independent instances never collide.
pub struct Engine<P, C> {
    pub(crate) page: P,
    pub(crate) guard: ContextGuard<C>,
    pub(crate) config: EngineConfig,
    pub(crate) settings: Settings,
    pub(crate) skip_config: IntroOutroConfig,
    pub(crate) status: EngineStatus,
    pub(crate) torn_down: bool,
    pub(crate) page_url: String,
    pub(crate) hostname: String,
    /// Exclusively owned here; other components look elements up by node.
    pub(crate) elements: Vec<ControlledElement>,
    pub(crate) active: Option<NodeId>,
    pub(crate) long_press: LongPress,
    pub(crate) timers: Timers,
    pub(crate) navigation: Option<NavigationWatcher>,
    pub(crate) tracker: TimeSavedTracker,
    pub(crate) menu: Option<OpenMenu>,
    pub(crate) saved_filters: Option<VideoFilters>,
    pub(crate) saved_volume: Option<f64>,
    pub(crate) pending_speed: Option<f64>,
    pub(crate) pending_volume: Option<f64>,
    pub(crate) pending_filters: Option<VideoFilters>,
}

impl<P: PageHost, C: HostChannel> Engine<P, C> {
    pub fn new(page: P, channel: C) -> Self {
        Self::with_config(page, channel, EngineConfig::default())
    }

    pub fn with_config(page: P, channel: C, config: EngineConfig) -> Self {
        Self {
            page,
            guard: ContextGuard::new(channel),
            config,
            settings: Settings::default(),
            skip_config: IntroOutroConfig::default(),
            status: EngineStatus::Uninitialized,
            torn_down: false,
            page_url: String::new(),
            hostname: String::new(),
            elements: Vec::new(),
            active: None,
            long_press: LongPress::default(),
            timers: Timers::default(),
            navigation: None,
            tracker: TimeSavedTracker::new(Instant::now()),
            menu: None,
            saved_filters: None,
            saved_volume: None,
            pending_speed: None,
            pending_volume: None,
            pending_filters: None,
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn channel(&self) -> &C {
        self.guard.channel()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn skip_config(&self) -> &IntroOutroConfig {
        &self.skip_config
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_initialized(&self) -> bool {
        self.status == EngineStatus::Active
    }

    /// Set once the context guard has unwound the engine.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.torn_down && self.status == EngineStatus::Active
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn tracked_count(&self) -> usize {
        self.elements.len()
    }

    pub fn tracked_nodes(&self) -> Vec<NodeId> {
        self.elements.iter().map(|e| e.node).collect()
    }

    pub fn element(&self, node: NodeId) -> Option<&ControlledElement> {
        self.elements.iter().find(|e| e.node == node)
    }

    pub(crate) fn element_mut(&mut self, node: NodeId) -> Option<&mut ControlledElement> {
        self.elements.iter_mut().find(|e| e.node == node)
    }

    pub fn is_tracked(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn long_press_active(&self) -> bool {
        self.long_press.is_active()
    }

    /// Most recently playing element, else the first playing one, else the
    /// first tracked one. Remembers the choice.
    pub(crate) fn resolve_active(&mut self) -> Option<NodeId> {
        if let Some(node) = self.active.filter(|n| self.is_tracked(*n)) {
            return Some(node);
        }
        let found = self
            .elements
            .iter()
            .find(|e| !self.page.is_paused(e.node))
            .or_else(|| self.elements.first())
            .map(|e| e.node);
        self.active = found;
        found
    }

    pub(crate) fn render(&mut self, node: NodeId) {
        if let Some(element) = self.elements.iter().find(|e| e.node == node) {
            self.page.render_overlay(element.overlay, &element.view);
        }
    }
}
