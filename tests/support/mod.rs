#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use vsc_engine::Engine;
use vsc_engine::error::HostError;
use vsc_engine::host::{
    GainNodeId, ListenerId, MediaEventKind, MediaKind, MenuId, NodeId, OverlayAnchor, OverlayId, PageHost,
    ReadyState, TimerId,
};
use vsc_engine::overlay::{MenuItem, OverlayView};
use vsc_engine::service::{LocalChannel, ServiceConfig, SettingsService, SharedService, shared};
use vsc_engine::settings::Settings;
use vsc_engine::store::{MemoryStore, PersistedState};

pub type TestEngine = Engine<FakePage, LocalChannel<MemoryStore>>;

#[derive(Debug, Clone)]
pub struct Media {
    pub kind: MediaKind,
    pub width: f64,
    pub height: f64,
    pub rate: f64,
    pub time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub ready: ReadyState,
    pub props: HashMap<String, bool>,
    pub filter: String,
}

impl Media {
    fn new(kind: MediaKind, width: f64, height: f64) -> Self {
        let mut props = HashMap::new();
        props.insert("preservesPitch".to_string(), true);
        Self {
            kind,
            width,
            height,
            rate: 1.0,
            time: 0.0,
            duration: Some(600.0),
            paused: true,
            ready: ReadyState::HaveEnoughData,
            props,
            filter: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    attached: bool,
    positioned: bool,
    media: Option<Media>,
}

/// In-memory page: a node arena plus every resource the engine can create.
#[derive(Debug)]
pub struct FakePage {
    pub url: String,
    pub visible: bool,
    pub navigation_api: bool,
    nodes: BTreeMap<NodeId, Node>,
    next_id: u64,
    pub overlays: HashMap<OverlayId, (NodeId, OverlayView)>,
    pub listeners: BTreeMap<ListenerId, (NodeId, MediaEventKind)>,
    pub timers: HashMap<TimerId, Duration>,
    pub menus: HashMap<MenuId, Vec<MenuItem>>,
    pub toasts: Vec<(NodeId, String)>,
    pub gains: HashMap<GainNodeId, f64>,
    pub gain_unavailable: bool,
    pub captures: Vec<NodeId>,
    pub pip: Option<NodeId>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            visible: true,
            navigation_api: true,
            nodes: BTreeMap::new(),
            next_id: 1,
            overlays: HashMap::new(),
            listeners: BTreeMap::new(),
            timers: HashMap::new(),
            menus: HashMap::new(),
            toasts: Vec::new(),
            gains: HashMap::new(),
            gain_unavailable: false,
            captures: Vec::new(),
            pip: None,
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, parent: Option<NodeId>, media: Option<Media>) -> NodeId {
        let id = NodeId(self.next());
        self.nodes.insert(
            id,
            Node {
                parent,
                attached: true,
                positioned: true,
                media,
            },
        );
        id
    }

    pub fn add_container(&mut self) -> NodeId {
        self.insert(None, None)
    }

    pub fn add_video(&mut self, width: f64, height: f64) -> NodeId {
        self.insert(None, Some(Media::new(MediaKind::Video, width, height)))
    }

    pub fn add_video_in(&mut self, parent: NodeId, width: f64, height: f64) -> NodeId {
        self.insert(Some(parent), Some(Media::new(MediaKind::Video, width, height)))
    }

    pub fn add_audio(&mut self) -> NodeId {
        self.insert(None, Some(Media::new(MediaKind::Audio, 300.0, 40.0)))
    }

    /// Detaches `node` and everything below it from the document.
    pub fn remove(&mut self, node: NodeId) {
        let below: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|n| self.is_within(*n, node))
            .collect();
        for n in below {
            if let Some(entry) = self.nodes.get_mut(&n) {
                entry.attached = false;
            }
        }
    }

    pub fn set_unpositioned(&mut self, node: NodeId) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.positioned = false;
        }
    }

    fn is_within(&self, mut node: NodeId, root: NodeId) -> bool {
        loop {
            if node == root {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    pub fn media(&self, node: NodeId) -> &Media {
        self.nodes[&node].media.as_ref().expect("not a media node")
    }

    pub fn media_mut(&mut self, node: NodeId) -> &mut Media {
        self.nodes
            .get_mut(&node)
            .and_then(|n| n.media.as_mut())
            .expect("not a media node")
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[&node].parent
    }

    pub fn overlay_for(&self, node: NodeId) -> Option<&OverlayView> {
        self.overlays.values().find(|(n, _)| *n == node).map(|(_, view)| view)
    }

    pub fn listeners_for(&self, node: NodeId, kind: MediaEventKind) -> Vec<ListenerId> {
        self.listeners
            .iter()
            .filter(|(_, (n, k))| *n == node && *k == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn last_toast(&self) -> Option<&str> {
        self.toasts.last().map(|(_, message)| message.as_str())
    }
}

impl PageHost for FakePage {
    fn location(&self) -> String {
        self.url.clone()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn supports_navigation_api(&self) -> bool {
        self.navigation_api
    }

    fn query_media(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.attached && n.media.is_some())
            .map(|(id, _)| *id)
            .collect()
    }

    fn media_in_subtree(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(id, n)| n.media.is_some() && self.is_within(**id, node))
            .map(|(id, _)| *id)
            .collect()
    }

    fn media_kind(&self, node: NodeId) -> Option<MediaKind> {
        self.nodes.get(&node)?.media.as_ref().map(|m| m.kind)
    }

    fn rendered_size(&self, node: NodeId) -> (f64, f64) {
        self.nodes
            .get(&node)
            .and_then(|n| n.media.as_ref())
            .map_or((0.0, 0.0), |m| (m.width, m.height))
    }

    fn has_positioned_ancestor(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.positioned)
    }

    fn wrap_in_positioned_container(&mut self, node: NodeId) -> NodeId {
        let old_parent = self.nodes[&node].parent;
        let wrapper = self.insert(old_parent, None);
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.parent = Some(wrapper);
            entry.positioned = true;
        }
        wrapper
    }

    fn insert_overlay(&mut self, node: NodeId, _anchor: OverlayAnchor, view: &OverlayView) -> OverlayId {
        let id = OverlayId(self.next());
        self.overlays.insert(id, (node, view.clone()));
        id
    }

    fn render_overlay(&mut self, overlay: OverlayId, view: &OverlayView) {
        if let Some(entry) = self.overlays.get_mut(&overlay) {
            entry.1 = view.clone();
        }
    }

    fn remove_overlay(&mut self, overlay: OverlayId) {
        self.overlays.remove(&overlay);
    }

    fn playback_rate(&self, node: NodeId) -> f64 {
        self.media(node).rate
    }

    fn set_playback_rate(&mut self, node: NodeId, rate: f64) {
        self.media_mut(node).rate = rate;
    }

    fn current_time(&self, node: NodeId) -> f64 {
        self.media(node).time
    }

    fn set_current_time(&mut self, node: NodeId, seconds: f64) {
        self.media_mut(node).time = seconds;
    }

    fn duration(&self, node: NodeId) -> Option<f64> {
        self.media(node).duration
    }

    fn is_paused(&self, node: NodeId) -> bool {
        self.media(node).paused
    }

    fn pause(&mut self, node: NodeId) {
        self.media_mut(node).paused = true;
    }

    fn ready_state(&self, node: NodeId) -> ReadyState {
        self.media(node).ready
    }

    fn bool_property(&self, node: NodeId, name: &str) -> Option<bool> {
        self.media(node).props.get(name).copied()
    }

    fn set_bool_property(&mut self, node: NodeId, name: &str, value: bool) {
        self.media_mut(node).props.insert(name.to_string(), value);
    }

    fn set_css_filter(&mut self, node: NodeId, filter: &str) {
        self.media_mut(node).filter = filter.to_string();
    }

    fn toggle_picture_in_picture(&mut self, node: NodeId) -> Result<(), HostError> {
        self.pip = if self.pip == Some(node) { None } else { Some(node) };
        Ok(())
    }

    fn create_gain_node(&mut self, _node: NodeId) -> Result<GainNodeId, HostError> {
        if self.gain_unavailable {
            return Err(HostError::AudioGraph {
                reason: "media already captured by another context".into(),
            });
        }
        let id = GainNodeId(self.next());
        self.gains.insert(id, 1.0);
        Ok(id)
    }

    fn set_gain(&mut self, gain: GainNodeId, value: f64) {
        self.gains.insert(gain, value);
    }

    fn release_gain_node(&mut self, gain: GainNodeId) {
        self.gains.remove(&gain);
    }

    fn capture_frame(&mut self, node: NodeId) -> Result<(), HostError> {
        self.captures.push(node);
        Ok(())
    }

    fn show_toast(&mut self, node: NodeId, message: &str) {
        self.toasts.push((node, message.to_string()));
    }

    fn open_menu(&mut self, _x: f64, _y: f64, items: &[MenuItem]) -> MenuId {
        let id = MenuId(self.next());
        self.menus.insert(id, items.to_vec());
        id
    }

    fn close_menu(&mut self, menu: MenuId) {
        self.menus.remove(&menu);
    }

    fn add_listener(&mut self, node: NodeId, kind: MediaEventKind) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.insert(id, (node, kind));
        id
    }

    fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn set_timer(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next());
        self.timers.insert(id, delay);
        id
    }

    fn clear_timer(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }
}

pub fn service_with(settings: Settings) -> SharedService<MemoryStore> {
    service_with_state(PersistedState {
        settings,
        ..PersistedState::default()
    })
}

pub fn service_with_state(state: PersistedState) -> SharedService<MemoryStore> {
    shared(SettingsService::new(
        MemoryStore::with_state(state),
        ServiceConfig::default(),
    ))
}

pub fn engine_on(page: FakePage, service: &SharedService<MemoryStore>) -> TestEngine {
    Engine::new(page, LocalChannel::new(service.clone()))
}

/// Delivers `kind` to every listener the engine has on `node`, as the
/// browser would.
pub fn fire(engine: &mut TestEngine, node: NodeId, kind: MediaEventKind) {
    for listener in engine.page().listeners_for(node, kind) {
        engine.handle_media_event(listener);
    }
}

/// Moves the play position and delivers the time update.
pub fn play_to(engine: &mut TestEngine, node: NodeId, seconds: f64) {
    engine.page_mut().media_mut(node).time = seconds;
    fire(engine, node, MediaEventKind::TimeUpdate);
}

/// Fires a host timer the way the browser would: once, then it is gone.
pub async fn fire_timer(engine: &mut TestEngine, id: TimerId) {
    engine.page_mut().timers.remove(&id);
    engine.on_timer(id).await;
}
