//! The page the engine runs in, seen through two traits.
//!
//! `PageHost` is the document and its media elements. `HostChannel` is the
//! asynchronous message channel to the settings service. Both are implemented
//! by the embedding (a browser binding, or a fake page in tests).

use std::future::Future;
use std::time::Duration;

use crate::error::{ChannelError, HostError};
use crate::message::{Request, Response};
use crate::overlay::{MenuItem, OverlayView};

/// Opaque handle for a node in the page document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MenuId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GainNodeId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

/// HTMLMediaElement readiness, in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Where an overlay is inserted relative to its element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayAnchor {
    /// Nearest non-static ancestor of the element.
    PositionedAncestor,
    /// A container the engine created around the element.
    Wrapper(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    Play,
    Pause,
    LoadedMetadata,
    RateChange,
    TimeUpdate,
    EnterPictureInPicture,
    LeavePictureInPicture,
}

pub trait PageHost {
    /// Full address of the page.
    fn location(&self) -> String;
    fn is_visible(&self) -> bool;
    /// Whether push-based navigation events are available.
    fn supports_navigation_api(&self) -> bool;

    /// Every video and audio element in document order.
    fn query_media(&self) -> Vec<NodeId>;
    /// Media elements at or below `node`, in document order.
    fn media_in_subtree(&self, node: NodeId) -> Vec<NodeId>;
    fn media_kind(&self, node: NodeId) -> Option<MediaKind>;
    /// Rendered width and height in CSS pixels.
    fn rendered_size(&self, node: NodeId) -> (f64, f64);
    fn has_positioned_ancestor(&self, node: NodeId) -> bool;
    /// Moves `node` into a new relatively positioned container.
    fn wrap_in_positioned_container(&mut self, node: NodeId) -> NodeId;

    fn insert_overlay(&mut self, node: NodeId, anchor: OverlayAnchor, view: &OverlayView) -> OverlayId;
    fn render_overlay(&mut self, overlay: OverlayId, view: &OverlayView);
    fn remove_overlay(&mut self, overlay: OverlayId);

    fn playback_rate(&self, node: NodeId) -> f64;
    fn set_playback_rate(&mut self, node: NodeId, rate: f64);
    fn current_time(&self, node: NodeId) -> f64;
    fn set_current_time(&mut self, node: NodeId, seconds: f64);
    /// `None` while the duration is unknown (NaN) or infinite (live streams).
    fn duration(&self, node: NodeId) -> Option<f64>;
    fn is_paused(&self, node: NodeId) -> bool;
    fn pause(&mut self, node: NodeId);
    fn ready_state(&self, node: NodeId) -> ReadyState;

    /// `None` when the property does not exist on the element.
    fn bool_property(&self, node: NodeId, name: &str) -> Option<bool>;
    fn set_bool_property(&mut self, node: NodeId, name: &str, value: bool);

    fn set_css_filter(&mut self, node: NodeId, filter: &str);
    fn toggle_picture_in_picture(&mut self, node: NodeId) -> Result<(), HostError>;
    fn create_gain_node(&mut self, node: NodeId) -> Result<GainNodeId, HostError>;
    fn set_gain(&mut self, gain: GainNodeId, value: f64);
    fn release_gain_node(&mut self, gain: GainNodeId);
    /// Hands the current frame to the screenshot writer.
    fn capture_frame(&mut self, node: NodeId) -> Result<(), HostError>;
    /// Transient on-video feedback.
    fn show_toast(&mut self, node: NodeId, message: &str);

    fn open_menu(&mut self, x: f64, y: f64, items: &[MenuItem]) -> MenuId;
    fn close_menu(&mut self, menu: MenuId);

    fn add_listener(&mut self, node: NodeId, kind: MediaEventKind) -> ListenerId;
    fn remove_listener(&mut self, listener: ListenerId);
    fn set_timer(&mut self, delay: Duration) -> TimerId;
    fn clear_timer(&mut self, timer: TimerId);
}

pub trait HostChannel {
    /// Cheap probe of whether the channel can still carry messages.
    fn is_alive(&self) -> bool;
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, ChannelError>>;
}
