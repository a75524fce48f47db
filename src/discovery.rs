//! Media discovery and the attach/detach lifecycle.

use crate::host::{HostChannel, MediaEventKind, MediaKind, NodeId, OverlayAnchor, PageHost};
use crate::overlay::{OverlayView, PitchControl};
use crate::pitch::PitchSupport;
use crate::resolve::{RateDecision, RateSource, resolve_rate, should_apply};
use crate::state::{ControlledElement, Engine, GainState};
use crate::trace;

/// Listeners every controlled element gets on attach.
pub(crate) const ELEMENT_EVENTS: [MediaEventKind; 7] = [
    MediaEventKind::Play,
    MediaEventKind::Pause,
    MediaEventKind::LoadedMetadata,
    MediaEventKind::RateChange,
    MediaEventKind::TimeUpdate,
    MediaEventKind::EnterPictureInPicture,
    MediaEventKind::LeavePictureInPicture,
];

/// One batch of DOM changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl<P: PageHost, C: HostChannel> Engine<P, C> {
    fn is_eligible(&self, node: NodeId) -> Option<MediaKind> {
        let kind = self.page.media_kind(node)?;
        match kind {
            MediaKind::Audio if !self.settings.work_on_audio => None,
            MediaKind::Audio => Some(kind),
            MediaKind::Video => {
                let (width, height) = self.page.rendered_size(node);
                let min = self.config.min_video_size;
                if width < min && height < min {
                    trace::log_skipped_small(node, width, height);
                    None
                } else {
                    Some(kind)
                }
            }
        }
    }

    /// Attaches every eligible element currently in the document.
    /// Returns the newly attached ones.
    pub fn scan(&mut self) -> Vec<NodeId> {
        if !self.is_running() {
            return Vec::new();
        }
        let nodes = self.page.query_media();
        nodes.into_iter().filter(|node| self.attach(*node)).collect()
    }

    /// Starts controlling `node`. The initial rate is applied separately once
    /// the asynchronous resolution completes.
    pub fn attach(&mut self, node: NodeId) -> bool {
        if !self.is_running() || self.is_tracked(node) {
            return false;
        }
        let Some(kind) = self.is_eligible(node) else {
            return false;
        };

        let wrapper = if self.page.has_positioned_ancestor(node) {
            None
        } else {
            Some(self.page.wrap_in_positioned_container(node))
        };
        let anchor = wrapper.map_or(OverlayAnchor::PositionedAncestor, OverlayAnchor::Wrapper);

        let pitch = PitchSupport::probe(&self.page, node);
        pitch.set(&mut self.page, node, self.settings.preserve_pitch);

        let mut view = OverlayView::new(&self.settings, self.page.playback_rate(node));
        view.pitch = match pitch.get(&self.page, node) {
            Some(true) => PitchControl::On,
            Some(false) => PitchControl::Off,
            None => PitchControl::Unsupported,
        };

        if let Some(filters) = self.saved_filters {
            self.page.set_css_filter(node, &filters.to_css());
        }

        let overlay = self.page.insert_overlay(node, anchor, &view);
        let listeners = ELEMENT_EVENTS
            .iter()
            .map(|kind| self.page.add_listener(node, *kind))
            .collect();

        self.elements.push(ControlledElement {
            node,
            kind,
            overlay,
            view,
            pitch,
            ab_loop: Default::default(),
            loop_listener: None,
            skip: Default::default(),
            listeners,
            gain: GainState::NotCreated,
            filters: self.saved_filters.unwrap_or_default(),
            wrapper,
        });
        trace::log_attached(node, wrapper.is_some(), self.elements.len());

        if let Some(gain) = self.saved_volume.filter(|g| *g > 1.0) {
            self.set_volume_boost(node, gain, false);
        }
        true
    }

    /// Stops controlling `node` and releases everything attached to it.
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(index) = self.elements.iter().position(|e| e.node == node) else {
            return false;
        };
        let element = self.elements.remove(index);
        self.release(&element);
        self.timers.cancel_for_node(&mut self.page, node);
        if self.active == Some(node) {
            self.active = None;
        }
        if self.menu.is_some_and(|m| m.target == node) {
            self.close_menu();
        }
        trace::log_detached(node, self.elements.len());
        true
    }

    pub(crate) fn release(&mut self, element: &ControlledElement) {
        self.page.remove_overlay(element.overlay);
        for listener in element.listeners.iter().chain(element.loop_listener.iter()) {
            self.page.remove_listener(*listener);
        }
        if let GainState::Active { node, .. } = element.gain {
            self.page.release_gain_node(node);
        }
    }

    /// Applies a batch of DOM mutations, including media nested inside added
    /// or removed subtrees, then resolves rates for what was attached.
    pub async fn handle_mutations(&mut self, records: &[MutationRecord]) {
        if !self.is_running() {
            return;
        }
        let mut attached = Vec::new();
        for record in records {
            for node in &record.added {
                for media in self.page.media_in_subtree(*node) {
                    if self.attach(media) {
                        attached.push(media);
                    }
                }
            }
            for node in &record.removed {
                for media in self.page.media_in_subtree(*node) {
                    self.detach(media);
                    attached.retain(|n| *n != media);
                }
            }
        }
        self.resolve_and_apply(&attached).await;
    }

    /// Resolves the rate for the current page without applying it.
    pub async fn resolve_current(&self) -> RateDecision {
        if !self.is_running() {
            return RateDecision::native_default();
        }
        resolve_rate(&self.guard, &self.settings, &self.page_url, &self.hostname).await
    }

    pub(crate) async fn resolve_and_apply(&mut self, nodes: &[NodeId]) {
        if nodes.is_empty() || !self.is_running() {
            return;
        }
        let decision = self.resolve_current().await;
        if self.guard.is_tripped() {
            self.shutdown();
            return;
        }
        for node in nodes {
            self.apply_decision(*node, &decision);
        }
    }

    /// Applies a resolved rate unless the element's rate changed while the
    /// lookup was in flight (and "force" is off).
    pub fn apply_decision(&mut self, node: NodeId, decision: &RateDecision) -> bool {
        if !self.is_running() || !self.is_tracked(node) {
            return false;
        }
        if decision.source == RateSource::NativeDefault {
            return false;
        }
        let current = self.page.playback_rate(node);
        let applied = should_apply(current, self.settings.force_speed);
        trace::log_decision(node, decision.speed, &decision.source, applied);
        if applied {
            self.apply_speed(node, decision.speed, false);
        }
        applied
    }
}
