//! Engine event logging.
//!
//! Every message carries a bracketed category so output can be filtered with
//! `RUST_LOG` plus a grep.

use crate::host::NodeId;
use crate::resolve::RateSource;
use crate::skip::SkipAction;

/// Log categories for filtering
enum LogCategory {
    Lifecycle,
    Rate,
    Loop,
    Skip,
    Guard,
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Lifecycle => "LIFECYCLE",
            LogCategory::Rate => "RATE",
            LogCategory::Loop => "LOOP",
            LogCategory::Skip => "SKIP",
            LogCategory::Guard => "GUARD",
        }
    }
}

pub fn log_attached(node: NodeId, wrapped: bool, tracked: usize) {
    log::info!(
        "[{}] Attached to element {} (wrapped={}, tracked={})",
        LogCategory::Lifecycle.as_str(),
        node.0,
        wrapped,
        tracked
    );
}

pub fn log_detached(node: NodeId, tracked: usize) {
    log::info!(
        "[{}] Detached from element {} (tracked={})",
        LogCategory::Lifecycle.as_str(),
        node.0,
        tracked
    );
}

pub fn log_skipped_small(node: NodeId, width: f64, height: f64) {
    log::debug!(
        "[{}] Ignoring element {}: {}x{} is below the size threshold",
        LogCategory::Lifecycle.as_str(),
        node.0,
        width,
        height
    );
}

pub fn log_speed_set(node: NodeId, requested: f64, applied: f64) {
    if (requested - applied).abs() > f64::EPSILON {
        log::debug!(
            "[{}] Element {} speed {} clamped to {}",
            LogCategory::Rate.as_str(),
            node.0,
            requested,
            applied
        );
    } else {
        log::debug!("[{}] Element {} speed {}", LogCategory::Rate.as_str(), node.0, applied);
    }
}

pub fn log_decision(node: NodeId, speed: f64, source: &RateSource, applied: bool) {
    if applied {
        log::info!(
            "[{}] Element {} resolved to {} from {:?}",
            LogCategory::Rate.as_str(),
            node.0,
            speed,
            source
        );
    } else {
        log::debug!(
            "[{}] Element {} resolved to {} from {:?}, but its rate changed meanwhile; keeping it",
            LogCategory::Rate.as_str(),
            node.0,
            speed,
            source
        );
    }
}

pub fn log_loop(node: NodeId, what: &str, a: Option<f64>, b: Option<f64>) {
    log::debug!(
        "[{}] Element {} {}: A={:?} B={:?}",
        LogCategory::Loop.as_str(),
        node.0,
        what,
        a,
        b
    );
}

pub fn log_skip(node: NodeId, action: &SkipAction, manual: bool) {
    log::info!(
        "[{}] Element {} {:?} skip to {:.1}s (manual={})",
        LogCategory::Skip.as_str(),
        node.0,
        action.direction,
        action.seek_to,
        manual
    );
}

pub fn log_feature_unavailable(node: NodeId, feature: &str, reason: &dyn std::fmt::Display) {
    log::warn!(
        "[{}] {} unavailable for element {}: {}",
        LogCategory::Lifecycle.as_str(),
        feature,
        node.0,
        reason
    );
}

pub fn log_shutdown(overlays: usize, timers: usize, listeners: usize) {
    log::warn!(
        "[{}] Shutdown: removed {} overlays, cancelled {} timers and {} listeners",
        LogCategory::Guard.as_str(),
        overlays,
        timers,
        listeners
    );
}
