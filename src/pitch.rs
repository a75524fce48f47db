//! Playback rate and pitch-preservation access across vendor variants.

use crate::host::{NodeId, PageHost};

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 16.0;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Clamp to the supported range after rounding to two decimals.
pub fn normalize_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return DEFAULT_SPEED;
    }
    let rounded = (speed * 100.0).round() / 100.0;
    rounded.clamp(MIN_SPEED, MAX_SPEED)
}

/// Probed once per element and cached on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchSupport {
    Supported(&'static str),
    Unsupported,
}

const PITCH_PROPERTIES: [&str; 3] = ["preservesPitch", "mozPreservesPitch", "webkitPreservesPitch"];

impl PitchSupport {
    pub fn probe<P: PageHost>(page: &P, node: NodeId) -> Self {
        PITCH_PROPERTIES
            .iter()
            .find(|name| page.bool_property(node, name).is_some())
            .map_or(PitchSupport::Unsupported, |name| PitchSupport::Supported(*name))
    }

    pub fn is_supported(self) -> bool {
        matches!(self, PitchSupport::Supported(_))
    }

    pub fn get<P: PageHost>(self, page: &P, node: NodeId) -> Option<bool> {
        match self {
            PitchSupport::Supported(name) => page.bool_property(node, name),
            PitchSupport::Unsupported => None,
        }
    }

    /// Returns false when the element cannot preserve pitch.
    pub fn set<P: PageHost>(self, page: &mut P, node: NodeId, preserve: bool) -> bool {
        match self {
            PitchSupport::Supported(name) => {
                page.set_bool_property(node, name, preserve);
                true
            }
            PitchSupport::Unsupported => false,
        }
    }
}
