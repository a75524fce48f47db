//! Per-element visual filters and volume boost.

use serde::{Deserialize, Serialize};

pub const MIN_VOLUME_BOOST: f64 = 1.0;
pub const MAX_VOLUME_BOOST: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoFilters {
    /// Percent, 100 is unchanged.
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    /// Degrees.
    pub hue: f64,
    pub invert: bool,
}

impl Default for VideoFilters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            invert: false,
        }
    }
}

impl VideoFilters {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// CSS `filter` value; empty when nothing is changed.
    pub fn to_css(&self) -> String {
        if self.is_identity() {
            return String::new();
        }
        let mut parts = Vec::with_capacity(5);
        if self.brightness != 100.0 {
            parts.push(format!("brightness({}%)", self.brightness));
        }
        if self.contrast != 100.0 {
            parts.push(format!("contrast({}%)", self.contrast));
        }
        if self.saturation != 100.0 {
            parts.push(format!("saturate({}%)", self.saturation));
        }
        if self.hue != 0.0 {
            parts.push(format!("hue-rotate({}deg)", self.hue));
        }
        if self.invert {
            parts.push("invert(100%)".to_string());
        }
        parts.join(" ")
    }
}

pub fn clamp_volume_boost(gain: f64) -> f64 {
    if !gain.is_finite() {
        return MIN_VOLUME_BOOST;
    }
    let rounded = (gain * 100.0).round() / 100.0;
    rounded.clamp(MIN_VOLUME_BOOST, MAX_VOLUME_BOOST)
}
