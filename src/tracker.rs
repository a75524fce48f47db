//! Time-saved accounting.
//!
//! Runs on a low-priority recurring timer. Each tick adds
//! `elapsed * (rate - 1)` for every element playing above 1x and reports the
//! sum as one update.

use std::time::{Duration, Instant};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct TimeSavedTracker {
    last_tick: Instant,
}

impl TimeSavedTracker {
    pub fn new(now: Instant) -> Self {
        Self { last_tick: now }
    }

    /// `rates` yields the playback rate of each element that is playing.
    /// Hidden pages only advance the clock so time spent hidden is not counted.
    pub fn tick(&mut self, now: Instant, visible: bool, rates: impl IntoIterator<Item = f64>) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        if !visible {
            return None;
        }
        let saved: f64 = rates
            .into_iter()
            .filter(|rate| *rate > 1.0)
            .map(|rate| elapsed * (rate - 1.0))
            .sum();
        (saved > 0.0).then_some(saved)
    }
}
