//! SPA navigation detection.
//!
//! Address changes without a page reload are observed either through the
//! host's navigation events or, when those are unavailable, by polling the
//! location on a fixed interval.

use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchStrategy {
    /// Host pushes navigation events.
    Push,
    /// Location is sampled every `interval`.
    Poll { interval: Duration },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationChange {
    pub from: String,
    pub to: String,
}

#[derive(Debug)]
pub struct NavigationWatcher {
    last_url: String,
    strategy: WatchStrategy,
    stopped: bool,
}

impl NavigationWatcher {
    pub fn new(initial_url: impl Into<String>, push_available: bool) -> Self {
        let strategy = if push_available {
            WatchStrategy::Push
        } else {
            WatchStrategy::Poll {
                interval: POLL_INTERVAL,
            }
        };
        log::debug!("[NAV] watching with {:?}", strategy);
        Self {
            last_url: initial_url.into(),
            strategy,
            stopped: false,
        }
    }

    /// Interval to re-arm the poll timer with, if polling.
    pub fn poll_interval(&self) -> Option<Duration> {
        match (self.stopped, self.strategy) {
            (false, WatchStrategy::Poll { interval }) => Some(interval),
            _ => None,
        }
    }

    /// Record `url`; reports a change when it differs from the last one seen.
    pub fn observe(&mut self, url: &str) -> Option<NavigationChange> {
        if self.stopped || url == self.last_url {
            return None;
        }
        let from = std::mem::replace(&mut self.last_url, url.to_string());
        log::info!("[NAV] {} -> {}", from, url);
        Some(NavigationChange {
            from,
            to: url.to_string(),
        })
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}
