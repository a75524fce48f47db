//! Settings service: the persistence side of the page/host boundary.
//!
//! Hot-path writes (speed, filters, volume, time saved) land in memory at once
//! and reach the store in batches after a short debounce window. Rare writes
//! (settings, presets, sync stamp, import, reset) flush any pending batch
//! first and are persisted immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;

use crate::effects::clamp_volume_boost;
use crate::error::{ChannelError, StoreError};
use crate::host::HostChannel;
use crate::message::{IntroOutroConfig, Request, Response};
use crate::pitch::normalize_speed;
use crate::rules::{evaluate_site_access, find_skip_rule, find_url_rule};
use crate::settings::Settings;
use crate::store::{PersistedState, SettingsStore};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Time a staged write may wait before it is flushed.
    pub batch_window: Duration,
    /// Capacity of the settings-changed broadcast.
    pub notify_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            batch_window: Duration::from_secs(1),
            notify_capacity: 16,
        }
    }
}

/// Tracks whether memory is ahead of the store, and since when.
#[derive(Debug, Default)]
struct WriteBatch {
    staged: usize,
    since: Option<Instant>,
}

impl WriteBatch {
    fn stage(&mut self, now: Instant) {
        self.staged += 1;
        self.since.get_or_insert(now);
    }

    fn is_due(&self, now: Instant, window: Duration) -> bool {
        self.since.is_some_and(|since| now.saturating_duration_since(since) >= window)
    }

    fn take(&mut self) -> usize {
        self.since = None;
        std::mem::take(&mut self.staged)
    }
}

pub struct SettingsService<S> {
    store: S,
    state: PersistedState,
    batch: WriteBatch,
    config: ServiceConfig,
    changes: broadcast::Sender<Settings>,
}

impl<S: SettingsStore> SettingsService<S> {
    /// Loads the stored document, falling back to defaults when the store is
    /// empty or unreadable.
    pub fn new(store: S, config: ServiceConfig) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                log::info!("No stored settings, starting from defaults");
                PersistedState::default()
            }
            Err(e) => {
                log::error!("Failed to load settings, starting from defaults: {}", e);
                PersistedState::default()
            }
        };
        let (changes, _) = broadcast::channel(config.notify_capacity.max(1));
        Self {
            store,
            state,
            batch: WriteBatch::default(),
            config,
            changes,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receives every replaced settings snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<Settings> {
        self.changes.subscribe()
    }

    pub fn has_pending_writes(&self) -> bool {
        self.batch.since.is_some()
    }

    pub fn handle(&mut self, request: Request) -> Result<Response, StoreError> {
        self.handle_at(request, Instant::now())
    }

    pub fn handle_at(&mut self, request: Request, now: Instant) -> Result<Response, StoreError> {
        let response = match request {
            Request::GetSettings => Response::Settings {
                settings: Box::new(self.state.settings.clone()),
            },
            Request::SaveSettings { settings } => {
                // Both fields are owned here; editors send stale copies of them.
                self.persist_now(|state| {
                    let time_saved = state.settings.time_saved;
                    let last_sync_time = state.settings.last_sync_time;
                    state.settings = *settings;
                    state.settings.time_saved = time_saved;
                    state.settings.last_sync_time = last_sync_time;
                })?;
                self.broadcast();
                Response::Ack
            }
            Request::GetSavedSpeed { hostname } => Response::Speed {
                speed: self.state.saved_speeds.get(&hostname).copied(),
            },
            Request::SaveSpeed { hostname, speed } => {
                self.state.saved_speeds.insert(hostname, normalize_speed(speed));
                self.batch.stage(now);
                Response::Ack
            }
            Request::GetPresetSpeed { hostname } => Response::Speed {
                speed: self.state.preset_speeds.get(&hostname).copied(),
            },
            Request::SavePresetSpeed { hostname, speed } => {
                self.persist_now(|state| match speed {
                    Some(speed) => {
                        state.preset_speeds.insert(hostname, normalize_speed(speed));
                    }
                    None => {
                        state.preset_speeds.remove(&hostname);
                    }
                })?;
                Response::Ack
            }
            Request::GetFilters { hostname } => Response::Filters {
                filters: self.state.saved_filters.get(&hostname).copied(),
            },
            Request::SaveFilters { hostname, filters } => {
                if filters.is_identity() {
                    self.state.saved_filters.remove(&hostname);
                } else {
                    self.state.saved_filters.insert(hostname, filters);
                }
                self.batch.stage(now);
                Response::Ack
            }
            Request::GetVolumeBoost { hostname } => Response::VolumeBoost {
                gain: self.state.saved_volumes.get(&hostname).copied(),
            },
            Request::SaveVolumeBoost { hostname, gain } => {
                self.state.saved_volumes.insert(hostname, clamp_volume_boost(gain));
                self.batch.stage(now);
                Response::Ack
            }
            Request::CheckSiteAccess { url } => {
                Response::SiteAccess(evaluate_site_access(&self.state.settings, &url))
            }
            Request::GetUrlRuleSpeed { url } => {
                Response::UrlRule(find_url_rule(&self.state.settings.url_rules, &url))
            }
            Request::GetIntroOutroConfig { hostname } => Response::IntroOutro(self.intro_outro_config(&hostname)),
            Request::AddTimeSaved { seconds } => {
                if seconds.is_finite() && seconds > 0.0 {
                    self.state.settings.time_saved += seconds;
                    self.batch.stage(now);
                }
                Response::TimeSaved {
                    total: self.state.settings.time_saved,
                }
            }
            Request::UpdateSyncTime => {
                let stamp = current_timestamp_ms();
                self.persist_now(|state| state.settings.last_sync_time = Some(stamp))?;
                Response::SyncStatus {
                    last_sync_time: Some(stamp),
                }
            }
            Request::GetSyncStatus => Response::SyncStatus {
                last_sync_time: self.state.settings.last_sync_time,
            },
            Request::ExportSettings => {
                self.flush()?;
                Response::Export {
                    document: serde_json::to_value(&self.state)?,
                }
            }
            Request::ImportSettings { document } => {
                let imported: PersistedState = serde_json::from_value(document)?;
                self.persist_now(|state| *state = imported)?;
                log::info!("Imported settings document");
                self.broadcast();
                Response::Ack
            }
            Request::ResetSettings => {
                self.batch.take();
                self.store.clear()?;
                self.persist_now(|state| *state = PersistedState::default())?;
                log::info!("Settings reset to defaults");
                self.broadcast();
                Response::Settings {
                    settings: Box::new(self.state.settings.clone()),
                }
            }
        };
        Ok(response)
    }

    pub fn intro_outro_config(&self, hostname: &str) -> IntroOutroConfig {
        let io = &self.state.settings.intro_outro;
        let rule = find_skip_rule(&io.site_rules, hostname);
        IntroOutroConfig {
            enabled: io.enabled,
            intro_skip_seconds: rule.map_or(io.intro_skip_seconds, |r| r.intro_seconds),
            outro_skip_seconds: rule.map_or(io.outro_skip_seconds, |r| r.outro_seconds),
            auto_skip_intro: io.auto_skip_intro,
            hotkeys_enabled: io.hotkeys_enabled,
            intro_key: io.intro_key.clone(),
            outro_key: io.outro_key.clone(),
            site_specific: rule.is_some(),
        }
    }

    /// Flush staged writes whose debounce window has passed.
    pub fn flush_due(&mut self, now: Instant) -> Result<bool, StoreError> {
        if !self.batch.is_due(now, self.config.batch_window) {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.batch.since.is_none() {
            return Ok(());
        }
        self.store.save(&self.state)?;
        let staged = self.batch.take();
        log::debug!("Flushed {} batched writes", staged);
        Ok(())
    }

    fn persist_now(&mut self, apply: impl FnOnce(&mut PersistedState)) -> Result<(), StoreError> {
        self.flush()?;
        apply(&mut self.state);
        self.store.save(&self.state)
    }

    fn broadcast(&self) {
        // No receivers simply means no open pages.
        let _ = self.changes.send(self.state.settings.clone());
    }
}

/// Wall-clock milliseconds since the Unix epoch; 0 if the clock is before it.
fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

pub type SharedService<S> = Arc<Mutex<SettingsService<S>>>;

pub fn shared<S: SettingsStore>(service: SettingsService<S>) -> SharedService<S> {
    Arc::new(Mutex::new(service))
}

/// Flushes due batches every `period` until the task is dropped.
pub async fn run_flush_loop<S: SettingsStore>(service: SharedService<S>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let mut service = service.lock().await;
        if let Err(e) = service.flush_due(Instant::now()) {
            log::error!("Batched settings flush failed: {}", e);
        }
    }
}

/// In-process channel from a page to a shared service.
#[derive(Clone)]
pub struct LocalChannel<S> {
    service: SharedService<S>,
    alive: Arc<AtomicBool>,
}

impl<S: SettingsStore> LocalChannel<S> {
    pub fn new(service: SharedService<S>) -> Self {
        Self {
            service,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulates the extension being reloaded under an open page.
    pub fn invalidate(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn service(&self) -> &SharedService<S> {
        &self.service
    }
}

impl<S: SettingsStore> HostChannel for LocalChannel<S> {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn send(&self, request: Request) -> Result<Response, ChannelError> {
        if !self.is_alive() {
            return Err(ChannelError::ContextInvalidated);
        }
        let kind = request.kind();
        let mut service = self.service.lock().await;
        service.handle(request).map_err(|e| {
            log::error!("Settings service failed to handle `{}`: {}", kind, e);
            ChannelError::Remote {
                message: e.to_string(),
            }
        })
    }
}
