//! Playback-rate resolution.
//!
//! Precedence, first match wins and later lookups are skipped:
//! URL rule, pinned preset for the hostname, remembered speed for the
//! hostname (only with "remember" or "force"), then the native default.

use crate::guard::{ContextGuard, Reply};
use crate::host::HostChannel;
use crate::message::{IntroOutroConfig, Request, Response};
use crate::pitch::{DEFAULT_SPEED, normalize_speed};
use crate::settings::Settings;

#[derive(Clone, Debug, PartialEq)]
pub enum RateSource {
    UrlRule { pattern: String },
    PinnedPreset,
    Remembered,
    NativeDefault,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RateDecision {
    pub speed: f64,
    pub source: RateSource,
}

impl RateDecision {
    pub fn native_default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            source: RateSource::NativeDefault,
        }
    }
}

/// Whether a late decision may still overwrite the element's rate.
///
/// The lookup can be overtaken by the page or the user changing the rate;
/// only an untouched element (still at 1.0) is overwritten unless forced.
pub fn should_apply(current_rate: f64, force: bool) -> bool {
    force || (current_rate - DEFAULT_SPEED).abs() < f64::EPSILON
}

fn speed_from(reply: Reply<Response>) -> Reply<f64> {
    match reply {
        Reply::Value(Response::Speed { speed: Some(speed) }) if speed.is_finite() && speed > 0.0 => {
            Reply::Value(speed)
        }
        Reply::Value(_) | Reply::NotFound => Reply::NotFound,
        Reply::Unavailable => Reply::Unavailable,
    }
}

pub async fn lookup_url_rule<C: HostChannel>(guard: &ContextGuard<C>, page_url: &str) -> Reply<(f64, String)> {
    match guard
        .request(Request::GetUrlRuleSpeed {
            url: page_url.to_string(),
        })
        .await
    {
        Reply::Value(Response::UrlRule(found)) => match (found.matched, found.speed) {
            (true, Some(speed)) => Reply::Value((speed, found.pattern.unwrap_or_default())),
            _ => Reply::NotFound,
        },
        Reply::Value(_) | Reply::NotFound => Reply::NotFound,
        Reply::Unavailable => Reply::Unavailable,
    }
}

pub async fn lookup_preset<C: HostChannel>(guard: &ContextGuard<C>, hostname: &str) -> Reply<f64> {
    speed_from(
        guard
            .request(Request::GetPresetSpeed {
                hostname: hostname.to_string(),
            })
            .await,
    )
}

pub async fn lookup_remembered<C: HostChannel>(guard: &ContextGuard<C>, hostname: &str) -> Reply<f64> {
    speed_from(
        guard
            .request(Request::GetSavedSpeed {
                hostname: hostname.to_string(),
            })
            .await,
    )
}

pub async fn resolve_rate<C: HostChannel>(
    guard: &ContextGuard<C>,
    settings: &Settings,
    page_url: &str,
    hostname: &str,
) -> RateDecision {
    if let Reply::Value((speed, pattern)) = lookup_url_rule(guard, page_url).await {
        log::debug!("[RATE] url rule {:?} -> {}", pattern, speed);
        return RateDecision {
            speed: normalize_speed(speed),
            source: RateSource::UrlRule { pattern },
        };
    }
    if guard.is_tripped() {
        return RateDecision::native_default();
    }
    if let Reply::Value(speed) = lookup_preset(guard, hostname).await {
        log::debug!("[RATE] pinned preset for {} -> {}", hostname, speed);
        return RateDecision {
            speed: normalize_speed(speed),
            source: RateSource::PinnedPreset,
        };
    }
    if guard.is_tripped() {
        return RateDecision::native_default();
    }
    if settings.remember_speed || settings.force_speed {
        if let Reply::Value(speed) = lookup_remembered(guard, hostname).await {
            log::debug!("[RATE] remembered speed for {} -> {}", hostname, speed);
            return RateDecision {
                speed: normalize_speed(speed),
                source: RateSource::Remembered,
            };
        }
    }
    RateDecision::native_default()
}

/// Skip configuration for a hostname; neutral (disabled) when unavailable.
pub async fn fetch_skip_config<C: HostChannel>(guard: &ContextGuard<C>, hostname: &str) -> IntroOutroConfig {
    match guard
        .request(Request::GetIntroOutroConfig {
            hostname: hostname.to_string(),
        })
        .await
    {
        Reply::Value(Response::IntroOutro(config)) => config,
        _ => IntroOutroConfig::default(),
    }
}
