mod support;

use std::cell::RefCell;
use std::collections::BTreeMap;

use support::{FakePage, engine_on, fire_timer, service_with, service_with_state};
use vsc_engine::error::ChannelError;
use vsc_engine::guard::ContextGuard;
use vsc_engine::host::HostChannel;
use vsc_engine::message::{Request, Response};
use vsc_engine::resolve::{RateSource, resolve_rate};
use vsc_engine::service::LocalChannel;
use vsc_engine::settings::{Settings, UrlRule};
use vsc_engine::store::{MemoryStore, PersistedState};

/// Forwards to the in-process service and records each request kind.
struct RecordingChannel {
    inner: LocalChannel<MemoryStore>,
    sent: RefCell<Vec<&'static str>>,
}

impl HostChannel for RecordingChannel {
    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    async fn send(&self, request: Request) -> Result<Response, ChannelError> {
        self.sent.borrow_mut().push(request.kind());
        self.inner.send(request).await
    }
}

async fn lookups_for(state: PersistedState) -> (f64, Vec<&'static str>) {
    let settings = state.settings.clone();
    let guard = ContextGuard::new(RecordingChannel {
        inner: LocalChannel::new(service_with_state(state)),
        sent: RefCell::new(Vec::new()),
    });
    let decision = resolve_rate(&guard, &settings, COURSE_URL, "example.com").await;
    let sent = guard.channel().sent.borrow().clone();
    (decision.speed, sent)
}

const COURSE_URL: &str = "https://example.com/course/rust/1";

fn state(url_rule: bool, preset: bool, remembered: bool, remember: bool, force: bool) -> PersistedState {
    let mut url_rules = Vec::new();
    if url_rule {
        url_rules.push(UrlRule {
            pattern: r"example\.com/course/".into(),
            speed: 1.75,
        });
    }
    let host = |speed: f64, on: bool| {
        if on {
            BTreeMap::from([("example.com".to_string(), speed)])
        } else {
            BTreeMap::new()
        }
    };
    PersistedState {
        settings: Settings {
            url_rules,
            remember_speed: remember,
            force_speed: force,
            ..Settings::default()
        },
        preset_speeds: host(1.5, preset),
        saved_speeds: host(2.0, remembered),
        ..PersistedState::default()
    }
}

async fn resolved_rate(state: PersistedState) -> f64 {
    let mut page = FakePage::new(COURSE_URL);
    let video = page.add_video(640.0, 360.0);
    let service = service_with_state(state);
    let mut engine = engine_on(page, &service);
    engine.init().await;
    engine.page().media(video).rate
}

#[tokio::test]
async fn url_rule_beats_preset_beats_remembered() {
    assert_eq!(resolved_rate(state(true, true, true, true, false)).await, 1.75);
    assert_eq!(resolved_rate(state(false, true, true, true, false)).await, 1.5);
    assert_eq!(resolved_rate(state(false, false, true, true, false)).await, 2.0);
}

#[tokio::test]
async fn first_matching_policy_skips_later_lookups() {
    let (speed, sent) = lookups_for(state(true, true, true, true, false)).await;
    assert_eq!(speed, 1.75);
    assert_eq!(sent, vec!["getUrlRuleSpeed"]);

    let (speed, sent) = lookups_for(state(false, true, true, true, false)).await;
    assert_eq!(speed, 1.5);
    assert_eq!(sent, vec!["getUrlRuleSpeed", "getPresetSpeed"]);

    let (speed, sent) = lookups_for(state(false, false, true, true, false)).await;
    assert_eq!(speed, 2.0);
    assert_eq!(sent, vec!["getUrlRuleSpeed", "getPresetSpeed", "getSavedSpeed"]);
}

#[tokio::test]
async fn remembered_speed_is_not_looked_up_when_remember_is_off() {
    let (speed, sent) = lookups_for(state(false, false, true, false, false)).await;
    assert_eq!(speed, 1.0);
    assert!(!sent.contains(&"getSavedSpeed"));
}

#[tokio::test]
async fn remembered_speed_needs_remember_or_force() {
    assert_eq!(resolved_rate(state(false, false, true, false, false)).await, 1.0);
    assert_eq!(resolved_rate(state(false, false, true, false, true)).await, 2.0);
}

#[tokio::test]
async fn pinned_preset_applies_even_without_remember() {
    assert_eq!(resolved_rate(state(false, true, true, false, false)).await, 1.5);
}

#[tokio::test]
async fn decision_reports_its_source() {
    let page = FakePage::new(COURSE_URL);
    let service = service_with_state(state(true, true, true, true, false));
    let mut engine = engine_on(page, &service);
    engine.init().await;

    let decision = engine.resolve_current().await;
    assert_eq!(decision.speed, 1.75);
    assert_eq!(
        decision.source,
        RateSource::UrlRule {
            pattern: r"example\.com/course/".into()
        }
    );
}

#[tokio::test]
async fn late_decision_does_not_override_user_change() {
    let mut page = FakePage::new(COURSE_URL);
    let video = page.add_video(640.0, 360.0);
    let service = service_with_state(state(false, false, true, true, false));
    let mut engine = engine_on(page, &service);
    engine.init().await;
    engine.set_speed(video, 1.0);

    let decision = engine.resolve_current().await;
    assert_eq!(decision.source, RateSource::Remembered);
    // The user changes speed while the lookup is in flight.
    engine.set_speed(video, 1.25);
    assert!(!engine.apply_decision(video, &decision));
    assert_eq!(engine.page().media(video).rate, 1.25);
}

#[tokio::test]
async fn force_overrides_a_changed_rate() {
    let mut page = FakePage::new(COURSE_URL);
    let video = page.add_video(640.0, 360.0);
    let service = service_with_state(state(false, false, true, false, true));
    let mut engine = engine_on(page, &service);
    engine.init().await;

    engine.set_speed(video, 1.25);
    let decision = engine.resolve_current().await;
    assert!(engine.apply_decision(video, &decision));
    assert_eq!(engine.page().media(video).rate, 2.0);
}

#[tokio::test]
async fn page_changed_rate_before_resolution_is_kept() {
    let mut page = FakePage::new(COURSE_URL);
    let video = page.add_video(640.0, 360.0);
    page.media_mut(video).rate = 0.75;
    let service = service_with_state(state(true, false, false, true, false));
    let mut engine = engine_on(page, &service);
    engine.init().await;
    assert_eq!(engine.page().media(video).rate, 0.75);
}

#[tokio::test]
async fn set_speed_stores_rounded_clamped_rate() {
    let mut page = FakePage::new("https://example.com/");
    let video = page.add_video(640.0, 360.0);
    let service = service_with(Settings::default());
    let mut engine = engine_on(page, &service);
    engine.init().await;

    let inputs = [
        -5.0, 0.0, 0.04, 0.05, 0.1, 0.126, 1.0, 1.234, 1.235, 2.5, 3.999, 15.994, 16.0, 16.006, 250.0,
    ];
    for input in inputs {
        let expected = ((input * 100.0_f64).round() / 100.0).clamp(0.1, 16.0);
        assert_eq!(engine.set_speed(video, input), Some(expected), "input {input}");
        assert_eq!(engine.page().media(video).rate, expected, "input {input}");
        assert_eq!(engine.element(video).unwrap().view.speed, expected);
    }
}

#[tokio::test]
async fn change_speed_is_relative_and_clamped() {
    let mut page = FakePage::new("https://example.com/");
    let video = page.add_video(640.0, 360.0);
    let service = service_with(Settings::default());
    let mut engine = engine_on(page, &service);
    engine.init().await;

    assert_eq!(engine.change_speed(video, 0.25), Some(1.25));
    assert_eq!(engine.change_speed(video, -5.0), Some(0.1));
    engine.set_speed(video, 15.95);
    assert_eq!(engine.change_speed(video, 0.1), Some(16.0));
}

#[tokio::test]
async fn speed_change_highlights_briefly() {
    let mut page = FakePage::new("https://example.com/");
    let video = page.add_video(640.0, 360.0);
    let service = service_with(Settings::default());
    let mut engine = engine_on(page, &service);
    engine.init().await;

    engine.set_speed(video, 1.5);
    assert!(engine.page().overlay_for(video).unwrap().highlighted);
    let id = engine
        .timers()
        .id_of(vsc_engine::state::TimerKind::HighlightEnd(video))
        .unwrap();
    fire_timer(&mut engine, id).await;
    let view = engine.page().overlay_for(video).unwrap();
    assert!(!view.highlighted);
    assert_eq!(view.speed_label, "1.50x");
    assert_eq!(view.active_preset, Some(1.5));
}
