mod support;

use support::{FakePage, TestEngine, engine_on, fire, fire_timer, service_with};
use vsc_engine::commands::KeyInput;
use vsc_engine::host::{MediaEventKind, NodeId, ReadyState};
use vsc_engine::message::{GlobalCommand, InboundMessage};
use vsc_engine::overlay::OverlayAction;
use vsc_engine::settings::Settings;
use vsc_engine::state::TimerKind;

async fn two_videos() -> (TestEngine, NodeId, NodeId) {
    let mut page = FakePage::new("https://example.com/watch");
    let first = page.add_video(640.0, 360.0);
    let second = page.add_video(640.0, 360.0);
    let service = service_with(Settings::default());
    let mut engine = engine_on(page, &service);
    engine.init().await;
    (engine, first, second)
}

fn rate(engine: &TestEngine, node: NodeId) -> f64 {
    engine.page().media(node).rate
}

#[tokio::test]
async fn shortcuts_target_the_most_recently_playing_element() {
    let (mut engine, first, second) = two_videos().await;

    assert!(engine.handle_key_down(&KeyInput::key("d")));
    assert_eq!(rate(&engine, first), 1.1);

    engine.page_mut().media_mut(second).paused = false;
    fire(&mut engine, second, MediaEventKind::Play);
    assert!(engine.handle_key_down(&KeyInput::key("D")));
    assert_eq!(rate(&engine, second), 1.1);
    assert_eq!(rate(&engine, first), 1.1);

    assert!(engine.handle_key_down(&KeyInput::key("s")));
    assert_eq!(rate(&engine, second), 1.0);
}

#[tokio::test]
async fn text_fields_and_unbound_keys_are_ignored() {
    let (mut engine, first, _) = two_videos().await;
    let typing = KeyInput {
        in_text_field: true,
        ..KeyInput::key("d")
    };
    assert!(!engine.handle_key_down(&typing));
    assert!(!engine.handle_key_down(&KeyInput::key("q")));
    // Ctrl+D is a different binding than D.
    assert!(!engine.handle_key_down(&KeyInput::key("d").with_ctrl()));
    assert_eq!(rate(&engine, first), 1.0);
}

#[tokio::test]
async fn seek_shortcuts_clamp_to_the_media() {
    let (mut engine, first, _) = two_videos().await;
    engine.page_mut().media_mut(first).time = 4.0;
    engine.handle_key_down(&KeyInput::key("z"));
    assert_eq!(engine.page().media(first).time, 0.0);

    engine.page_mut().media_mut(first).time = 595.0;
    engine.handle_key_down(&KeyInput::key("x"));
    assert_eq!(engine.page().media(first).time, 600.0);
}

#[tokio::test]
async fn frame_step_pauses_and_moves_one_frame() {
    let (mut engine, first, _) = two_videos().await;
    engine.page_mut().media_mut(first).paused = false;
    engine.page_mut().media_mut(first).time = 10.0;

    engine.handle_key_down(&KeyInput::key("."));
    assert!(engine.page().media(first).paused);
    assert!((engine.page().media(first).time - (10.0 + 1.0 / 30.0)).abs() < 1e-9);

    engine.handle_key_down(&KeyInput::key(","));
    assert!((engine.page().media(first).time - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn preferred_speed_is_a_long_press() {
    let (mut engine, first, _) = two_videos().await;
    engine.set_speed(first, 1.25);

    assert!(engine.handle_key_down(&KeyInput::key("g")));
    assert_eq!(rate(&engine, first), 3.0);
    assert!(engine.long_press_active());

    // Auto-repeat must not overwrite the rate to restore.
    engine.handle_key_down(&KeyInput::key("g"));
    engine.handle_key_down(&KeyInput::key("g"));
    assert_eq!(rate(&engine, first), 3.0);

    assert!(engine.handle_key_up(&KeyInput::key("g")));
    assert_eq!(rate(&engine, first), 1.25);
    assert!(!engine.long_press_active());
    assert!(!engine.handle_key_up(&KeyInput::key("g")));
}

#[tokio::test]
async fn screenshot_needs_a_decoded_frame() {
    let (mut engine, first, _) = two_videos().await;
    engine.page_mut().media_mut(first).ready = ReadyState::HaveMetadata;
    engine.handle_key_down(&KeyInput::key("s").with_shift());
    assert!(engine.page().captures.is_empty());
    assert_eq!(engine.page().last_toast(), Some("Video not ready for a screenshot"));

    engine.page_mut().media_mut(first).ready = ReadyState::HaveCurrentData;
    engine.handle_key_down(&KeyInput::key("S").with_shift());
    assert_eq!(engine.page().captures, vec![first]);
    // Shift+S did not fall through to decrease-speed.
    assert_eq!(rate(&engine, first), 1.0);
}

#[tokio::test]
async fn show_controller_toggles_visibility() {
    let (mut engine, first, _) = two_videos().await;
    engine.handle_key_down(&KeyInput::key("v"));
    assert!(engine.page().overlay_for(first).unwrap().hidden);
    engine.handle_key_down(&KeyInput::key("v"));
    assert!(!engine.page().overlay_for(first).unwrap().hidden);
}

#[tokio::test]
async fn context_menu_replaces_and_closes() {
    let (mut engine, first, _) = two_videos().await;
    let outsider = engine.page_mut().add_container();

    assert!(!engine.handle_context_menu(outsider, 5.0, 5.0));
    assert!(engine.handle_context_menu(first, 10.0, 10.0));
    assert!(engine.handle_context_menu(first, 20.0, 20.0));
    assert_eq!(engine.page().menus.len(), 1);
    let items = engine.page().menus.values().next().unwrap().clone();
    assert_eq!(items[2].label, "1x (Normal)");

    assert!(engine.handle_menu_select(5));
    assert_eq!(rate(&engine, first), 2.0);
    assert!(engine.page().menus.is_empty());
    assert!(!engine.has_open_menu());

    engine.handle_context_menu(first, 10.0, 10.0);
    engine.handle_document_click();
    assert!(engine.page().menus.is_empty());
    assert!(!engine.handle_menu_select(0));
}

#[tokio::test]
async fn global_commands_and_popup_speed() {
    let (mut engine, first, second) = two_videos().await;
    engine
        .handle_message(InboundMessage::Command {
            command: GlobalCommand::IncreaseSpeed,
        })
        .await;
    assert_eq!(rate(&engine, first), 1.1);

    engine
        .handle_message(InboundMessage::Command {
            command: GlobalCommand::ResetSpeed,
        })
        .await;
    assert_eq!(rate(&engine, first), 1.0);

    engine.handle_message(InboundMessage::SetSpeed { speed: 1.5 }).await;
    assert_eq!((rate(&engine, first), rate(&engine, second)), (1.5, 1.0));

    engine
        .handle_message(InboundMessage::Command {
            command: GlobalCommand::ToggleController,
        })
        .await;
    assert!(engine.page().overlay_for(first).unwrap().hidden);
    assert!(!engine.page().overlay_for(second).unwrap().hidden);
}

#[tokio::test]
async fn popup_speed_follows_the_playing_element() {
    let (mut engine, first, second) = two_videos().await;
    engine.page_mut().media_mut(second).paused = false;
    fire(&mut engine, second, MediaEventKind::Play);

    engine.handle_message(InboundMessage::SetSpeed { speed: 2.0 }).await;
    assert_eq!(engine.active_element(), Some(second));
    assert_eq!(rate(&engine, second), 2.0);
    assert_eq!(rate(&engine, first), 1.0);

    engine
        .handle_message(InboundMessage::Command {
            command: GlobalCommand::ToggleController,
        })
        .await;
    assert!(engine.page().overlay_for(second).unwrap().hidden);
    assert!(!engine.page().overlay_for(first).unwrap().hidden);
}

#[tokio::test]
async fn overlay_actions() {
    let (mut engine, first, _) = two_videos().await;

    engine.overlay_action(first, OverlayAction::Wheel { delta_y: -120.0 });
    assert_eq!(rate(&engine, first), 1.1);
    engine.overlay_action(first, OverlayAction::Wheel { delta_y: 120.0 });
    assert_eq!(rate(&engine, first), 1.0);

    engine.overlay_action(first, OverlayAction::Preset(2.0));
    assert_eq!(engine.page().overlay_for(first).unwrap().active_preset, Some(2.0));

    engine.page_mut().media_mut(first).time = 5.0;
    engine.overlay_action(first, OverlayAction::Seek(-10.0));
    assert_eq!(engine.page().media(first).time, 0.0);

    engine.overlay_action(first, OverlayAction::TogglePitch);
    assert_eq!(engine.page().media(first).props["preservesPitch"], false);

    engine.overlay_action(first, OverlayAction::Reset);
    assert_eq!(rate(&engine, first), 1.0);
    assert_eq!(engine.active_element(), Some(first));
}

#[tokio::test]
async fn overlay_auto_hides_after_interaction() {
    let mut page = FakePage::new("https://example.com/");
    let video = page.add_video(640.0, 360.0);
    let settings = Settings {
        auto_hide_delay: 3.0,
        ..Settings::default()
    };
    let service = service_with(settings);
    let mut engine = engine_on(page, &service);
    engine.init().await;

    engine.overlay_action(video, OverlayAction::Hover);
    let id = engine.timers().id_of(TimerKind::AutoHide(video)).expect("auto-hide armed");
    engine.overlay_action(video, OverlayAction::Hover);
    let rearmed = engine.timers().id_of(TimerKind::AutoHide(video)).unwrap();
    assert_ne!(id, rearmed);

    fire_timer(&mut engine, id).await;
    assert!(!engine.page().overlay_for(video).unwrap().hidden);
    fire_timer(&mut engine, rearmed).await;
    assert!(engine.page().overlay_for(video).unwrap().hidden);
}

#[tokio::test]
async fn pitch_control_is_disabled_without_support() {
    let mut page = FakePage::new("https://example.com/");
    let video = page.add_video(640.0, 360.0);
    page.media_mut(video).props.clear();
    let service = service_with(Settings::default());
    let mut engine = engine_on(page, &service);
    engine.init().await;

    assert_eq!(
        engine.page().overlay_for(video).unwrap().pitch,
        vsc_engine::overlay::PitchControl::Unsupported
    );
    assert_eq!(engine.toggle_pitch(video), None);
}
