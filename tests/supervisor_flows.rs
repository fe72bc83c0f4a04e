//! End-to-end supervisor behavior on a paused clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use renderer_supervisor::fallback::{FallbackView, ReachabilityProbe};
use renderer_supervisor::health::{ConnectionStatus, ListenerError, LoadError, NetworkFailure};
use renderer_supervisor::{
    FallbackControl, ScreenState, SupervisorBuilder, SupervisorConfig, SupervisorError, SupervisorHandle,
};

mod common;
use common::{advance, settle, Command, DelayedCapabilities, RecordingRenderer, StubProbe};

const URL: &str = "https://app.example.com";

fn start(probe: Arc<dyn ReachabilityProbe>) -> (SupervisorHandle, RecordingRenderer) {
    let renderer = RecordingRenderer::new();
    let (handle, _task) = SupervisorBuilder::new(SupervisorConfig::default(), renderer.clone())
        .reachability(probe)
        .spawn()
        .unwrap();
    (handle, renderer)
}

fn start_default() -> (SupervisorHandle, RecordingRenderer) {
    start(StubProbe::up(Duration::from_millis(100)))
}

async fn finish_initial_load(handle: &SupervisorHandle) {
    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(300).await;
    handle.on_load_end(URL).unwrap();
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_heartbeat_triggers_soft_reload() {
    let (handle, renderer) = start_default();

    handle.on_foreground().unwrap();
    settle().await;
    assert_eq!(renderer.injected().len(), 1);
    assert!(renderer.injected()[0].contains("heartbeatAck"));
    assert!(renderer.recoveries().is_empty());

    advance(1199).await;
    assert!(renderer.recoveries().is_empty());

    advance(1).await;
    assert_eq!(renderer.recoveries(), vec![Command::Reload]);
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_heartbeat_takes_no_action() {
    let (handle, renderer) = start_default();

    handle.on_foreground().unwrap();
    settle().await;
    advance(300).await;
    handle
        .on_message(r#"{"action":"heartbeatAck","data":{"token":"whatever"}}"#)
        .unwrap();
    settle().await;

    advance(2000).await;
    assert!(renderer.recoveries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_foreground_supersedes_previous_probe() {
    let (handle, renderer) = start_default();

    handle.on_foreground().unwrap();
    settle().await;
    advance(1000).await;
    handle.on_foreground().unwrap();
    settle().await;
    assert_eq!(renderer.injected().len(), 2);

    // first probe's window has passed, but it was superseded
    advance(300).await;
    assert!(renderer.recoveries().is_empty());

    advance(900).await;
    assert_eq!(renderer.recoveries(), vec![Command::Reload]);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_server_errors_escalate_to_remount() {
    let (handle, renderer) = start_default();

    handle.on_http_status(503).unwrap();
    settle().await;
    advance(2000).await;
    handle.on_http_status(503).unwrap();
    settle().await;
    advance(2000).await;
    handle.on_http_status(503).unwrap();
    settle().await;

    assert_eq!(
        renderer.recoveries(),
        vec![Command::Reload, Command::Reload, Command::Remount]
    );
}

#[tokio::test(start_paused = true)]
async fn test_requests_inside_debounce_window_are_dropped() {
    let (handle, renderer) = start_default();

    handle.on_http_status(500).unwrap();
    handle.on_http_status(0).unwrap();
    handle.on_render_process_lost(false).unwrap();
    settle().await;
    advance(1000).await;
    handle.on_content_process_terminated().unwrap();
    settle().await;

    assert_eq!(renderer.recoveries(), vec![Command::Reload]);

    advance(500).await;
    handle.on_content_process_terminated().unwrap();
    settle().await;
    assert_eq!(renderer.recoveries(), vec![Command::Reload, Command::Remount]);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_are_not_escalated() {
    let (handle, renderer) = start_default();

    handle.on_http_status(404).unwrap();
    handle.on_http_status(401).unwrap();
    handle.on_http_status(200).unwrap();
    settle().await;
    assert!(renderer.recoveries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_crash_always_remounts() {
    let (handle, renderer) = start_default();
    finish_initial_load(&handle).await;

    handle.on_render_process_lost(true).unwrap();
    settle().await;
    assert_eq!(renderer.recoveries(), vec![Command::Remount]);
    // after the initial load a remount alone is the remedy
    assert_eq!(handle.fallback().screen_state(), ScreenState::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_crash_before_initial_load_shows_error_screen() {
    let (handle, renderer) = start_default();

    handle.on_content_process_terminated().unwrap();
    settle().await;
    assert_eq!(renderer.recoveries(), vec![Command::Remount]);
    assert_eq!(handle.fallback().screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_successful_load_resets_escalation() {
    let (handle, renderer) = start_default();

    handle.on_http_status(502).unwrap();
    settle().await;
    advance(2000).await;
    handle.on_http_status(502).unwrap();
    settle().await;

    finish_initial_load(&handle).await;
    advance(2000).await;
    handle.on_http_status(502).unwrap();
    settle().await;

    assert_eq!(
        renderer.recoveries(),
        vec![Command::Reload, Command::Reload, Command::Reload]
    );
}

#[tokio::test(start_paused = true)]
async fn test_initial_load_timeout_shows_error_screen() {
    let (handle, _renderer) = start_default();
    let fallback = handle.fallback();

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(4999).await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);

    advance(1).await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_load_end_before_timeout_never_shows_error() {
    let (handle, _renderer) = start_default();
    let fallback = handle.fallback();

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(4000).await;
    handle.on_load_end(URL).unwrap();
    settle().await;

    advance(10_000).await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);
    assert!(handle.connection_status().connected);
    assert_eq!(handle.connection_status().loading_time_ms, Some(4000));
}

#[tokio::test(start_paused = true)]
async fn test_slow_initial_load_uses_stricter_screen_threshold() {
    let (handle, _renderer) = start_default();
    handle.set_should_show_error_on_timeout(false).unwrap();

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(6000).await;
    handle.on_load_end(URL).unwrap();
    settle().await;

    let status = handle.connection_status();
    // slower than the screen's 5s threshold, faster than the monitor's 10s one
    assert!(!status.is_slow);
    assert_eq!(handle.fallback().screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_no_auto_error_after_initial_load() {
    let (handle, _renderer) = start_default();
    finish_initial_load(&handle).await;
    let fallback = handle.fallback();

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(8000).await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);

    handle
        .on_load_error(LoadError::Network(NetworkFailure::Cancelled), URL)
        .unwrap();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);
    assert!(!handle.connection_status().connected);

    handle.on_load_error(LoadError::Http { status: 504 }, URL).unwrap();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_suppressed_auto_error_during_handshake() {
    let (handle, _renderer) = start_default();

    handle.set_should_show_error_on_timeout(false).unwrap();
    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(6000).await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_successful_retry_restores_normal_and_reenables_timeout() {
    let (handle, renderer) = start(StubProbe::up(Duration::from_millis(500)));
    let fallback = handle.fallback();

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(5000).await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);
    handle.set_should_show_error_on_timeout(false).unwrap();

    fallback.retry();
    settle().await;
    assert_eq!(
        fallback.view(),
        FallbackView {
            state: ScreenState::ConnectionError,
            retrying: true
        }
    );

    advance(500).await;
    assert_eq!(
        fallback.view(),
        FallbackView {
            state: ScreenState::Normal,
            retrying: false
        }
    );
    assert_eq!(renderer.recoveries(), vec![Command::Reload]);

    // error-on-timeout is back on and the initial-load cycle restarted
    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(5000).await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_failed_retry_stays_on_error_screen() {
    let (handle, renderer) = start(StubProbe::down(Duration::from_millis(200)));
    let fallback = handle.fallback();

    fallback.show_connection_error();
    settle().await;
    fallback.retry();
    settle().await;
    advance(200).await;

    assert_eq!(
        fallback.view(),
        FallbackView {
            state: ScreenState::ConnectionError,
            retrying: false
        }
    );
    assert!(renderer.recoveries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hanging_retry_is_bounded_by_timeout() {
    let (handle, _renderer) = start(StubProbe::hanging());
    let fallback = handle.fallback();

    fallback.show_connection_error();
    fallback.retry();
    fallback.retry();
    settle().await;
    assert!(fallback.view().retrying);

    advance(2999).await;
    assert!(fallback.view().retrying);

    advance(1).await;
    assert_eq!(
        fallback.view(),
        FallbackView {
            state: ScreenState::ConnectionError,
            retrying: false
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_manual_instructions_navigation() {
    let (handle, _renderer) = start_default();
    let fallback = handle.fallback();

    fallback.show_manual_instructions();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);

    fallback.show_connection_error();
    fallback.show_manual_instructions();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::ManualInstructions);

    fallback.show_connection_error();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);

    fallback.show_normal();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_fast_load_clears_error_screen() {
    let (handle, _renderer) = start_default();
    let fallback = handle.fallback();

    handle.on_load_start(URL).unwrap();
    settle().await;
    handle.on_load_error(LoadError::Http { status: 503 }, URL).unwrap();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(800).await;
    handle.on_load_end(URL).unwrap();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_renderer_can_request_error_screen_over_bridge() {
    let (handle, _renderer) = start_default();

    handle.on_message(r#"{"action":"connectionError"}"#).unwrap();
    settle().await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ConnectionError);

    // malformed and unknown messages are dropped without side effects
    handle.on_message("{not json").unwrap();
    handle.on_message(r#"{"action":"launchRocket"}"#).unwrap();
    settle().await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_capability_requests_use_single_slot() {
    let renderer = RecordingRenderer::new();
    let (handle, _task) = SupervisorBuilder::new(SupervisorConfig::default(), renderer.clone())
        .reachability(StubProbe::up(Duration::ZERO))
        .capabilities(Arc::new(DelayedCapabilities {
            delay: Duration::from_millis(1000),
            result: json!({ "uri": "file:///photo.jpg" }),
        }))
        .spawn()
        .unwrap();

    handle.on_message(r#"{"action":"openCamera","data":{}}"#).unwrap();
    settle().await;
    assert!(renderer.injected().is_empty());

    handle.on_message(r#"{"action":"openCamera","data":{}}"#).unwrap();
    settle().await;
    let injected = renderer.injected();
    assert_eq!(injected.len(), 1);
    assert!(injected[0].contains("cameraResult"));
    assert!(injected[0].contains(r#"\"ok\":false"#));

    advance(1000).await;
    let injected = renderer.injected();
    assert_eq!(injected.len(), 2);
    assert!(injected[1].contains(r#"\"ok\":true"#));
    assert!(injected[1].contains("photo.jpg"));

    // slot is free again
    handle.on_message(r#"{"action":"openCamera","data":{}}"#).unwrap();
    settle().await;
    advance(1000).await;
    assert_eq!(renderer.injected().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_status_listeners_receive_every_publication() {
    let renderer = RecordingRenderer::new();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let (handle, _task) = SupervisorBuilder::new(SupervisorConfig::default(), renderer)
        .reachability(StubProbe::up(Duration::ZERO))
        .status_listener(Arc::new(|_: &ConnectionStatus| -> Result<(), ListenerError> {
            Err(ListenerError("ui detached".into()))
        }))
        .status_listener(Arc::new(move |_: &ConnectionStatus| -> Result<(), ListenerError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .spawn()
        .unwrap();

    finish_initial_load(&handle).await;
    handle.on_load_error(LoadError::Http { status: 500 }, URL).unwrap();
    settle().await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_is_idempotent_and_cancels_timers() {
    let renderer = RecordingRenderer::new();
    let (handle, task) = SupervisorBuilder::new(SupervisorConfig::default(), renderer.clone())
        .reachability(StubProbe::hanging())
        .spawn()
        .unwrap();
    let fallback = handle.fallback();

    handle.on_load_start(URL).unwrap();
    handle.on_foreground().unwrap();
    fallback.retry();
    settle().await;
    let before = renderer.commands();

    handle.dispose();
    handle.dispose();
    task.await.unwrap();
    assert!(handle.is_disposed());

    advance(10_000).await;
    assert_eq!(renderer.commands(), before);
    assert_eq!(fallback.screen_state(), ScreenState::Normal);
    assert_eq!(handle.on_load_end(URL), Err(SupervisorError::Disposed));
    assert_eq!(handle.on_foreground(), Err(SupervisorError::Disposed));
}

#[tokio::test(start_paused = true)]
async fn test_page_liveness_messages_satisfy_heartbeat() {
    let (handle, renderer) = start_default();

    handle.on_foreground().unwrap();
    settle().await;
    advance(300).await;
    handle
        .on_message(r#"{"action":"documentReady","data":"complete"}"#)
        .unwrap();
    settle().await;
    advance(2000).await;
    assert!(renderer.recoveries().is_empty());

    handle.on_foreground().unwrap();
    settle().await;
    advance(500).await;
    handle.on_message(r#"{"action":"contentHeight","data":1480}"#).unwrap();
    settle().await;
    advance(2000).await;
    assert!(renderer.recoveries().is_empty());
    assert_eq!(renderer.injected().len(), 2);
}

/// Initial load fails, then the user opens the help screen.
async fn open_manual_instructions(handle: &SupervisorHandle) {
    handle.on_load_start(URL).unwrap();
    settle().await;
    handle
        .on_load_error(LoadError::Network(NetworkFailure::Cancelled), URL)
        .unwrap();
    settle().await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ConnectionError);

    handle.fallback().show_manual_instructions();
    settle().await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ManualInstructions);
}

#[tokio::test(start_paused = true)]
async fn test_auto_error_timer_keeps_manual_instructions() {
    let (handle, _renderer) = start_default();
    open_manual_instructions(&handle).await;

    handle.on_load_start(URL).unwrap();
    settle().await;
    advance(5000).await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ManualInstructions);
}

#[tokio::test(start_paused = true)]
async fn test_server_down_error_keeps_manual_instructions() {
    let (handle, _renderer) = start_default();
    open_manual_instructions(&handle).await;

    handle.on_load_error(LoadError::Http { status: 503 }, URL).unwrap();
    settle().await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ManualInstructions);
}

#[tokio::test(start_paused = true)]
async fn test_forced_remount_keeps_manual_instructions() {
    let (handle, renderer) = start_default();
    open_manual_instructions(&handle).await;

    handle.on_content_process_terminated().unwrap();
    settle().await;
    assert_eq!(renderer.recoveries(), vec![Command::Remount]);
    assert_eq!(handle.fallback().screen_state(), ScreenState::ManualInstructions);

    // the user can still navigate back
    handle.fallback().show_connection_error();
    settle().await;
    assert_eq!(handle.fallback().screen_state(), ScreenState::ConnectionError);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_events_and_fallback_commands_keep_call_order() {
    let (handle, _renderer) = start_default();
    let fallback = handle.fallback();

    handle.on_load_error(LoadError::Http { status: 503 }, URL).unwrap();
    fallback.show_manual_instructions();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::ManualInstructions);

    fallback.show_normal();
    handle.on_load_error(LoadError::Http { status: 502 }, URL).unwrap();
    settle().await;
    assert_eq!(fallback.screen_state(), ScreenState::ConnectionError);
}
