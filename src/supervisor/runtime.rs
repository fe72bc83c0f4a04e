//! The supervisor event loop.
//!
//! One task owns every component and processes one event at a time, so no
//! component needs interior locking. Timers and async work run as spawned
//! tasks that report back into the loop through the event channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::bridge::{
    Capability, CapabilityError, CapabilityHandler, MessageBridge, OutboundMessage, Routed, ScriptBuilder,
};
use crate::config::SupervisorConfig;
use crate::fallback::{
    probe_with_timeout, ErrorTrigger, FallbackCommand, FallbackView, ProbeError, ReachabilityProbe,
    ScreenStateMachine, Transition,
};
use crate::health::{ConnectionMonitor, ConnectionStatus, HeartbeatProbe, LoadError, ProbeVerdict};
use crate::lifecycle::TaskSlot;
use crate::observability::metrics;
use crate::renderer::{Renderer, RendererError, RendererEvent};
use crate::resilience::{Failure, RecoveryAction, RecoveryController, RecoveryRequest};

/// Everything the loop reacts to.
#[derive(Debug)]
pub(crate) enum Event {
    Renderer(RendererEvent),
    Fallback(FallbackCommand),
    SetSlowThreshold(Duration),
    SetShowErrorOnTimeout(bool),
    AutoErrorElapsed { generation: u64 },
    HeartbeatElapsed { generation: u64, token: Uuid },
    RetryFinished { result: Result<(), ProbeError> },
    CapabilityFinished {
        capability: Capability,
        generation: u64,
        result: Result<Value, CapabilityError>,
    },
}

/// Owns the supervised components; driven by [`Supervisor::run`].
pub(crate) struct Supervisor<R: Renderer> {
    renderer: R,
    probe: Arc<dyn ReachabilityProbe>,
    capabilities: Arc<dyn CapabilityHandler>,
    bridge: MessageBridge,
    scripts: ScriptBuilder,

    monitor: ConnectionMonitor,
    heartbeat: HeartbeatProbe,
    heartbeat_enabled: bool,
    recovery: RecoveryController,
    screen: ScreenStateMachine,
    retry_timeout: Duration,

    auto_error_timer: TaskSlot,
    heartbeat_timer: TaskSlot,
    capability_slots: HashMap<Capability, TaskSlot>,
    retries: Vec<JoinHandle<()>>,

    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    status_tx: watch::Sender<ConnectionStatus>,
    view_tx: watch::Sender<FallbackView>,
    disposed: bool,
}

/// Collaborators and channels assembled by the builder.
pub(crate) struct Parts<R: Renderer> {
    pub renderer: R,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub capabilities: Arc<dyn CapabilityHandler>,
    pub bridge: MessageBridge,
    pub monitor: ConnectionMonitor,
    pub events_tx: mpsc::UnboundedSender<Event>,
    pub events_rx: mpsc::UnboundedReceiver<Event>,
    pub status_tx: watch::Sender<ConnectionStatus>,
    pub view_tx: watch::Sender<FallbackView>,
}

impl<R: Renderer> Supervisor<R> {
    pub(crate) fn new(config: &SupervisorConfig, parts: Parts<R>) -> Self {
        Self {
            renderer: parts.renderer,
            probe: parts.probe,
            capabilities: parts.capabilities,
            bridge: parts.bridge,
            scripts: ScriptBuilder::new(&config.bridge),
            monitor: parts.monitor,
            heartbeat: HeartbeatProbe::new(&config.heartbeat),
            heartbeat_enabled: config.heartbeat.enabled,
            recovery: RecoveryController::new(&config.recovery),
            screen: ScreenStateMachine::new(&config.fallback),
            retry_timeout: config.fallback.reachability_timeout(),
            auto_error_timer: TaskSlot::new(),
            heartbeat_timer: TaskSlot::new(),
            capability_slots: HashMap::new(),
            retries: Vec::new(),
            events_tx: parts.events_tx,
            events_rx: parts.events_rx,
            status_tx: parts.status_tx,
            view_tx: parts.view_tx,
            disposed: false,
        }
    }

    /// Process events until shutdown, then dispose.
    pub(crate) async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Renderer supervisor started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Supervisor received dispose signal, exiting loop");
                    break;
                }
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                else => break,
            }
        }

        self.dispose();
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Renderer(event) => self.handle_renderer_event(event),
            Event::Fallback(command) => self.handle_command(command),
            Event::SetSlowThreshold(threshold) => self.monitor.set_slow_connection_threshold(threshold),
            Event::SetShowErrorOnTimeout(enabled) => self.monitor.set_should_show_error_on_timeout(enabled),
            Event::AutoErrorElapsed { generation } => self.on_auto_error_elapsed(generation),
            Event::HeartbeatElapsed { generation, token } => self.on_heartbeat_elapsed(generation, token),
            Event::RetryFinished { result } => self.on_retry_finished(result),
            Event::CapabilityFinished {
                capability,
                generation,
                result,
            } => self.on_capability_finished(capability, generation, result),
        }
    }

    fn handle_renderer_event(&mut self, event: RendererEvent) {
        tracing::trace!(event = event.kind(), "Renderer event");
        let now = Instant::now();

        match event {
            RendererEvent::LoadStart { url } => {
                self.auto_error_timer.cancel();
                if let Some(delay) = self.monitor.on_load_start(&url, now) {
                    let tx = self.events_tx.clone();
                    self.auto_error_timer.spawn(move |generation| async move {
                        time::sleep(delay).await;
                        let _ = tx.send(Event::AutoErrorElapsed { generation });
                    });
                }
            }
            RendererEvent::LoadEnd { url } => {
                self.auto_error_timer.cancel();
                let outcome = self.monitor.on_load_end(&url, now);
                self.recovery.on_load_success();
                self.publish_status();
                let transition = self.screen.on_connection_status(&outcome.status, outcome.was_initial_load);
                self.after_transition(transition);
            }
            RendererEvent::LoadError { error, url } => self.on_load_error(&error, &url),
            RendererEvent::HttpStatus { code } => {
                if let Some(failure) = Failure::from_http_status(code) {
                    self.handle_failure(failure, now);
                }
            }
            RendererEvent::ContentProcessTerminated => self.handle_failure(Failure::RendererCrash, now),
            RendererEvent::RenderProcessLost { did_crash } => {
                self.handle_failure(Failure::from_process_lost(did_crash), now)
            }
            RendererEvent::Message { raw } => self.on_message(&raw),
            RendererEvent::Foreground => self.on_foreground(now),
        }
    }

    fn on_load_error(&mut self, error: &LoadError, url: &str) {
        self.auto_error_timer.cancel();
        let outcome = self.monitor.on_load_error(error, url);
        self.publish_status();

        let transition = self.screen.on_connection_status(&outcome.status, outcome.was_initial_load);
        self.after_transition(transition);

        if outcome.server_down {
            let transition = self.screen.show_connection_error(ErrorTrigger::ServerDown);
            self.after_transition(transition);
        }
    }

    fn on_message(&mut self, raw: &str) {
        match self.bridge.route(raw) {
            Ok(Routed::Liveness) => self.heartbeat.record_ack(),
            Ok(Routed::Capability { capability, payload }) => self.start_capability(capability, payload),
            Ok(Routed::Handled) => {}
            Err(e) => tracing::warn!(error = %e, "Rejected renderer message"),
        }
    }

    fn on_foreground(&mut self, now: Instant) {
        if !self.heartbeat_enabled {
            return;
        }

        let (token, message) = self.heartbeat.start(now);
        let script = self.scripts.render(&message);
        let injected = self.renderer.inject_script(&script);
        self.command_result("inject_script", injected);

        let window = self.heartbeat.ack_window();
        let tx = self.events_tx.clone();
        let token = token.value;
        self.heartbeat_timer.spawn(move |generation| async move {
            time::sleep(window).await;
            let _ = tx.send(Event::HeartbeatElapsed { generation, token });
        });
    }

    fn on_heartbeat_elapsed(&mut self, generation: u64, token: Uuid) {
        if !self.heartbeat_timer.complete(generation) {
            return;
        }
        if self.heartbeat.on_window_elapsed(token) == ProbeVerdict::Failed {
            self.handle_failure(Failure::LivenessTimeout, Instant::now());
        }
    }

    fn on_auto_error_elapsed(&mut self, generation: u64) {
        if !self.auto_error_timer.complete(generation) {
            return;
        }
        if self.monitor.auto_error_enabled() {
            tracing::warn!("Initial load did not finish in time");
            let transition = self.screen.show_connection_error(ErrorTrigger::AutoErrorTimeout);
            self.after_transition(transition);
        } else {
            tracing::debug!("Automatic error timer elapsed while suppressed");
        }
    }

    fn handle_failure(&mut self, failure: Failure, now: Instant) {
        tracing::warn!(failure = %failure, kind = failure.kind(), "Renderer failure detected");

        match self.recovery.handle_failure(failure, now) {
            Some(RecoveryAction::SoftReload) => {
                let result = self.renderer.reload_in_place();
                self.command_result("reload_in_place", result);
            }
            Some(RecoveryAction::HardRemount) => {
                // probes issued to the old surface can no longer be acknowledged
                self.heartbeat.cancel();
                self.heartbeat_timer.cancel();
                let result = self.renderer.recreate_surface();
                self.command_result("recreate_surface", result);

                let forced = failure.recovery_request() == Some(RecoveryRequest::ForceHard);
                if forced && self.monitor.is_initial_load() {
                    let transition = self.screen.show_connection_error(ErrorTrigger::ForcedRemount);
                    self.after_transition(transition);
                }
            }
            None => {}
        }
    }

    fn handle_command(&mut self, command: FallbackCommand) {
        let transition = match command {
            FallbackCommand::ShowConnectionError => self.screen.show_connection_error(ErrorTrigger::External),
            FallbackCommand::ShowManualInstructions => self.screen.show_manual_instructions(),
            FallbackCommand::ShowNormal => self.screen.show_normal(),
            FallbackCommand::Retry => {
                self.start_retry();
                None
            }
        };
        self.after_transition(transition);
    }

    fn start_retry(&mut self) {
        self.retries.retain(|handle| !handle.is_finished());
        self.screen.retry_started();
        self.publish_view();

        let probe = self.probe.clone();
        let timeout = self.retry_timeout;
        let tx = self.events_tx.clone();
        tracing::info!(timeout_ms = timeout.as_millis() as u64, "Manual retry started");
        self.retries.push(tokio::spawn(async move {
            let result = probe_with_timeout(probe.as_ref(), timeout).await;
            let _ = tx.send(Event::RetryFinished { result });
        }));
    }

    fn on_retry_finished(&mut self, result: Result<(), ProbeError>) {
        let reachable = result.is_ok();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Manual retry could not reach the backend");
        }

        self.screen.retry_finished(reachable);
        if reachable {
            tracing::info!("Backend reachable, resetting supervision and reloading");
            self.auto_error_timer.cancel();
            self.monitor.reset();
            self.recovery.reset();
            self.publish_status();
            let result = self.renderer.reload_in_place();
            self.command_result("reload_in_place", result);
        }
        // busy indicator may change without a transition
        self.publish_view();
    }

    fn start_capability(&mut self, capability: Capability, payload: Value) {
        let slot = self.capability_slots.entry(capability).or_default();
        if slot.is_occupied() {
            tracing::warn!(capability = %capability, "Capability request rejected, one already outstanding");
            let message = OutboundMessage::CapabilityResult {
                capability,
                outcome: Err(CapabilityError::Busy(capability).to_string()),
            };
            self.deliver(&message);
            return;
        }

        tracing::debug!(capability = %capability, "Capability request started");
        let request = self.capabilities.handle(capability, payload);
        let tx = self.events_tx.clone();
        slot.spawn(move |generation| async move {
            let result = request.await;
            let _ = tx.send(Event::CapabilityFinished {
                capability,
                generation,
                result,
            });
        });
    }

    fn on_capability_finished(
        &mut self,
        capability: Capability,
        generation: u64,
        result: Result<Value, CapabilityError>,
    ) {
        let current = self
            .capability_slots
            .get_mut(&capability)
            .is_some_and(|slot| slot.complete(generation));
        if !current {
            return;
        }

        if let Err(e) = &result {
            tracing::warn!(capability = %capability, error = %e, "Capability request failed");
        }
        let message = OutboundMessage::CapabilityResult {
            capability,
            outcome: result.map_err(|e| e.to_string()),
        };
        self.deliver(&message);
    }

    fn deliver(&self, message: &OutboundMessage) {
        let script = self.scripts.render(message);
        let result = self.renderer.inject_script(&script);
        self.command_result("inject_script", result);
    }

    fn command_result(&self, command: &'static str, result: Result<(), RendererError>) {
        if let Err(e) = result {
            tracing::error!(command, error = %e, "Renderer command failed");
            metrics::record_renderer_command_error(command);
        }
    }

    fn after_transition(&self, transition: Option<Transition>) {
        if transition.is_some() {
            self.publish_view();
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.monitor.status().clone());
    }

    fn publish_view(&self) {
        self.view_tx.send_replace(self.screen.view());
    }

    /// Cancel every pending timer and request. Safe to call repeatedly.
    pub(crate) fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.auto_error_timer.cancel();
        self.heartbeat_timer.cancel();
        self.heartbeat.cancel();
        for slot in self.capability_slots.values_mut() {
            slot.cancel();
        }
        for handle in self.retries.drain(..) {
            handle.abort();
        }
        self.events_rx.close();
        tracing::info!("Renderer supervisor disposed");
    }
}
