//! Renderer liveness and recovery supervisor.
//!
//! # Architecture
//! ```text
//!  Host UI callbacks                       ┌──────────────────────────────────────┐
//!  ────────────────► SupervisorHandle ───► │            event loop                │
//!                                          │                                      │
//!                                          │  health::ConnectionMonitor ──┐       │
//!                                          │  health::HeartbeatProbe      │       │
//!                                          │  resilience::Recovery...     ▼       │
//!                                          │  fallback::ScreenStateMachine        │
//!  FallbackHandle (UI, bridge) ──────────► │  bridge::MessageBridge               │
//!                                          └──────┬─────────────────┬─────────────┘
//!                                                 │                 │
//!                                      Renderer commands     watch<FallbackView>
//!                                 (reload / remount / inject)  watch<ConnectionStatus>
//! ```
//!
//! # Design Decisions
//! - One task owns all state; timers and async work post events back to it
//! - No process-wide globals: every consumer gets a handle at construction
//! - Dispose is idempotent; dropping every handle also disposes

mod runtime;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::bridge::{CapabilityHandler, MessageBridge, NoCapabilities};
use crate::config::SupervisorConfig;
use crate::fallback::{FallbackControl, FallbackHandle, FallbackView, HttpReachability, ProbeError, ReachabilityProbe};
use crate::health::{ConnectionMonitor, ConnectionStatus, LoadError, StatusListener};
use crate::lifecycle::Shutdown;
use crate::renderer::{Renderer, RendererEvent};

pub(crate) use runtime::Event;
use runtime::{Parts, Supervisor};

/// Errors returned by [`SupervisorHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SupervisorError {
    #[error("supervisor has been disposed")]
    Disposed,
}

/// Assembles a supervisor and its collaborators.
pub struct SupervisorBuilder<R: Renderer> {
    config: SupervisorConfig,
    renderer: R,
    probe: Option<Arc<dyn ReachabilityProbe>>,
    capabilities: Arc<dyn CapabilityHandler>,
    listeners: Vec<Arc<dyn StatusListener>>,
}

impl<R: Renderer> SupervisorBuilder<R> {
    pub fn new(config: SupervisorConfig, renderer: R) -> Self {
        Self {
            config,
            renderer,
            probe: None,
            capabilities: Arc::new(NoCapabilities),
            listeners: Vec::new(),
        }
    }

    /// Replace the default HTTP reachability probe.
    pub fn reachability(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn capabilities(mut self, handler: Arc<dyn CapabilityHandler>) -> Self {
        self.capabilities = handler;
        self
    }

    /// Register a listener for every published ConnectionStatus.
    pub fn status_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Start the event loop on the current Tokio runtime.
    ///
    /// Fails only if the default HTTP reachability client cannot be built.
    pub fn spawn(self) -> Result<(SupervisorHandle, JoinHandle<()>), ProbeError> {
        let probe = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpReachability::new(self.config.fallback.reachability_url.clone())?),
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::initial());
        let (view_tx, view_rx) = watch::channel(FallbackView::default());

        let fallback = FallbackHandle::new(events_tx.clone(), status_rx, view_rx);
        let bridge = MessageBridge::new(Arc::new(fallback.clone()) as Arc<dyn FallbackControl>);

        let mut monitor = ConnectionMonitor::new(&self.config.connection);
        for listener in self.listeners {
            monitor.add_listener(listener);
        }

        let supervisor = Supervisor::new(
            &self.config,
            Parts {
                renderer: self.renderer,
                probe,
                capabilities: self.capabilities,
                bridge,
                monitor,
                events_tx: events_tx.clone(),
                events_rx,
                status_tx,
                view_tx,
            },
        );

        let shutdown = Arc::new(Shutdown::new());
        let task = tokio::spawn(supervisor.run(shutdown.subscribe()));

        let handle = SupervisorHandle {
            events: events_tx,
            fallback,
            shutdown,
        };
        Ok((handle, task))
    }
}

/// Collaborator → supervisor surface. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    events: mpsc::UnboundedSender<Event>,
    fallback: FallbackHandle,
    shutdown: Arc<Shutdown>,
}

impl SupervisorHandle {
    pub fn on_load_start(&self, url: impl Into<String>) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::LoadStart { url: url.into() })
    }

    pub fn on_load_end(&self, url: impl Into<String>) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::LoadEnd { url: url.into() })
    }

    pub fn on_load_error(&self, error: LoadError, url: impl Into<String>) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::LoadError { error, url: url.into() })
    }

    pub fn on_http_status(&self, code: u16) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::HttpStatus { code })
    }

    pub fn on_content_process_terminated(&self) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::ContentProcessTerminated)
    }

    pub fn on_render_process_lost(&self, did_crash: bool) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::RenderProcessLost { did_crash })
    }

    pub fn on_message(&self, raw: impl Into<String>) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::Message { raw: raw.into() })
    }

    pub fn on_foreground(&self) -> Result<(), SupervisorError> {
        self.renderer_event(RendererEvent::Foreground)
    }

    /// Forward an already-constructed lifecycle event.
    pub fn renderer_event(&self, event: RendererEvent) -> Result<(), SupervisorError> {
        self.send(Event::Renderer(event))
    }

    pub fn set_slow_connection_threshold(&self, threshold: Duration) -> Result<(), SupervisorError> {
        self.send(Event::SetSlowThreshold(threshold))
    }

    /// Suppress or re-enable the automatic error screen (e.g. during an auth handshake).
    pub fn set_should_show_error_on_timeout(&self, enabled: bool) -> Result<(), SupervisorError> {
        self.send(Event::SetShowErrorOnTimeout(enabled))
    }

    /// Handle for the fallback UI and anything else that needs to trigger it.
    pub fn fallback(&self) -> FallbackHandle {
        self.fallback.clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.fallback.connection_status()
    }

    /// Stop the supervisor and cancel all pending work. Idempotent.
    pub fn dispose(&self) {
        if self.shutdown.trigger() {
            tracing::debug!("Supervisor dispose requested");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_triggered() || self.events.is_closed()
    }

    fn send(&self, event: Event) -> Result<(), SupervisorError> {
        if self.shutdown.is_triggered() {
            return Err(SupervisorError::Disposed);
        }
        self.events.send(event).map_err(|_| SupervisorError::Disposed)
    }
}
