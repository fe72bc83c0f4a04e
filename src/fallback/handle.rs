//! Injectable control surface for the fallback screen.

use tokio::sync::{mpsc, watch};

use crate::fallback::screen::{FallbackView, ScreenState};
use crate::health::ConnectionStatus;
use crate::supervisor::Event;

/// Requests that callers outside the supervisor can make of the fallback UI.
///
/// Implemented by [`FallbackHandle`]; consumers take it as `Arc<dyn FallbackControl>`
/// so they never depend on the supervisor itself.
pub trait FallbackControl: Send + Sync {
    fn show_connection_error(&self);
    fn show_manual_instructions(&self);
    fn show_normal(&self);
    /// Probe backend reachability and return to Normal on success.
    fn retry(&self);
    fn connection_status(&self) -> ConnectionStatus;
    fn view(&self) -> FallbackView;

    fn screen_state(&self) -> ScreenState {
        self.view().state
    }
}

/// Commands forwarded into the supervisor's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackCommand {
    ShowConnectionError,
    ShowManualInstructions,
    ShowNormal,
    Retry,
}

/// Cloneable handle onto a running supervisor's fallback screen.
///
/// Commands share the supervisor's event queue with renderer lifecycle
/// events, so calls made through this handle and through `SupervisorHandle`
/// are processed in the order they were made.
#[derive(Debug, Clone)]
pub struct FallbackHandle {
    events: mpsc::UnboundedSender<Event>,
    status: watch::Receiver<ConnectionStatus>,
    view: watch::Receiver<FallbackView>,
}

impl FallbackHandle {
    pub(crate) fn new(
        events: mpsc::UnboundedSender<Event>,
        status: watch::Receiver<ConnectionStatus>,
        view: watch::Receiver<FallbackView>,
    ) -> Self {
        Self { events, status, view }
    }

    /// Subscribe to screen changes (for the UI layer).
    pub fn subscribe_view(&self) -> watch::Receiver<FallbackView> {
        self.view.clone()
    }

    /// Subscribe to connection status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    fn send(&self, command: FallbackCommand) {
        if self.events.send(Event::Fallback(command)).is_err() {
            tracing::debug!(command = ?command, "Fallback command ignored, supervisor disposed");
        }
    }
}

impl FallbackControl for FallbackHandle {
    fn show_connection_error(&self) {
        self.send(FallbackCommand::ShowConnectionError);
    }

    fn show_manual_instructions(&self) {
        self.send(FallbackCommand::ShowManualInstructions);
    }

    fn show_normal(&self) {
        self.send(FallbackCommand::ShowNormal);
    }

    fn retry(&self) {
        self.send(FallbackCommand::Retry);
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    fn view(&self) -> FallbackView {
        *self.view.borrow()
    }
}
