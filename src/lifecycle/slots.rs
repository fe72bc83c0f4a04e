//! Single-occupancy slots for spawned timers and requests.

use std::future::Future;

use tokio::task::JoinHandle;

/// Owns at most one spawned task at a time.
///
/// Each spawn gets a fresh generation; a completion event carrying an older
/// generation belongs to a superseded task and must be ignored. The slot stays
/// occupied until the owner acknowledges completion with [`TaskSlot::complete`].
#[derive(Debug, Default)]
pub struct TaskSlot {
    current: Option<(u64, JoinHandle<()>)>,
    next_generation: u64,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort any occupant and spawn a new task built from its generation.
    pub fn spawn<F, Fut>(&mut self, make: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.next_generation;
        self.next_generation += 1;
        let handle = tokio::spawn(make(generation));
        self.current = Some((generation, handle));
        generation
    }

    /// Abort the occupant, if any. Returns whether something was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Acknowledge completion of `generation`. Returns false for stale events.
    pub fn complete(&mut self, generation: u64) -> bool {
        if self.is_current(generation) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        matches!(self.current, Some((current, _)) if current == generation)
    }

    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
