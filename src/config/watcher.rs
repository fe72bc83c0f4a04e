//! Configuration file watcher for hot reload.
//!
//! Only the connection thresholds can change on a running supervisor, so the
//! watcher reduces each reloaded file to a [`RuntimeTuning`] and forwards it
//! only when it differs from the last one sent.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::SupervisorConfig;

/// Settings a live supervisor accepts without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeTuning {
    pub slow_connection_threshold: Duration,
    pub show_error_on_timeout: bool,
}

impl RuntimeTuning {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            slow_connection_threshold: config.connection.slow_threshold(),
            show_error_on_timeout: config.connection.show_error_on_timeout,
        }
    }
}

/// Watches the configuration file and emits tuning changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: RuntimeTuning,
    update_tx: mpsc::UnboundedSender<RuntimeTuning>,
}

impl ConfigWatcher {
    /// `initial` is the configuration the supervisor was started with.
    pub fn new(path: &Path, initial: &SupervisorConfig) -> (Self, mpsc::UnboundedReceiver<RuntimeTuning>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                current: RuntimeTuning::from_config(initial),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for updates to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let last = Mutex::new(self.current);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let tuning = match load_config(&path) {
                        Ok(config) => RuntimeTuning::from_config(&config),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current thresholds");
                            return;
                        }
                    };
                    let Ok(mut last) = last.lock() else {
                        return;
                    };
                    if let Some(tuning) = changed(&mut last, tuning) {
                        tracing::info!(
                            slow_threshold_ms = tuning.slow_connection_threshold.as_millis() as u64,
                            show_error_on_timeout = tuning.show_error_on_timeout,
                            "Config reloaded with new thresholds"
                        );
                        let _ = tx.send(tuning);
                    } else {
                        tracing::debug!("Config reloaded, thresholds unchanged");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Record `next` as current, returning it only if it differs.
fn changed(current: &mut RuntimeTuning, next: RuntimeTuning) -> Option<RuntimeTuning> {
    if *current == next {
        return None;
    }
    *current = next;
    Some(next)
}
