//! Renderer supervisor trace replay.
//!
//! Replays a recorded renderer lifecycle trace against a supervisor wired to a
//! logging renderer, so incidents seen on devices can be reproduced offline.
//!
//! # Trace format
//!
//! One JSON object per line, each a `RendererEvent` plus an `at_ms` offset
//! from the start of the replay:
//!
//! ```text
//! {"at_ms": 0,    "event": "load_start", "url": "https://app.example.com"}
//! {"at_ms": 6000, "event": "load_error", "url": "https://app.example.com", "error": {"http": {"status": 503}}}
//! {"at_ms": 9000, "event": "foreground"}
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{self, Instant};

use renderer_supervisor::config::loader::load_config;
use renderer_supervisor::config::watcher::ConfigWatcher;
use renderer_supervisor::observability::{logging, metrics};
use renderer_supervisor::{
    FallbackControl, Renderer, RendererError, RendererEvent, SupervisorBuilder, SupervisorConfig,
};

#[derive(Parser)]
#[command(name = "renderer-supervisor")]
#[command(about = "Replay a renderer lifecycle trace through the liveness supervisor", long_about = None)]
struct Cli {
    /// Supervisor configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trace file with one JSON event per line.
    #[arg(short, long)]
    events: PathBuf,

    /// Reload thresholds when the config file changes.
    #[arg(long)]
    watch: bool,

    /// How long to keep running after the last event, in milliseconds.
    #[arg(long, default_value_t = 6000)]
    settle_ms: u64,
}

#[derive(Deserialize)]
struct TraceEntry {
    at_ms: u64,
    #[serde(flatten)]
    event: RendererEvent,
}

/// Renderer that only logs the commands it receives.
struct LoggingRenderer;

impl Renderer for LoggingRenderer {
    fn reload_in_place(&self) -> Result<(), RendererError> {
        tracing::info!(command = "reload_in_place", "Renderer command");
        Ok(())
    }

    fn recreate_surface(&self) -> Result<(), RendererError> {
        tracing::info!(command = "recreate_surface", "Renderer command");
        Ok(())
    }

    fn inject_script(&self, code: &str) -> Result<(), RendererError> {
        tracing::info!(command = "inject_script", bytes = code.len(), "Renderer command");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SupervisorConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("renderer-supervisor v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => Some(ConfigWatcher::new(path, &config)),
        _ => None,
    };

    let (supervisor, task) = SupervisorBuilder::new(config, LoggingRenderer).spawn()?;

    // The watcher stops when dropped, so keep it for the whole replay.
    let _watcher = match watcher {
        Some((watcher, mut updates)) => {
            let watcher = watcher.run()?;
            let handle = supervisor.clone();
            tokio::spawn(async move {
                while let Some(tuning) = updates.recv().await {
                    let applied = handle
                        .set_slow_connection_threshold(tuning.slow_connection_threshold)
                        .and_then(|()| handle.set_should_show_error_on_timeout(tuning.show_error_on_timeout));
                    if applied.is_err() {
                        break;
                    }
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let file = tokio::fs::File::open(&cli.events).await?;
    let mut lines = BufReader::new(file).lines();
    let start = Instant::now();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let entry: TraceEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed trace line");
                continue;
            }
        };

        time::sleep_until(start + Duration::from_millis(entry.at_ms)).await;
        tracing::debug!(line = line_no, event = entry.event.kind(), "Replaying event");
        supervisor.renderer_event(entry.event)?;
    }

    time::sleep(Duration::from_millis(cli.settle_ms)).await;

    let fallback = supervisor.fallback();
    let summary = serde_json::json!({
        "screen": fallback.view(),
        "connection": fallback.connection_status(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    supervisor.dispose();
    task.await?;
    tracing::info!("Replay complete");
    Ok(())
}
