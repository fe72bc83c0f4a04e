//! Shared utilities for supervisor integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use renderer_supervisor::bridge::{Capability, CapabilityError, CapabilityHandler};
use renderer_supervisor::fallback::{ProbeError, ReachabilityProbe};
use renderer_supervisor::{Renderer, RendererError};

/// A command the supervisor issued to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reload,
    Remount,
    Inject(String),
}

/// Renderer that records every command it receives.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    /// Recovery commands only (reloads and remounts), in order.
    pub fn recoveries(&self) -> Vec<Command> {
        self.commands()
            .into_iter()
            .filter(|c| !matches!(c, Command::Inject(_)))
            .collect()
    }

    pub fn injected(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Inject(script) => Some(script),
                _ => None,
            })
            .collect()
    }

    fn push(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

impl Renderer for RecordingRenderer {
    fn reload_in_place(&self) -> Result<(), RendererError> {
        self.push(Command::Reload);
        Ok(())
    }

    fn recreate_surface(&self) -> Result<(), RendererError> {
        self.push(Command::Remount);
        Ok(())
    }

    fn inject_script(&self, code: &str) -> Result<(), RendererError> {
        self.push(Command::Inject(code.to_string()));
        Ok(())
    }
}

/// Reachability probe with a scripted answer after a delay.
pub struct StubProbe {
    pub reachable: Option<bool>,
    pub delay: Duration,
}

impl StubProbe {
    pub fn up(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reachable: Some(true),
            delay,
        })
    }

    pub fn down(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reachable: Some(false),
            delay,
        })
    }

    /// Never answers; only the retry timeout ends it.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            reachable: None,
            delay: Duration::ZERO,
        })
    }
}

impl ReachabilityProbe for StubProbe {
    fn probe(&self) -> BoxFuture<'static, Result<(), ProbeError>> {
        let reachable = self.reachable;
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            match reachable {
                Some(true) => Ok(()),
                Some(false) => Err(ProbeError::Status(503)),
                None => futures_util::future::pending().await,
            }
        })
    }
}

/// Capability handler that answers every request after a delay.
pub struct DelayedCapabilities {
    pub delay: Duration,
    pub result: Value,
}

impl CapabilityHandler for DelayedCapabilities {
    fn handle(&self, _capability: Capability, _payload: Value) -> BoxFuture<'static, Result<Value, CapabilityError>> {
        let delay = self.delay;
        let result = self.result.clone();
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(result)
        })
    }
}

/// Let the supervisor task drain its queue without moving the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time, then let spawned timers deliver into the loop.
pub async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
