//! IPC Server module for the control surface.
//!
//! This module provides a Unix Domain Socket server for receiving
//! newline-delimited JSON commands and sending status responses. It also owns
//! the shared daemon state the scheduler loop and readiness poller work on.

use crate::config::{ConfigManager, GestureConfig, GestureConfigPatch};
use crate::error::{ConfigError, IpcError};
use crate::geometry::SeededRandom;
use crate::metrics::MetricsCollector;
use crate::network::SysfsNetworkProbe;
use crate::scheduler::{GestureKind, Scheduler, TickEvent};
use crate::transport::HidTransport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

/// Default socket path for IPC communication.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/auto-swipe.sock";

/// Commands that can be received via IPC.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "command")]
pub enum IpcCommand {
    Start,
    Stop,
    /// Partial update as a JSON object.
    SetConfig {
        config: GestureConfigPatch,
    },
    /// Partial update as an urlencoded form body.
    SetConfigForm {
        form: String,
    },
    GetStatus,
    GetMetrics,
}

/// Status response sent to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusResponse {
    pub enabled: bool,
    pub connected: bool,
    pub network_ready: bool,
    pub state: String,
    pub swipe_in_flight: bool,
    /// Time until the next swipe, 0 when unscheduled.
    pub next_swipe_ms: u64,
    /// Time until the next like tap, 0 when unscheduled.
    pub next_like_ms: u64,
    pub config: GestureConfig,
}

/// Shared daemon state accessible by the IPC server and worker tasks.
pub struct DaemonState {
    /// Configuration manager
    pub config_manager: Arc<ConfigManager>,
    /// Swipe/like scheduler, driven by the scheduler loop
    pub scheduler: Mutex<Scheduler<SeededRandom>>,
    /// Frame transport
    pub transport: Mutex<Box<dyn HidTransport + Send>>,
    /// Last observed transport link state
    pub connected: AtomicBool,
    /// Cached network readiness, refreshed by the poller
    pub network_ready: AtomicBool,
    pub metrics: MetricsCollector,
    /// Wakes the scheduler loop early after a config change
    pub wake: Notify,
    clock: Instant,
}

impl DaemonState {
    /// Create a new daemon state with the given config manager and transport.
    pub fn new(
        config_manager: Arc<ConfigManager>,
        transport: Box<dyn HidTransport + Send>,
        rng: SeededRandom,
    ) -> Self {
        let connected = transport.is_connected();
        Self {
            config_manager,
            scheduler: Mutex::new(Scheduler::new(rng)),
            transport: Mutex::new(transport),
            connected: AtomicBool::new(connected),
            network_ready: AtomicBool::new(false),
            metrics: MetricsCollector::new(),
            wake: Notify::new(),
            clock: Instant::now(),
        }
    }

    /// Milliseconds on the daemon's monotonic clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    /// Run one scheduler tick. Returns what happened and the absolute time
    /// the next tick is due.
    pub async fn tick(&self) -> (TickEvent, u64) {
        let config = self.config_manager.get();
        let mut scheduler = self.scheduler.lock().await;
        let mut transport = self.transport.lock().await;
        let now = self.now_ms();

        let event = scheduler.tick(
            now,
            &config,
            &mut **transport,
            &self.network_ready,
            &self.metrics,
        );
        self.connected.store(transport.is_connected(), Ordering::SeqCst);

        match event {
            TickEvent::Completed(GestureKind::Swipe) => self.metrics.record_swipe(),
            TickEvent::Completed(GestureKind::Like) => self.metrics.record_like(),
            _ => {}
        }

        (event, scheduler.next_wakeup(now))
    }

    /// Retry the transport link and re-probe the network.
    pub async fn refresh_readiness(&self, probe: &SysfsNetworkProbe) {
        {
            let mut transport = self.transport.lock().await;
            if !transport.is_connected() {
                if let Err(e) = transport.reconnect() {
                    debug!("Transport reconnect failed: {}", e);
                }
            }
            self.connected.store(transport.is_connected(), Ordering::SeqCst);
        }

        let ready = probe.probe();
        self.network_ready.store(ready, Ordering::SeqCst);
    }

    /// Get the current status as a StatusResponse.
    pub async fn get_status(&self) -> StatusResponse {
        let config = self.config_manager.get();
        let scheduler = self.scheduler.lock().await;
        let now = self.now_ms();
        let schedule = scheduler.schedule();
        let until = |at: Option<u64>| at.map_or(0, |t| t.saturating_sub(now));

        StatusResponse {
            enabled: config.enabled,
            connected: self.connected.load(Ordering::SeqCst),
            network_ready: self.network_ready.load(Ordering::SeqCst),
            state: scheduler.state().as_str().to_string(),
            swipe_in_flight: schedule.swipe_in_flight,
            next_swipe_ms: until(schedule.next_swipe_at),
            next_like_ms: until(schedule.next_like_at),
            config,
        }
    }

    /// Merge, normalize and persist a config patch, then force the next
    /// swipe to be rescheduled under the new config.
    pub async fn apply_patch(&self, patch: &GestureConfigPatch) -> Result<GestureConfig, ConfigError> {
        let config = self.config_manager.update(patch)?;
        self.scheduler.lock().await.reset_next_swipe();
        self.wake.notify_one();
        Ok(config)
    }

    /// Enable or disable swiping and persist the flag.
    pub async fn set_enabled(&self, enabled: bool) -> Result<GestureConfig, ConfigError> {
        let patch = GestureConfigPatch {
            enabled: Some(enabled),
            ..GestureConfigPatch::default()
        };
        self.apply_patch(&patch).await
    }

    /// Check if swiping is enabled.
    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.config_manager.get().enabled
    }
}

/// Unix Domain Socket server for IPC.
pub struct IpcServer {
    /// Path to the Unix socket
    socket_path: PathBuf,
    /// Unix listener for incoming connections
    listener: UnixListener,
}

impl IpcServer {
    /// Create a new IPC server at the specified path.
    ///
    /// This will:
    /// 1. Remove any existing socket file at the path
    /// 2. Bind a new Unix socket at the path
    pub async fn new(path: &str) -> Result<Self, IpcError> {
        let socket_path = PathBuf::from(path);

        Self::cleanup_socket(&socket_path)?;

        let listener = UnixListener::bind(&socket_path).map_err(|e| IpcError::SocketBindFailed {
            path: path.to_string(),
            source: e,
        })?;

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Create a new IPC server at the default path.
    pub async fn new_default() -> Result<Self, IpcError> {
        Self::new(DEFAULT_SOCKET_PATH).await
    }

    /// Clean up an existing socket file.
    fn cleanup_socket(path: &Path) -> Result<(), IpcError> {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| IpcError::SocketBindFailed {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept and handle incoming connections.
    pub async fn run(&self, state: Arc<DaemonState>) -> Result<(), IpcError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, state).await {
                            tracing::warn!("Error handling IPC connection: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting IPC connection: {}", e);
                }
            }
        }
    }

    /// Handle a single client connection.
    async fn handle_connection(
        stream: UnixStream,
        state: Arc<DaemonState>,
    ) -> Result<(), IpcError> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        // Newline-delimited JSON
        while reader.read_line(&mut line).await? > 0 {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                line.clear();
                continue;
            }

            let response = match serde_json::from_str::<IpcCommand>(trimmed) {
                Ok(command) => Self::handle_command(command, &state).await,
                Err(e) => serde_json::json!({
                    "success": false,
                    "error": IpcError::InvalidCommand(e.to_string()).to_string()
                }),
            };

            let response_str = serde_json::to_string(&response)?;
            writer.write_all(response_str.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;

            line.clear();
        }

        Ok(())
    }

    fn config_response(result: Result<GestureConfig, ConfigError>, what: &str) -> serde_json::Value {
        match result {
            Ok(config) => {
                tracing::info!("{} via IPC", what);
                serde_json::json!({
                    "success": true,
                    "message": what,
                    "config": config
                })
            }
            Err(e) => {
                tracing::warn!("Failed to update config via IPC: {}", e);
                serde_json::json!({
                    "success": false,
                    "error": e.to_string()
                })
            }
        }
    }

    /// Handle a single IPC command and return the response.
    pub async fn handle_command(
        command: IpcCommand,
        state: &Arc<DaemonState>,
    ) -> serde_json::Value {
        match command {
            IpcCommand::Start => Self::config_response(state.set_enabled(true).await, "Swiping started"),

            IpcCommand::Stop => Self::config_response(state.set_enabled(false).await, "Swiping stopped"),

            IpcCommand::SetConfig { config } => {
                Self::config_response(state.apply_patch(&config).await, "Configuration updated")
            }

            IpcCommand::SetConfigForm { form } => {
                let patch = GestureConfigPatch::from_form(&form);
                Self::config_response(state.apply_patch(&patch).await, "Configuration updated")
            }

            IpcCommand::GetStatus => {
                let status = state.get_status().await;
                serde_json::to_value(status).unwrap_or_else(|e| {
                    serde_json::json!({
                        "error": format!("Failed to serialize status: {}", e)
                    })
                })
            }

            IpcCommand::GetMetrics => {
                let metrics = state.metrics.get_metrics();
                serde_json::to_value(metrics).unwrap_or_else(|e| {
                    serde_json::json!({
                        "error": format!("Failed to serialize metrics: {}", e)
                    })
                })
            }
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
            info!("Removed IPC socket {:?}", self.socket_path);
        }
    }
}
