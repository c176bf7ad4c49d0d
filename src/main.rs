//! Auto-swipe daemon - humanized touch gesture synthesis over a USB HID gadget.
//!
//! The daemon schedules randomized swipes and occasional double-tap "likes"
//! and emits them as single-contact digitizer reports on `/dev/hidg0`.

mod config;
mod error;
mod executor;
mod geometry;
mod ipc_server;
mod logging;
mod metrics;
mod network;
mod protocol;
mod scheduler;
mod synth;
mod transport;

use config::ConfigManager;
use error::DaemonError;
use geometry::SeededRandom;
use ipc_server::{DaemonState, IpcServer};
use network::SysfsNetworkProbe;
use scheduler::TickEvent;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};
use transport::{HidGadgetTransport, DEFAULT_HID_DEVICE};

/// Readiness polling interval (transport reconnect + network probe)
const READINESS_POLL_INTERVAL_SECS: u64 = 1;

/// Restart delay for a failed IPC server
const IPC_RESTART_DELAY_SECS: u64 = 5;

/// Restart delay for a scheduler loop that panicked
const SCHEDULER_RESTART_DELAY_SECS: u64 = 1;

/// Graceful shutdown timeout in seconds
const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

/// Environment variable overriding the HID gadget device path
const HID_DEVICE_ENV: &str = "AUTO_SWIPE_HID_DEVICE";

/// Environment variable fixing the RNG seed for reproducible runs
const SEED_ENV: &str = "AUTO_SWIPE_SEED";

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    // Raw descriptor bytes for the gadget's configfs `report_desc`
    if std::env::args().any(|arg| arg == "--report-descriptor") {
        let mut stdout = std::io::stdout();
        stdout.write_all(protocol::REPORT_DESCRIPTOR)?;
        stdout.flush()?;
        return Ok(());
    }

    let _log_guard = logging::init_logging().map_err(|e| {
        eprintln!("Failed to initialize logging: {}", e);
        e
    })?;

    info!("Auto-swipe daemon starting...");

    let result = run_daemon().await;

    match &result {
        Ok(()) => info!("Auto-swipe daemon shut down gracefully"),
        Err(e) => error!("Auto-swipe daemon error: {}", e),
    }

    result
}

fn hid_device_path() -> PathBuf {
    std::env::var_os(HID_DEVICE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HID_DEVICE))
}

fn random_source() -> SeededRandom {
    match std::env::var(SEED_ENV).ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(seed) => {
            info!("Using fixed RNG seed {}", seed);
            SeededRandom::from_seed(seed)
        }
        None => SeededRandom::from_entropy(),
    }
}

async fn run_daemon() -> Result<(), DaemonError> {
    let config_path = ConfigManager::default_path();
    let config_manager = Arc::new(ConfigManager::load_or_default(&config_path)?);
    info!("Configuration loaded from {:?}", config_manager.path());

    let device_path = hid_device_path();
    let transport = HidGadgetTransport::new(&device_path);
    info!("Using HID device {:?}", transport.path());

    let daemon_state = Arc::new(DaemonState::new(
        config_manager,
        Box::new(transport),
        random_source(),
    ));
    let probe = SysfsNetworkProbe::new();
    daemon_state.refresh_readiness(&probe).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = setup_signal_handlers(signal_tx).await {
            error!("Signal handler error: {}", e);
        }
    });

    let ipc_state = Arc::clone(&daemon_state);
    let ipc_shutdown_rx = shutdown_rx.clone();
    let ipc_handle = tokio::spawn(async move { run_ipc_server(ipc_state, ipc_shutdown_rx).await });

    let readiness_state = Arc::clone(&daemon_state);
    let readiness_shutdown_rx = shutdown_rx.clone();
    let readiness_handle = tokio::spawn(async move {
        run_readiness_poller(readiness_state, probe, readiness_shutdown_rx).await
    });

    let scheduler_state = Arc::clone(&daemon_state);
    let scheduler_shutdown_rx = shutdown_rx.clone();
    let scheduler_handle = tokio::spawn(async move {
        let loop_shutdown_rx = scheduler_shutdown_rx.clone();
        supervise(
            "Scheduler loop",
            Duration::from_secs(SCHEDULER_RESTART_DELAY_SECS),
            scheduler_shutdown_rx,
            move || run_scheduler_loop(Arc::clone(&scheduler_state), loop_shutdown_rx.clone()),
        )
        .await
    });

    info!("Auto-swipe daemon initialized and running");

    let mut shutdown_rx_main = shutdown_rx.clone();
    shutdown_rx_main.changed().await.ok();

    info!("Shutdown signal received, stopping tasks...");

    let shutdown_timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
    let _ = tokio::time::timeout(shutdown_timeout, async {
        let _ = tokio::join!(ipc_handle, readiness_handle, scheduler_handle);
    })
    .await;

    info!("All tasks stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown on SIGTERM and SIGINT.
async fn setup_signal_handlers(
    shutdown_tx: watch::Sender<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
        }
    }

    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Run the IPC server, restarting it after failures.
async fn run_ipc_server(state: Arc<DaemonState>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("IPC server shutting down");
                    break;
                }
            }
            result = run_ipc_server_inner(Arc::clone(&state)) => {
                match result {
                    Ok(()) => break,
                    Err(e) => {
                        error!(
                            "IPC server error: {}, restarting in {} seconds",
                            e, IPC_RESTART_DELAY_SECS
                        );
                        tokio::time::sleep(Duration::from_secs(IPC_RESTART_DELAY_SECS)).await;
                    }
                }
            }
        }
    }
}

async fn run_ipc_server_inner(state: Arc<DaemonState>) -> Result<(), error::IpcError> {
    let server = IpcServer::new_default().await?;
    info!("IPC server listening on {:?}", server.socket_path());
    server.run(state).await
}

/// Run `make_task` as its own tokio task, restarting it after a panic until
/// it returns normally or shutdown is signalled. Returns the number of runs.
async fn supervise<F, Fut>(
    name: &str,
    restart_delay: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut make_task: F,
) -> u32
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut runs = 0;
    loop {
        runs += 1;
        match tokio::spawn(make_task()).await {
            Ok(()) => break,
            Err(e) => {
                error!(
                    "{} failed: {}, restarting in {}ms",
                    name,
                    e,
                    restart_delay.as_millis()
                );
            }
        }

        if *shutdown_rx.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(restart_delay) => {}
        }
    }
    runs
}

/// Periodically retry the HID link and re-probe the network.
async fn run_readiness_poller(
    state: Arc<DaemonState>,
    probe: SysfsNetworkProbe,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let poll_interval = Duration::from_secs(READINESS_POLL_INTERVAL_SECS);

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Readiness poller shutting down");
                    break;
                }
            }
            _ = tokio::time::sleep(poll_interval) => {
                state.refresh_readiness(&probe).await;
            }
        }
    }
}

/// Drive the scheduler, sleeping until the next frame or timer is due.
async fn run_scheduler_loop(state: Arc<DaemonState>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        let (event, next_wakeup) = state.tick().await;
        match event {
            TickEvent::Scheduled {
                next_swipe_at,
                next_like_at,
            } => debug!(
                "Armed: next swipe at {}ms, next like at {:?}",
                next_swipe_at, next_like_at
            ),
            TickEvent::Completed(kind) => info!("{:?} completed", kind),
            _ => {}
        }

        let sleep_ms = next_wakeup.saturating_sub(state.now_ms());

        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Scheduler loop shutting down");
                    break;
                }
            }
            _ = state.wake.notified() => {}
            _ = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {}
        }
    }
}
