//! ChronoGhost - floating multi-timer overlay core
//!
//! Runs the overlay core with a headless window and serves the control API.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use chronoghost::{
    api::{create_router, ApiContext},
    config::Config,
    dispatch::{Coordinator, Services},
    geometry::PhysicalSize,
    keybind::primary_symbol,
    services::{HeadlessWindow, HotkeyRegistry, JsonFileStore, MemoryStore, SnapshotStore, StatusNotifier},
    tasks::hotkey_listener_task,
    utils::{install_signals, shutdown_signal},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("chronoghost={},tower_http=info", config.log_level()))
        .init();

    info!("Starting chronoghost v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, window={}x{} at scale {}",
        config.host, config.port, config.width, config.height, config.scale_factor
    );

    let signals = install_signals().context("Failed to install signal handlers")?;

    let window = Arc::new(HeadlessWindow::new(
        PhysicalSize::new(config.width, config.height),
        config.scale_factor,
    ));
    let (hotkeys, presses) = HotkeyRegistry::new();
    let hotkeys = Arc::new(hotkeys);
    let store: Arc<dyn SnapshotStore> = if config.ephemeral {
        info!("Ephemeral mode, state is not saved");
        Arc::new(MemoryStore::new())
    } else {
        let path = config.state_path();
        info!("State file: {}", path.display());
        Arc::new(JsonFileStore::new(path))
    };

    let services = Services {
        window: window.clone(),
        hotkeys: hotkeys.clone(),
        store,
        notifier: StatusNotifier::new(),
    };
    let coordinator = Coordinator::restore(services, primary_symbol()).await;
    coordinator.start().await;

    // Single listener for OS hotkey presses
    tokio::spawn(hotkey_listener_task(coordinator.clone(), presses));

    let app = create_router(Arc::new(ApiContext {
        coordinator: coordinator.clone(),
        hotkeys,
    }));

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /status          - Timers, flags, keybinds and notification");
    info!("  POST /timers          - Add a timer");
    info!("  POST /keys            - Deliver an in-window key-down");
    info!("  POST /hotkeys/press   - Deliver an OS hotkey press");
    info!("  GET  /health          - Health check");

    let closed = window.closed();
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal(signals) => {
            info!("Shutdown signal received");
        }
        _ = closed.cancelled() => {
            info!("Window closed");
        }
    }

    coordinator.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
