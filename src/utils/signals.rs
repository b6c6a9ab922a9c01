//! Signal handling for graceful shutdown

use std::io;

use futures::stream::StreamExt;
use signal_hook_tokio::Signals;
use tracing::info;

/// Install handlers for SIGTERM and SIGINT
pub fn install_signals() -> io::Result<Signals> {
    Signals::new([signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT])
}

/// Wait for the first shutdown signal
pub async fn shutdown_signal(mut signals: Signals) {
    if let Some(signal) = signals.next().await {
        info!("Received signal: {}", signal);
    }
    signals.handle().close();
}
