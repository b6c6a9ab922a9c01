//! Global hotkey listener task

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{dispatch::Coordinator, services::GlobalAction};

/// Consume OS hotkey presses for the lifetime of the process.
///
/// Spawned once at startup; each press is handled against live state.
pub async fn hotkey_listener_task(coordinator: Coordinator, mut presses: mpsc::Receiver<GlobalAction>) {
    info!("Starting hotkey listener task");
    let shutdown = coordinator.shutdown_token();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            press = presses.recv() => match press {
                Some(action) => {
                    debug!("Global hotkey: {:?}", action);
                    coordinator.handle_global_action(action).await;
                }
                None => {
                    debug!("Hotkey channel closed");
                    break;
                }
            },
        }
    }

    info!("Hotkey listener stopped");
}
