//! Shared application state

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{OverlayState, TimerId};

/// Change notifications for UI subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OverlayEvent {
    #[serde(rename_all = "camelCase")]
    TimerFinished {
        id: TimerId,
        position: usize,
        /// Sound palette index; absent when muted
        sound: Option<usize>,
    },
    TimersChanged,
    #[serde(rename_all = "camelCase")]
    LockChanged { pinned: bool, toolbar_collapsed: bool },
}

/// Process-wide state shared by the coordinator, tasks and HTTP handlers
#[derive(Debug)]
pub struct AppState {
    /// The overlay model. Held only for synchronous sections.
    overlay: Mutex<OverlayState>,
    pub start_time: Instant,
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
    pub events_tx: broadcast::Sender<OverlayEvent>,
}

impl AppState {
    pub fn new(overlay: OverlayState) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            overlay: Mutex::new(overlay),
            start_time: Instant::now(),
            last_action: Mutex::new(None),
            events_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, OverlayState> {
        // A panic mid-update leaves a model that is still structurally valid
        self.overlay.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read from the overlay model
    pub fn read<R>(&self, reader: impl FnOnce(&OverlayState) -> R) -> R {
        reader(&self.lock())
    }

    /// Mutate the overlay model and record the action for status reporting
    pub fn update<R>(&self, action: &str, updater: impl FnOnce(&mut OverlayState) -> R) -> R {
        let result = updater(&mut self.lock());
        debug!("Applied action: {}", action);
        *self.last_action.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((action.to_string(), Utc::now()));
        result
    }

    /// Mutate without touching last-action tracking (ticks, timeouts)
    pub fn update_quiet<R>(&self, updater: impl FnOnce(&mut OverlayState) -> R) -> R {
        updater(&mut self.lock())
    }

    /// Clone of the current model
    pub fn overlay(&self) -> OverlayState {
        self.lock().clone()
    }

    pub fn publish(&self, event: OverlayEvent) {
        // No receivers is normal when no UI is attached
        if self.events_tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.events_tx.send(event) {
            warn!("Failed to publish overlay event: {}", e);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events_tx.subscribe()
    }

    /// Calculate uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self
            .last_action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some((action, at)) => (Some(action), Some(at)),
            None => (None, None),
        }
    }
}
