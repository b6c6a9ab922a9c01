//! Transient status messages for the UI

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

/// How long a message stays up
pub const DISMISS_AFTER: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotifyKind,
    pub message: String,
}

/// Publishes the current status message on a watch channel.
///
/// Each post replaces the previous message and schedules its own dismissal; a
/// dismissal never clears a newer message. Posting spawns onto the current
/// tokio runtime.
#[derive(Debug, Clone)]
pub struct StatusNotifier {
    tx: Arc<watch::Sender<Option<Notification>>>,
    latest: Arc<AtomicU64>,
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.post(NotifyKind::Info, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(NotifyKind::Error, message.into());
    }

    fn post(&self, kind: NotifyKind, message: String) {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        info!(kind = ?kind, message = %message, "notification_display");
        self.tx.send_replace(Some(Notification { id, kind, message }));

        let tx = Arc::clone(&self.tx);
        let latest = Arc::clone(&self.latest);
        tokio::spawn(async move {
            tokio::time::sleep(DISMISS_AFTER).await;
            if latest.load(Ordering::SeqCst) == id {
                tx.send_replace(None);
            }
        });
    }

    pub fn current(&self) -> Option<Notification> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.tx.subscribe()
    }
}
