//! Host window collaborator

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{error::Result, geometry::PhysicalSize};

/// Windowing calls the overlay needs from its host.
#[async_trait]
pub trait WindowHost: Send + Sync {
    async fn current_size(&self) -> Result<PhysicalSize>;
    /// Scale factor of the monitor the window is currently on
    async fn scale_factor(&self) -> Result<f64>;
    async fn resize(&self, size: PhysicalSize) -> Result<()>;
    async fn set_resizable(&self, resizable: bool) -> Result<()>;
    /// Click-through: pointer events pass to whatever is behind the window
    async fn set_ignore_cursor_events(&self, ignore: bool) -> Result<()>;
    async fn start_drag(&self) -> Result<()>;
    async fn minimize(&self) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Observable state of a [`HeadlessWindow`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowRecord {
    pub size: PhysicalSize,
    pub scale_factor: f64,
    pub resizable: bool,
    pub ignore_cursor_events: bool,
    pub minimized: bool,
    pub drags: u32,
    pub resizes: u32,
}

/// In-process window that records every request.
///
/// Used when no native shell is attached and by tests. Closing it cancels the
/// token returned by [`HeadlessWindow::closed`].
#[derive(Debug)]
pub struct HeadlessWindow {
    record: Mutex<WindowRecord>,
    closed: CancellationToken,
}

impl HeadlessWindow {
    pub fn new(size: PhysicalSize, scale_factor: f64) -> Self {
        Self {
            record: Mutex::new(WindowRecord {
                size,
                scale_factor,
                resizable: true,
                ignore_cursor_events: false,
                minimized: false,
                drags: 0,
                resizes: 0,
            }),
            closed: CancellationToken::new(),
        }
    }

    pub fn record(&self) -> WindowRecord {
        self.with(|r| r.clone())
    }

    /// Simulate moving to a monitor with a different scale factor
    pub fn set_scale_factor(&self, scale_factor: f64) {
        self.with(|r| r.scale_factor = scale_factor);
    }

    /// Cancelled once the window has been closed
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    fn with<R>(&self, f: impl FnOnce(&mut WindowRecord) -> R) -> R {
        f(&mut self.record.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl WindowHost for HeadlessWindow {
    async fn current_size(&self) -> Result<PhysicalSize> {
        Ok(self.with(|r| r.size))
    }

    async fn scale_factor(&self) -> Result<f64> {
        Ok(self.with(|r| r.scale_factor))
    }

    async fn resize(&self, size: PhysicalSize) -> Result<()> {
        debug!("Window resize to {}x{}", size.width, size.height);
        self.with(|r| {
            r.size = size;
            r.resizes += 1;
        });
        Ok(())
    }

    async fn set_resizable(&self, resizable: bool) -> Result<()> {
        self.with(|r| r.resizable = resizable);
        Ok(())
    }

    async fn set_ignore_cursor_events(&self, ignore: bool) -> Result<()> {
        debug!("Click-through {}", if ignore { "on" } else { "off" });
        self.with(|r| r.ignore_cursor_events = ignore);
        Ok(())
    }

    async fn start_drag(&self) -> Result<()> {
        self.with(|r| r.drags += 1);
        Ok(())
    }

    async fn minimize(&self) -> Result<()> {
        self.with(|r| r.minimized = true);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Window close requested");
        self.closed.cancel();
        Ok(())
    }
}
