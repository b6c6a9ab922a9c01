//! ChronoGhost - core of a floating multi-timer overlay
//!
//! Independent countdown timers driven from in-window keybinds and OS-global
//! hotkeys, with DPI-aware window sizing. The host window, the hotkey
//! service, persistence and the status surface sit behind narrow traits; a
//! small HTTP API lets a UI shell drive the core.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod keybind;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::{create_router, ApiContext};
pub use config::Config;
pub use dispatch::{Coordinator, Services};
pub use error::{Error, Result};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
