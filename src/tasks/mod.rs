//! Background tasks module
//!
//! Countdown tick tasks and the global hotkey listener.

pub mod countdown;
pub mod hotkey_listener;

// Re-export main types
pub use countdown::{CountdownScheduler, TickControl, TICK};
pub use hotkey_listener::hotkey_listener_task;
