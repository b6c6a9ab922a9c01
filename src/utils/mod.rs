//! Utility functions module

pub mod signals;

// Re-export main functions
pub use signals::{install_signals, shutdown_signal};
