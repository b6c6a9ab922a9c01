//! Error types for the overlay core

use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::state::TimerId;

/// Convenient result type for the overlay crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for timer, keybind and collaborator operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No timer with this id exists (it may have been removed).
    #[error("Unknown timer: {0}")]
    UnknownTimer(TimerId),

    /// At least one timer must always exist.
    #[error("Cannot remove the last remaining timer")]
    LastTimer,

    /// Time fields can only be edited while the timer is idle.
    #[error("Timer {0} is running")]
    TimerRunning(TimerId),

    /// Minutes or seconds outside their allowed range.
    #[error("Invalid time {minutes}:{seconds:02}")]
    InvalidTime { minutes: u32, seconds: u32 },

    /// The captured key combination is already bound elsewhere in the set.
    #[error("This keybind is already in use: {0}")]
    DuplicateKeybind(String),

    /// The binding target does not exist in this set.
    #[error("No such keybind slot: {0}")]
    UnknownBinding(String),

    /// A windowing or hotkey host call failed.
    #[error("Host error: {0}")]
    Host(String),

    /// Snapshot persistence failed.
    #[error("Store error: {0}")]
    Store(String),

    /// I/O failure while reading or writing state.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a rejected user operation rather than a missing target.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::LastTimer
                | Self::TimerRunning(_)
                | Self::InvalidTime { .. }
                | Self::DuplicateKeybind(_)
        )
    }
}
