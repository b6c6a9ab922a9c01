//! State management module
//!
//! The timer engine, the overlay model that owns it, the persisted snapshot
//! format and the shared application state handed to tasks and handlers.

pub mod app_state;
pub mod overlay_state;
pub mod snapshot;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, OverlayEvent};
pub use overlay_state::{ActionOutcome, LockState, OverlayState, TickOutcome};
pub use snapshot::{restore, Restored, Snapshot, TimerRecord};
pub use timer_state::{Clock, Direction, TimeUnit, Timer, TimerId, TimerPhase, Toggle};
