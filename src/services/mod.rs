//! External collaborators
//!
//! The overlay core talks to the host window, the OS hotkey service, the
//! snapshot store and the status surface only through these types.

pub mod hotkeys;
pub mod notifier;
pub mod store;
pub mod window;

pub use hotkeys::{GlobalAction, HotkeyHost, HotkeyRegistry, RegisteredHotkey};
pub use notifier::{Notification, NotifyKind, StatusNotifier};
pub use store::{JsonFileStore, MemoryStore, SnapshotStore};
pub use window::{HeadlessWindow, WindowHost, WindowRecord};
