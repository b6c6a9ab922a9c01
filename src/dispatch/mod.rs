//! Event dispatch
//!
//! Routes in-window key events, OS-global hotkeys, pointer input and UI
//! commands to the overlay model, then drives the window, persistence and
//! notifications from the result.

pub mod coordinator;
pub mod global;

use serde::{Deserialize, Serialize};

pub use coordinator::{Coordinator, Services, FINISHED_DISPLAY};
pub use global::{GlobalShortcuts, LockDebounce, LOCK_DEBOUNCE};

/// Where keyboard focus is when a key-down arrives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyFocus {
    #[default]
    Overlay,
    /// A text field has focus; keys belong to it
    TextInput,
}

/// Part of the overlay under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitRegion {
    Background,
    Toolbar,
    TimerCard,
    SettingsPanel,
    Button,
    Input,
}

impl HitRegion {
    /// Only bare background moves the window
    pub fn is_draggable(self) -> bool {
        matches!(self, Self::Background)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Partial settings change; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsUpdate {
    pub opacity: Option<f64>,
    pub muted: Option<bool>,
    pub open: Option<bool>,
}

/// Current settings values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub opacity: f64,
    pub muted: bool,
    pub open: bool,
}
