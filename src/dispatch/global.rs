//! OS-global hotkey registration and lock debounce

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    keybind::{shortcut_spec, KeybindSet, LOCK_SHORTCUT},
    services::{GlobalAction, HotkeyHost},
};

/// Minimum spacing between accepted lock-hotkey firings
pub const LOCK_DEBOUNCE: Duration = Duration::from_millis(300);

/// Hotkey specs and actions for a keybind set, lock hotkey last.
///
/// Bindings without a modifier stay in-window only.
pub fn registration_set(keybinds: &KeybindSet) -> Vec<(String, GlobalAction)> {
    let mut set: Vec<(String, GlobalAction)> = keybinds
        .global_bindings()
        .into_iter()
        .map(|(action, kb)| (shortcut_spec(kb), GlobalAction::Timer(action)))
        .collect();
    set.push((LOCK_SHORTCUT.to_string(), GlobalAction::ToggleLock));
    set
}

/// Replaces the OS hotkey set as a unit.
///
/// Replacements are serialized: a second call waits until the first has
/// finished both unregistering and registering.
pub struct GlobalShortcuts {
    host: Arc<dyn HotkeyHost>,
    gate: tokio::sync::Mutex<()>,
}

impl GlobalShortcuts {
    pub fn new(host: Arc<dyn HotkeyHost>) -> Self {
        Self {
            host,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Unregister everything, then register `keybinds` plus the lock hotkey.
    ///
    /// Individual registration failures are logged and skipped. Returns the
    /// number of specs registered.
    pub async fn replace(&self, keybinds: &KeybindSet) -> usize {
        let set = registration_set(keybinds);
        let _guard = self.gate.lock().await;

        if let Err(e) = self.host.unregister_all().await {
            warn!("Failed to unregister global shortcuts: {}", e);
        }
        let mut registered = 0;
        for (spec, action) in set {
            match self.host.register(&spec, action).await {
                Ok(()) => registered += 1,
                Err(e) => warn!("Failed to register global shortcut {}: {}", spec, e),
            }
        }
        debug!("Registered {} global shortcuts", registered);
        registered
    }

    pub async fn clear(&self) {
        let _guard = self.gate.lock().await;
        if let Err(e) = self.host.unregister_all().await {
            warn!("Failed to unregister global shortcuts: {}", e);
        }
    }
}

/// Drops lock-hotkey firings that arrive too soon after the last accepted one
#[derive(Debug, Default)]
pub struct LockDebounce {
    last_accepted: Mutex<Option<Instant>>,
}

impl LockDebounce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a firing now should be acted on
    pub fn accept(&self) -> bool {
        let now = Instant::now();
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(prev) if now.duration_since(prev) < LOCK_DEBOUNCE => {
                debug!("Lock hotkey debounced");
                false
            }
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keybind::{Keybind, Modifier, TimerAction},
        services::HotkeyRegistry,
    };

    #[test]
    fn modifier_less_bindings_are_not_registered() {
        let mut keybinds = KeybindSet::defaults("Ctrl");
        keybinds.selected_timer.reset = Some(Keybind::new("r", &[], "Ctrl"));
        let set = registration_set(&keybinds);

        assert_eq!(set.len(), 9 * 2 + 1 + 1);
        assert!(!set.iter().any(|(spec, _)| spec == "R"));
        assert!(set.contains(&(
            "CommandOrControl+Space".to_string(),
            GlobalAction::Timer(TimerAction::ToggleSelected)
        )));
        assert_eq!(
            set.last(),
            Some(&(LOCK_SHORTCUT.to_string(), GlobalAction::ToggleLock))
        );
    }

    #[tokio::test]
    async fn replace_skips_failed_specs() {
        let (registry, _rx) = HotkeyRegistry::new();
        let registry = Arc::new(registry);
        registry.mark_unavailable("CommandOrControl+1");
        let shortcuts = GlobalShortcuts::new(registry.clone());

        let registered = shortcuts.replace(&KeybindSet::defaults("Ctrl")).await;
        assert_eq!(registered, 21 - 1);
        assert!(registry
            .registered()
            .iter()
            .any(|h| h.spec == "CommandOrControl+Shift+1"));

        let mut fewer = KeybindSet::defaults("Ctrl");
        fewer.timer_slots.truncate(1);
        fewer.timer_slots[0].reset = Some(Keybind::new("x", &[Modifier::Alt], "Ctrl"));
        shortcuts.replace(&fewer).await;
        let specs: Vec<String> = registry.registered().into_iter().map(|h| h.spec).collect();
        assert_eq!(
            specs,
            [
                "Alt+X",
                "CommandOrControl+R",
                "CommandOrControl+Shift+L",
                "CommandOrControl+Space"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_window() {
        let debounce = LockDebounce::new();
        assert!(debounce.accept());
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!debounce.accept());
        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(debounce.accept());
    }
}
