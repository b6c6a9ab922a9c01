//! Matching raw key events against keybinds

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Keybind, Modifier};

/// Key names the input layer reports for a bare modifier press.
const MODIFIER_KEYS: [&str; 5] = ["Control", "Shift", "Alt", "Meta", "AltGraph"];

/// A raw key-down event as delivered by the input layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    /// Create an event for `key` with no modifiers held
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Normalized modifier set: ctrl and meta collapse into a single `Ctrl`
    pub fn modifiers(&self) -> BTreeSet<Modifier> {
        let mut mods = BTreeSet::new();
        if self.ctrl || self.meta {
            mods.insert(Modifier::Ctrl);
        }
        if self.shift {
            mods.insert(Modifier::Shift);
        }
        if self.alt {
            mods.insert(Modifier::Alt);
        }
        mods
    }

    /// True when the key itself is a modifier (nothing to bind yet)
    pub fn is_modifier_key(&self) -> bool {
        MODIFIER_KEYS.contains(&self.key.as_str())
    }
}

/// Check whether `event` triggers `keybind`.
///
/// The key must be equal as delivered (case-sensitive) and the normalized
/// modifier set must equal the binding's set exactly. An absent binding never
/// matches.
pub fn matches(event: &KeyEvent, keybind: Option<&Keybind>) -> bool {
    let Some(keybind) = keybind else {
        return false;
    };
    event.key == keybind.key && event.modifiers() == keybind.modifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(key: &str, mods: &[Modifier]) -> Keybind {
        Keybind::new(key, mods, "Ctrl")
    }

    #[test]
    fn exact_modifier_set_required() {
        let kb = bind("1", &[Modifier::Ctrl]);
        assert!(matches(&KeyEvent::new("1").with_ctrl(), Some(&kb)));
        // superset
        assert!(!matches(&KeyEvent::new("1").with_ctrl().with_shift(), Some(&kb)));
        // subset
        assert!(!matches(&KeyEvent::new("1"), Some(&kb)));
    }

    #[test]
    fn meta_counts_as_ctrl() {
        let kb = bind("r", &[Modifier::Ctrl]);
        assert!(matches(&KeyEvent::new("r").with_meta(), Some(&kb)));
        assert!(matches(&KeyEvent::new("r").with_meta().with_ctrl(), Some(&kb)));
    }

    #[test]
    fn key_is_case_sensitive() {
        let kb = bind("r", &[Modifier::Ctrl]);
        assert!(!matches(&KeyEvent::new("R").with_ctrl(), Some(&kb)));
    }

    #[test]
    fn absent_binding_never_matches() {
        assert!(!matches(&KeyEvent::new("1"), None));
        assert!(!matches(&KeyEvent::default(), None));
    }

    #[test]
    fn every_modifier_combination_is_exact() {
        let all = [Modifier::Ctrl, Modifier::Shift, Modifier::Alt];
        for bind_mask in 0u8..8 {
            let mods: Vec<Modifier> = (0..3)
                .filter(|i| bind_mask & (1 << i) != 0)
                .map(|i| all[i])
                .collect();
            let kb = bind("k", &mods);
            for event_mask in 0u8..8 {
                let mut ev = KeyEvent::new("k");
                ev.ctrl = event_mask & 1 != 0;
                ev.shift = event_mask & 2 != 0;
                ev.alt = event_mask & 4 != 0;
                assert_eq!(
                    matches(&ev, Some(&kb)),
                    bind_mask == event_mask,
                    "bind {bind_mask:03b} event {event_mask:03b}"
                );
            }
        }
    }

    #[test]
    fn modifier_only_keys_detected() {
        assert!(KeyEvent::new("Shift").is_modifier_key());
        assert!(KeyEvent::new("AltGraph").is_modifier_key());
        assert!(!KeyEvent::new("s").is_modifier_key());
    }
}
