//! Keybind model
//!
//! A keybind is a key plus an exact modifier set and a display label. A
//! [`KeybindSet`] holds one toggle/reset pair for the selected timer and up to
//! nine positional slot pairs.

pub mod matcher;
pub mod shortcut;

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

pub use matcher::{matches, KeyEvent};
pub use shortcut::{shortcut_spec, LOCK_SHORTCUT};

/// Slots beyond this position never get a binding.
pub const MAX_SLOTS: usize = 9;

/// Keyboard modifier. Declaration order is the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    #[serde(alias = "control", alias = "meta", alias = "cmd", alias = "command", alias = "super")]
    Ctrl,
    Shift,
    Alt,
}

/// Primary-modifier symbol used in labels on this platform.
pub fn primary_symbol() -> &'static str {
    if cfg!(target_os = "macos") {
        "⌘"
    } else {
        "Ctrl"
    }
}

/// Human-readable label for a key combination.
pub fn format_label(key: &str, modifiers: &BTreeSet<Modifier>, symbol: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for modifier in modifiers {
        parts.push(
            match modifier {
                Modifier::Ctrl => symbol,
                Modifier::Shift => "Shift",
                Modifier::Alt => "Alt",
            }
            .to_string(),
        );
    }
    let key_name = match key {
        " " => "Space".to_string(),
        "Escape" => "Esc".to_string(),
        "ArrowUp" => "↑".to_string(),
        "ArrowDown" => "↓".to_string(),
        "ArrowLeft" => "←".to_string(),
        "ArrowRight" => "→".to_string(),
        k if k.chars().count() == 1 => k.to_uppercase(),
        k => k.to_string(),
    };
    parts.push(key_name);
    parts.join("+")
}

/// A key plus an exact modifier set.
///
/// Equality ignores the label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keybind {
    pub key: String,
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    #[serde(default)]
    pub label: String,
}

impl PartialEq for Keybind {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.modifiers == other.modifiers
    }
}

impl Eq for Keybind {}

impl Keybind {
    pub fn new(key: impl Into<String>, modifiers: &[Modifier], symbol: &str) -> Self {
        let key = key.into();
        let modifiers: BTreeSet<Modifier> = modifiers.iter().copied().collect();
        let label = format_label(&key, &modifiers, symbol);
        Self {
            key,
            modifiers,
            label,
        }
    }

    /// Global registration requires at least one modifier.
    pub fn has_modifiers(&self) -> bool {
        !self.modifiers.is_empty()
    }

    /// Whether two bindings cannot coexist.
    ///
    /// Bindings with modifiers are also registered as OS hotkeys, whose key
    /// token ignores case, so they collide when their hotkey specs match.
    pub fn collides_with(&self, other: &Keybind) -> bool {
        self == other
            || (self.has_modifiers()
                && other.has_modifiers()
                && shortcut_spec(self) == shortcut_spec(other))
    }
}

/// Toggle/reset bindings for one timer position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKeybinds {
    pub slot_number: usize,
    #[serde(default)]
    pub toggle: Option<Keybind>,
    #[serde(default)]
    pub reset: Option<Keybind>,
}

/// Toggle/reset bindings for the selected timer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedKeybinds {
    #[serde(default)]
    pub toggle: Option<Keybind>,
    #[serde(default)]
    pub reset: Option<Keybind>,
}

/// Which binding in a set an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "slot", rename_all = "camelCase")]
pub enum BindingTarget {
    SlotToggle(usize),
    SlotReset(usize),
    SelectedToggle,
    SelectedReset,
}

/// Logical timer action a binding resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "slot", rename_all = "kebab-case")]
pub enum TimerAction {
    /// Toggle the timer at a 0-based position
    Toggle(usize),
    /// Reset the timer at a 0-based position
    Reset(usize),
    ToggleSelected,
    ResetSelected,
}

impl From<BindingTarget> for TimerAction {
    fn from(target: BindingTarget) -> Self {
        match target {
            BindingTarget::SlotToggle(i) => Self::Toggle(i),
            BindingTarget::SlotReset(i) => Self::Reset(i),
            BindingTarget::SelectedToggle => Self::ToggleSelected,
            BindingTarget::SelectedReset => Self::ResetSelected,
        }
    }
}

fn capped_slots<'de, D>(deserializer: D) -> std::result::Result<Vec<SlotKeybinds>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut slots = Vec::<SlotKeybinds>::deserialize(deserializer)?;
    slots.truncate(MAX_SLOTS);
    Ok(slots)
}

/// Full set of user keybinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeybindSet {
    #[serde(deserialize_with = "capped_slots")]
    pub timer_slots: Vec<SlotKeybinds>,
    pub selected_timer: SelectedKeybinds,
}

impl Default for KeybindSet {
    fn default() -> Self {
        Self::defaults(primary_symbol())
    }
}

impl KeybindSet {
    /// Default bindings: slot N toggles with primary+N and resets with
    /// primary+Shift+N; the selected timer uses primary+Space and primary+R.
    pub fn defaults(symbol: &str) -> Self {
        let timer_slots = (1..=MAX_SLOTS)
            .map(|n| SlotKeybinds {
                slot_number: n,
                toggle: Some(Keybind::new(n.to_string(), &[Modifier::Ctrl], symbol)),
                reset: Some(Keybind::new(
                    n.to_string(),
                    &[Modifier::Ctrl, Modifier::Shift],
                    symbol,
                )),
            })
            .collect();
        Self {
            timer_slots,
            selected_timer: SelectedKeybinds {
                toggle: Some(Keybind::new(" ", &[Modifier::Ctrl], symbol)),
                reset: Some(Keybind::new("r", &[Modifier::Ctrl], symbol)),
            },
        }
    }

    /// Look up the binding for `target`.
    pub fn get(&self, target: BindingTarget) -> Option<&Keybind> {
        match target {
            BindingTarget::SlotToggle(i) => self.timer_slots.get(i)?.toggle.as_ref(),
            BindingTarget::SlotReset(i) => self.timer_slots.get(i)?.reset.as_ref(),
            BindingTarget::SelectedToggle => self.selected_timer.toggle.as_ref(),
            BindingTarget::SelectedReset => self.selected_timer.reset.as_ref(),
        }
    }

    fn slot_entry(&mut self, target: BindingTarget) -> Option<&mut Option<Keybind>> {
        match target {
            BindingTarget::SlotToggle(i) => self.timer_slots.get_mut(i).map(|s| &mut s.toggle),
            BindingTarget::SlotReset(i) => self.timer_slots.get_mut(i).map(|s| &mut s.reset),
            BindingTarget::SelectedToggle => Some(&mut self.selected_timer.toggle),
            BindingTarget::SelectedReset => Some(&mut self.selected_timer.reset),
        }
    }

    /// All bound targets in dispatch order: slots by position, then selected.
    pub fn bindings(&self) -> Vec<(BindingTarget, &Keybind)> {
        let mut out = Vec::new();
        for (i, slot) in self.timer_slots.iter().enumerate() {
            if let Some(kb) = &slot.toggle {
                out.push((BindingTarget::SlotToggle(i), kb));
            }
            if let Some(kb) = &slot.reset {
                out.push((BindingTarget::SlotReset(i), kb));
            }
        }
        if let Some(kb) = &self.selected_timer.toggle {
            out.push((BindingTarget::SelectedToggle, kb));
        }
        if let Some(kb) = &self.selected_timer.reset {
            out.push((BindingTarget::SelectedReset, kb));
        }
        out
    }

    /// Another target already bound to a combination colliding with `candidate`.
    pub fn conflict(&self, target: BindingTarget, candidate: &Keybind) -> Option<BindingTarget> {
        self.bindings()
            .into_iter()
            .find(|(other, kb)| *other != target && kb.collides_with(candidate))
            .map(|(other, _)| other)
    }

    /// First binding whose combination is also used by another target.
    pub fn duplicate(&self) -> Option<&Keybind> {
        self.bindings()
            .into_iter()
            .find(|(target, kb)| self.conflict(*target, kb).is_some())
            .map(|(_, kb)| kb)
    }

    /// Bind `candidate` to `target`, rejecting combinations already in use.
    pub fn assign(&mut self, target: BindingTarget, candidate: Keybind) -> Result<()> {
        if self.conflict(target, &candidate).is_some() {
            return Err(Error::DuplicateKeybind(candidate.label));
        }
        match self.slot_entry(target) {
            Some(entry) => {
                *entry = Some(candidate);
                Ok(())
            }
            None => Err(Error::UnknownBinding(format!("{target:?}"))),
        }
    }

    /// Unbind `target`.
    pub fn clear(&mut self, target: BindingTarget) {
        if let Some(entry) = self.slot_entry(target) {
            *entry = None;
        }
    }

    /// Resolve an in-window key event to an action.
    ///
    /// Slots are tested in position order up to `min(timer_count, 9)`, toggle
    /// before reset; the selected-timer pair is tested only when no slot matched.
    pub fn resolve(&self, event: &KeyEvent, timer_count: usize) -> Option<TimerAction> {
        let live_slots = timer_count.min(MAX_SLOTS);
        for (i, slot) in self.timer_slots.iter().take(live_slots).enumerate() {
            if matches(event, slot.toggle.as_ref()) {
                return Some(TimerAction::Toggle(i));
            }
            if matches(event, slot.reset.as_ref()) {
                return Some(TimerAction::Reset(i));
            }
        }
        if matches(event, self.selected_timer.toggle.as_ref()) {
            return Some(TimerAction::ToggleSelected);
        }
        if matches(event, self.selected_timer.reset.as_ref()) {
            return Some(TimerAction::ResetSelected);
        }
        None
    }

    /// Bindings eligible for OS-global registration (those with a modifier).
    pub fn global_bindings(&self) -> Vec<(TimerAction, &Keybind)> {
        self.bindings()
            .into_iter()
            .filter(|(_, kb)| kb.has_modifiers())
            .map(|(target, kb)| (TimerAction::from(target), kb))
            .collect()
    }

    /// Replace retired bindings with current defaults.
    ///
    /// Slot bindings on F1-F9 and a modifier-less selected reset are swapped for
    /// the matching default. Returns true if anything changed.
    pub fn migrate_legacy(&mut self, defaults: &KeybindSet) -> bool {
        let mut changed = false;
        for (slot, default_slot) in self.timer_slots.iter_mut().zip(&defaults.timer_slots) {
            if slot.toggle.as_ref().is_some_and(is_legacy_function_key) {
                slot.toggle = default_slot.toggle.clone();
                changed = true;
            }
            if slot.reset.as_ref().is_some_and(is_legacy_function_key) {
                slot.reset = default_slot.reset.clone();
                changed = true;
            }
        }
        if self
            .selected_timer
            .reset
            .as_ref()
            .is_some_and(|kb| !kb.has_modifiers())
        {
            self.selected_timer.reset = defaults.selected_timer.reset.clone();
            changed = true;
        }
        changed
    }
}

fn is_legacy_function_key(kb: &Keybind) -> bool {
    let key = kb.key.to_ascii_lowercase();
    key.len() == 2 && key.starts_with('f') && key.as_bytes()[1].is_ascii_digit()
}

/// Result of feeding a key event to a capture control.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// Escape pressed; keep the previous binding.
    Cancelled,
    /// Only a modifier was pressed; keep listening.
    Pending,
    Bound(Keybind),
}

/// Turn a key event into a candidate binding.
pub fn capture_event(event: &KeyEvent, symbol: &str) -> Capture {
    if event.key == "Escape" {
        return Capture::Cancelled;
    }
    if event.is_modifier_key() {
        return Capture::Pending;
    }
    let modifiers = event.modifiers();
    let label = format_label(&event.key, &modifiers, symbol);
    Capture::Bound(Keybind {
        key: event.key.clone(),
        modifiers,
        label,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_nine_slots() {
        let set = KeybindSet::defaults("Ctrl");
        assert_eq!(set.timer_slots.len(), 9);
        assert_eq!(set.timer_slots[0].toggle.as_ref().map(|k| k.label.as_str()), Some("Ctrl+1"));
        assert_eq!(
            set.timer_slots[8].reset.as_ref().map(|k| k.label.as_str()),
            Some("Ctrl+Shift+9")
        );
        assert_eq!(
            set.selected_timer.toggle.as_ref().map(|k| k.label.as_str()),
            Some("Ctrl+Space")
        );
    }

    #[test]
    fn mac_labels_use_command_symbol() {
        let set = KeybindSet::defaults("⌘");
        assert_eq!(
            set.selected_timer.reset.as_ref().map(|k| k.label.as_str()),
            Some("⌘+R")
        );
    }

    #[test]
    fn equality_ignores_label_and_modifier_order() {
        let a = Keybind::new("x", &[Modifier::Shift, Modifier::Ctrl], "Ctrl");
        let mut b = Keybind::new("x", &[Modifier::Ctrl, Modifier::Shift], "⌘");
        assert_eq!(a, b);
        b.label = "whatever".into();
        assert_eq!(a, b);
    }

    #[test]
    fn deserialize_aliases_and_dedups_modifiers() {
        let kb: Keybind =
            serde_json::from_str(r#"{"key":"a","modifiers":["control","ctrl","shift"],"label":"x"}"#)
                .unwrap();
        assert_eq!(kb.modifiers.len(), 2);
        assert!(kb.modifiers.contains(&Modifier::Ctrl));
    }

    #[test]
    fn slot_list_is_capped() {
        let mut set = KeybindSet::defaults("Ctrl");
        let extra = set.timer_slots[0].clone();
        set.timer_slots.push(SlotKeybinds {
            slot_number: 10,
            ..extra
        });
        let json = serde_json::to_string(&set).unwrap();
        let back: KeybindSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timer_slots.len(), MAX_SLOTS);
    }

    #[test]
    fn assign_rejects_duplicates() {
        let mut set = KeybindSet::defaults("Ctrl");
        let before = set.clone();
        let dup = Keybind::new("2", &[Modifier::Ctrl], "Ctrl");
        let err = set.assign(BindingTarget::SlotToggle(0), dup).unwrap_err();
        assert!(matches!(err, Error::DuplicateKeybind(_)));
        assert_eq!(set, before);
    }

    #[test]
    fn assign_rejects_case_variant_of_global_binding() {
        let mut set = KeybindSet::defaults("Ctrl");
        let upper = Keybind::new("R", &[Modifier::Ctrl], "Ctrl");
        let err = set.assign(BindingTarget::SlotToggle(0), upper).unwrap_err();
        assert!(matches!(err, Error::DuplicateKeybind(_)));

        // In-window only: matching stays case-sensitive
        set.assign(BindingTarget::SlotToggle(0), Keybind::new("x", &[], "Ctrl"))
            .unwrap();
        set.assign(BindingTarget::SlotReset(0), Keybind::new("X", &[], "Ctrl"))
            .unwrap();
    }

    #[test]
    fn duplicate_finds_shared_combination() {
        let mut set = KeybindSet::defaults("Ctrl");
        assert!(set.duplicate().is_none());
        set.selected_timer.reset = Some(Keybind::new("1", &[Modifier::Ctrl], "Ctrl"));
        assert_eq!(set.duplicate().map(|kb| kb.label.as_str()), Some("Ctrl+1"));
    }

    #[test]
    fn assign_same_combo_to_own_target_is_allowed() {
        let mut set = KeybindSet::defaults("Ctrl");
        let same = Keybind::new("1", &[Modifier::Ctrl], "Ctrl");
        set.assign(BindingTarget::SlotToggle(0), same).unwrap();
    }

    #[test]
    fn assign_and_clear() {
        let mut set = KeybindSet::defaults("Ctrl");
        let kb = Keybind::new("q", &[Modifier::Alt], "Ctrl");
        set.assign(BindingTarget::SelectedToggle, kb.clone()).unwrap();
        assert_eq!(set.get(BindingTarget::SelectedToggle), Some(&kb));
        set.clear(BindingTarget::SelectedToggle);
        assert_eq!(set.get(BindingTarget::SelectedToggle), None);
    }

    #[test]
    fn resolve_prefers_slots_and_respects_timer_count() {
        let mut set = KeybindSet::defaults("Ctrl");
        // Put the selected toggle on the same combo as slot 2 toggle.
        set.selected_timer.toggle = Some(Keybind::new("2", &[Modifier::Ctrl], "Ctrl"));
        let ev = KeyEvent::new("2").with_ctrl();
        assert_eq!(set.resolve(&ev, 3), Some(TimerAction::Toggle(1)));
        // Only one timer: slot 2 is not live, selected binding takes it.
        assert_eq!(set.resolve(&ev, 1), Some(TimerAction::ToggleSelected));
    }

    #[test]
    fn resolve_lowest_slot_wins() {
        let mut set = KeybindSet::defaults("Ctrl");
        set.timer_slots[4].toggle = Some(Keybind::new("1", &[Modifier::Ctrl], "Ctrl"));
        let ev = KeyEvent::new("1").with_ctrl();
        assert_eq!(set.resolve(&ev, 9), Some(TimerAction::Toggle(0)));
    }

    #[test]
    fn resolve_never_uses_slots_past_nine() {
        let set = KeybindSet::defaults("Ctrl");
        let ev = KeyEvent::new("9").with_ctrl().with_shift();
        assert_eq!(set.resolve(&ev, 20), Some(TimerAction::Reset(8)));
        assert_eq!(set.resolve(&KeyEvent::new("x"), 20), None);
    }

    #[test]
    fn global_bindings_skip_modifierless() {
        let mut set = KeybindSet::defaults("Ctrl");
        set.selected_timer.reset = Some(Keybind::new("r", &[], "Ctrl"));
        let globals = set.global_bindings();
        assert_eq!(globals.len(), 19);
        assert!(!globals
            .iter()
            .any(|(action, _)| *action == TimerAction::ResetSelected));
    }

    #[test]
    fn migrate_function_keys_and_bare_reset() {
        let defaults = KeybindSet::defaults("Ctrl");
        let mut set = defaults.clone();
        set.timer_slots[0].toggle = Some(Keybind::new("F1", &[], "Ctrl"));
        set.timer_slots[3].reset = Some(Keybind::new("f4", &[Modifier::Shift], "Ctrl"));
        set.selected_timer.reset = Some(Keybind::new("r", &[], "Ctrl"));
        assert!(set.migrate_legacy(&defaults));
        assert_eq!(set, defaults);
        assert!(!set.migrate_legacy(&defaults));
    }

    #[test]
    fn capture_builds_labelled_binding() {
        let ev = KeyEvent::new("ArrowUp").with_meta().with_alt();
        match capture_event(&ev, "⌘") {
            Capture::Bound(kb) => {
                assert_eq!(kb.label, "⌘+Alt+↑");
                assert_eq!(kb.modifiers.len(), 2);
            }
            other => panic!("unexpected capture {other:?}"),
        }
        assert_eq!(capture_event(&KeyEvent::new("Escape"), "Ctrl"), Capture::Cancelled);
        assert_eq!(
            capture_event(&KeyEvent::new("Control").with_ctrl(), "Ctrl"),
            Capture::Pending
        );
    }
}
