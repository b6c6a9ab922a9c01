//! Persisted snapshot format and lenient restore

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    overlay_state::{OverlayState, DEFAULT_OPACITY},
    timer_state::{Clock, Timer, TimerId},
};
use crate::keybind::KeybindSet;

/// One timer as stored on disk and reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub id: TimerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
    #[serde(default)]
    pub initial_minutes: u32,
    #[serde(default)]
    pub initial_seconds: u32,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub has_finished: bool,
}

impl From<&Timer> for TimerRecord {
    fn from(timer: &Timer) -> Self {
        Self {
            id: timer.id,
            name: timer.name.clone(),
            minutes: timer.remaining.minutes,
            seconds: timer.remaining.seconds,
            initial_minutes: timer.initial.minutes,
            initial_seconds: timer.initial.seconds,
            is_running: timer.is_running,
            has_finished: timer.has_finished,
        }
    }
}

impl TimerRecord {
    /// Rebuild an idle timer, clamping out-of-range fields
    fn into_timer(self) -> Timer {
        Timer::restored(
            self.id,
            &self.name,
            Clock::clamped(self.minutes, self.seconds),
            Clock::clamped(self.initial_minutes, self.initial_seconds),
        )
    }
}

/// Everything that survives a restart. Toolbar and lock state are not saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timers: Vec<TimerRecord>,
    pub selected_timer_id: TimerId,
    pub keybinds: KeybindSet,
    pub opacity: f64,
    pub muted: bool,
}

impl Snapshot {
    pub fn capture(state: &OverlayState) -> Self {
        Self {
            timers: state.timers().iter().map(TimerRecord::from).collect(),
            selected_timer_id: state.selected_id(),
            keybinds: state.keybinds.clone(),
            opacity: state.opacity(),
            muted: state.muted,
        }
    }
}

/// Outcome of restoring a snapshot
#[derive(Debug)]
pub struct Restored {
    pub state: OverlayState,
    /// Legacy keybinds were rewritten; the caller should save
    pub migrated: bool,
}

/// Rebuild the overlay model from a possibly partial or corrupt snapshot.
///
/// Each field falls back to its default independently. Restored timers are
/// idle: countdowns do not resume across restarts.
pub fn restore(saved: Option<&Value>, default_keybinds: &KeybindSet) -> Restored {
    let Some(saved) = saved else {
        debug!("No saved snapshot, starting with defaults");
        let mut state = OverlayState::new();
        state.keybinds = default_keybinds.clone();
        return Restored {
            state,
            migrated: false,
        };
    };

    let timers = saved
        .get("timers")
        .and_then(Value::as_array)
        .map(|items| restore_timers(items))
        .unwrap_or_default();

    let selected = saved
        .get("selectedTimerId")
        .and_then(|v| serde_json::from_value::<TimerId>(v.clone()).ok());

    let (keybinds, migrated) = match saved
        .get("keybinds")
        .map(|v| serde_json::from_value::<KeybindSet>(v.clone()))
    {
        Some(Ok(mut keybinds)) => {
            let migrated = keybinds.migrate_legacy(default_keybinds);
            (keybinds, migrated)
        }
        Some(Err(e)) => {
            warn!("Saved keybinds unreadable, using defaults: {}", e);
            (default_keybinds.clone(), false)
        }
        None => (default_keybinds.clone(), false),
    };

    let opacity = saved
        .get("opacity")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_OPACITY);
    let muted = saved.get("muted").and_then(Value::as_bool).unwrap_or(false);

    Restored {
        state: OverlayState::from_parts(timers, selected, keybinds, opacity, muted),
        migrated,
    }
}

fn restore_timers(items: &[Value]) -> Vec<Timer> {
    let mut seen = HashSet::new();
    let mut timers = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<TimerRecord>(item.clone()) {
            Ok(record) if seen.insert(record.id) => timers.push(record.into_timer()),
            Ok(record) => warn!("Skipping duplicate saved timer {}", record.id),
            Err(e) => warn!("Skipping unreadable saved timer: {}", e),
        }
    }
    timers
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::keybind::{Keybind, Modifier};

    fn defaults() -> KeybindSet {
        KeybindSet::defaults("Ctrl")
    }

    #[test]
    fn absent_snapshot_gives_defaults() {
        let restored = restore(None, &defaults());
        assert_eq!(restored.state.timer_count(), 1);
        assert_eq!(restored.state.timers()[0].name, "Timer 1");
        assert_eq!(restored.state.opacity(), DEFAULT_OPACITY);
        assert!(!restored.state.muted);
    }

    #[test]
    fn maximal_saved_id_does_not_overflow() {
        let saved = json!({"timers": [{"id": u64::MAX, "name": "Timer 1"}]});
        let mut state = restore(Some(&saved), &defaults()).state;
        assert_eq!(state.timers()[0].id, TimerId(u64::MAX));
        assert_eq!(state.add_timer(), TimerId(1));
        assert_eq!(state.add_timer(), TimerId(2));
        assert_eq!(state.timers()[2].name, "Timer 3");
    }

    #[test]
    fn round_trip_keeps_timers_idle() {
        let mut state = OverlayState::new();
        let id = state.add_timer();
        state.set_time(id, 2, 30).unwrap();
        state.toggle(id).unwrap();
        state.set_opacity(0.5);
        let value = serde_json::to_value(Snapshot::capture(&state)).unwrap();
        assert_eq!(value["timers"][1]["isRunning"], json!(true));

        let restored = restore(Some(&value), &defaults()).state;
        assert_eq!(restored.timer_count(), 2);
        assert_eq!(restored.selected_id(), id);
        let timer = restored.timer(id).unwrap();
        assert!(!timer.is_running);
        assert_eq!(timer.remaining, Clock::new(2, 30).unwrap());
        assert_eq!(restored.opacity(), 0.5);
    }

    #[test]
    fn corrupt_fields_fall_back_individually() {
        let value = json!({
            "timers": "not a list",
            "selectedTimerId": "nope",
            "keybinds": {"timerSlots": 3},
            "opacity": "high",
            "muted": true
        });
        let restored = restore(Some(&value), &defaults()).state;
        assert_eq!(restored.timer_count(), 1);
        assert_eq!(restored.keybinds, defaults());
        assert_eq!(restored.opacity(), DEFAULT_OPACITY);
        assert!(restored.muted);
    }

    #[test]
    fn bad_timer_entries_are_skipped_and_clamped() {
        let value = json!({
            "timers": [
                {"id": 5, "name": "Tea", "minutes": 120, "seconds": 75,
                 "initialMinutes": 3, "initialSeconds": 0, "isRunning": true, "hasFinished": true},
                {"name": "no id"},
                {"id": 5, "name": "dup"}
            ],
            "selectedTimerId": 99
        });
        let restored = restore(Some(&value), &defaults()).state;
        assert_eq!(restored.timer_count(), 1);
        let timer = &restored.timers()[0];
        assert_eq!(timer.remaining, Clock::new(99, 59).unwrap());
        assert!(!timer.has_finished);
        assert_eq!(restored.selected_id(), TimerId(5));
    }

    #[test]
    fn legacy_keybinds_are_migrated() {
        let mut old = defaults();
        old.timer_slots[2].toggle = Some(Keybind::new("F3", &[], "Ctrl"));
        let value = json!({ "keybinds": serde_json::to_value(&old).unwrap() });
        let restored = restore(Some(&value), &defaults());
        assert!(restored.migrated);
        assert_eq!(
            restored.state.keybinds.timer_slots[2].toggle,
            Some(Keybind::new("3", &[Modifier::Ctrl], "Ctrl"))
        );
    }
}
