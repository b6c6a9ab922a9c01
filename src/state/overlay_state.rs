//! Overlay model: the ordered timer collection plus window-level flags

use serde::Serialize;
use tracing::debug;

use super::timer_state::{Clock, Direction, Tick, TimeUnit, Timer, TimerId, Toggle};
use crate::{
    error::{Error, Result},
    geometry::{Layout, DEFAULT_TOOLBAR_WIDTH},
    keybind::{KeybindSet, TimerAction},
};

pub const DEFAULT_OPACITY: f64 = 0.85;
pub const MIN_OPACITY: f64 = 0.3;
pub const MAX_OPACITY: f64 = 1.0;

/// Number of distinct completion sounds; positions wrap around.
pub const SOUND_PALETTE_LEN: usize = 6;

/// What a tick did, with enough context for side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Counting(Clock),
    Finished {
        position: usize,
        finish_seq: u64,
        /// Palette index to play; `None` when muted
        sound: Option<usize>,
    },
}

/// What a resolved timer action did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// No timer at that position
    Ignored,
    /// Depleted timer; event swallowed without selecting
    Refused,
    Toggled { id: TimerId, toggle: Toggle },
    Reset { id: TimerId },
}

impl ActionOutcome {
    /// Whether the timer collection changed
    pub fn changed(&self) -> bool {
        matches!(self, Self::Toggled { .. } | Self::Reset { .. })
    }
}

/// Flags that change on lock/pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub pinned: bool,
    pub toolbar_collapsed: bool,
}

/// The whole overlay model. At least one timer always exists and the
/// selection always points at one of them.
#[derive(Debug, Clone)]
pub struct OverlayState {
    timers: Vec<Timer>,
    selected: TimerId,
    next_id: u64,
    pub toolbar_collapsed: bool,
    pub pinned: bool,
    opacity: f64,
    pub muted: bool,
    pub keybinds: KeybindSet,
    /// Measured toolbar width in physical pixels
    pub toolbar_width: u32,
    /// Settings surface open; in-window keybinds are suspended
    pub settings_open: bool,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayState {
    /// One idle "Timer 1", default keybinds and settings
    pub fn new() -> Self {
        let first = Timer::new(TimerId(1), "Timer 1");
        Self::from_parts(vec![first], None, KeybindSet::default(), DEFAULT_OPACITY, false)
    }

    /// Assemble a model from restored parts, repairing invariants.
    ///
    /// An empty timer list gets a default timer and a dangling selection falls
    /// back to the first timer.
    pub fn from_parts(
        mut timers: Vec<Timer>,
        selected: Option<TimerId>,
        keybinds: KeybindSet,
        opacity: f64,
        muted: bool,
    ) -> Self {
        if timers.is_empty() {
            timers.push(Timer::new(TimerId(1), "Timer 1"));
        }
        let next_id = timers
            .iter()
            .map(|t| t.id.0)
            .max()
            .map_or(1, next_candidate);
        let selected = selected
            .filter(|id| timers.iter().any(|t| t.id == *id))
            .unwrap_or(timers[0].id);
        Self {
            timers,
            selected,
            next_id,
            toolbar_collapsed: false,
            pinned: false,
            opacity: clamp_opacity(opacity),
            muted,
            keybinds,
            toolbar_width: DEFAULT_TOOLBAR_WIDTH,
            settings_open: false,
        }
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn timer(&self, id: TimerId) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }

    fn timer_mut(&mut self, id: TimerId) -> Result<&mut Timer> {
        self.timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::UnknownTimer(id))
    }

    pub fn position(&self, id: TimerId) -> Option<usize> {
        self.timers.iter().position(|t| t.id == id)
    }

    pub fn selected_id(&self) -> TimerId {
        self.selected
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = clamp_opacity(opacity);
    }

    /// Running timers with the epoch their tick source must carry
    pub fn running(&self) -> Vec<(TimerId, u64)> {
        self.timers
            .iter()
            .filter(|t| t.is_running)
            .map(|t| (t.id, t.run_epoch()))
            .collect()
    }

    /// Geometry inputs for the current model
    pub fn layout(&self, scale_factor: f64) -> Layout {
        Layout {
            timer_count: self.timers.len(),
            toolbar_collapsed: self.toolbar_collapsed,
            toolbar_width: self.toolbar_width,
            scale_factor,
        }
    }

    /// Append a timer named with the lowest free "Timer N" and select it
    pub fn add_timer(&mut self) -> TimerId {
        let number = next_timer_number(&self.timers);
        let id = self.allocate_id();
        self.timers.push(Timer::new(id, format!("Timer {number}")));
        self.selected = id;
        debug!("Added timer {} as Timer {}", id, number);
        id
    }

    /// Next id not held by a live timer. Wraps past `u64::MAX`.
    fn allocate_id(&mut self) -> TimerId {
        let mut candidate = self.next_id;
        while self.timers.iter().any(|t| t.id.0 == candidate) {
            candidate = next_candidate(candidate);
        }
        self.next_id = next_candidate(candidate);
        TimerId(candidate)
    }

    /// Remove a timer; the last one cannot be removed
    pub fn remove_timer(&mut self, id: TimerId) -> Result<()> {
        let position = self.position(id).ok_or(Error::UnknownTimer(id))?;
        if self.timers.len() <= 1 {
            return Err(Error::LastTimer);
        }
        self.timers.remove(position);
        if self.selected == id {
            self.selected = self.timers[0].id;
        }
        Ok(())
    }

    pub fn select(&mut self, id: TimerId) -> Result<()> {
        self.timer_mut(id)?;
        self.selected = id;
        Ok(())
    }

    pub fn toggle(&mut self, id: TimerId) -> Result<Toggle> {
        Ok(self.timer_mut(id)?.toggle())
    }

    pub fn reset(&mut self, id: TimerId) -> Result<()> {
        self.timer_mut(id)?.reset();
        Ok(())
    }

    pub fn adjust(&mut self, id: TimerId, unit: TimeUnit, direction: Direction) -> Result<bool> {
        self.timer_mut(id)?.adjust(unit, direction)
    }

    pub fn set_time(&mut self, id: TimerId, minutes: u32, seconds: u32) -> Result<()> {
        let clock = Clock::new(minutes, seconds)?;
        self.timer_mut(id)?.set_time(clock)
    }

    pub fn rename(&mut self, id: TimerId, name: &str) -> Result<()> {
        self.timer_mut(id)?.rename(name);
        Ok(())
    }

    /// Advance a timer by one second. `None` for unknown timers and stale ticks.
    pub fn tick(&mut self, id: TimerId, epoch: u64) -> Option<TickOutcome> {
        let position = self.position(id)?;
        let muted = self.muted;
        match self.timers[position].tick(epoch) {
            Tick::Stale => None,
            Tick::Counting(clock) => Some(TickOutcome::Counting(clock)),
            Tick::Finished { finish_seq } => Some(TickOutcome::Finished {
                position,
                finish_seq,
                sound: (!muted).then_some(position % SOUND_PALETTE_LEN),
            }),
        }
    }

    /// Clear a completion flag once its display window is over
    pub fn clear_finished(&mut self, id: TimerId, finish_seq: u64) -> bool {
        self.timer_mut(id)
            .map(|t| t.clear_finished(finish_seq))
            .unwrap_or(false)
    }

    /// Apply a resolved keybind or hotkey action.
    ///
    /// Slot actions select their timer; selected-timer actions leave the
    /// selection alone. A toggle on a depleted timer changes nothing.
    pub fn apply_action(&mut self, action: TimerAction) -> ActionOutcome {
        let (id, select) = match action {
            TimerAction::Toggle(i) | TimerAction::Reset(i) => match self.timers.get(i) {
                Some(t) => (t.id, true),
                None => return ActionOutcome::Ignored,
            },
            TimerAction::ToggleSelected | TimerAction::ResetSelected => (self.selected, false),
        };
        let Ok(timer) = self.timer_mut(id) else {
            return ActionOutcome::Ignored;
        };
        match action {
            TimerAction::Toggle(_) | TimerAction::ToggleSelected => {
                if timer.is_depleted() {
                    return ActionOutcome::Refused;
                }
                let toggle = timer.toggle();
                if select {
                    self.selected = id;
                }
                ActionOutcome::Toggled { id, toggle }
            }
            TimerAction::Reset(_) | TimerAction::ResetSelected => {
                timer.reset();
                if select {
                    self.selected = id;
                }
                ActionOutcome::Reset { id }
            }
        }
    }

    /// Global lock hotkey: flip pinned and collapse the toolbar to match
    pub fn toggle_lock(&mut self) -> LockState {
        self.pinned = !self.pinned;
        self.toolbar_collapsed = self.pinned;
        self.lock_state()
    }

    /// Toolbar pin button: flip pinned only
    pub fn toggle_pin(&mut self) -> LockState {
        self.pinned = !self.pinned;
        self.lock_state()
    }

    /// Manual collapse/expand; refused while pinned
    pub fn set_toolbar_collapsed(&mut self, collapsed: bool) -> bool {
        if self.pinned {
            return false;
        }
        self.toolbar_collapsed = collapsed;
        true
    }

    pub fn lock_state(&self) -> LockState {
        LockState {
            pinned: self.pinned,
            toolbar_collapsed: self.toolbar_collapsed,
        }
    }
}

fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        return DEFAULT_OPACITY;
    }
    opacity.clamp(MIN_OPACITY, MAX_OPACITY)
}

fn next_candidate(id: u64) -> u64 {
    id.checked_add(1).unwrap_or(1)
}

/// Smallest N >= 1 not used by any name of the form "Timer N"
fn next_timer_number(timers: &[Timer]) -> u64 {
    let used: Vec<u64> = timers
        .iter()
        .filter_map(|t| parse_timer_number(&t.name))
        .collect();
    (1..).find(|n| !used.contains(n)).unwrap_or(1)
}

/// Number after the first "Timer " that is followed by digits
fn parse_timer_number(name: &str) -> Option<u64> {
    name.match_indices("Timer ").find_map(|(start, prefix)| {
        let digits: String = name[start + prefix.len()..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(n: usize) -> OverlayState {
        let mut state = OverlayState::new();
        for _ in 1..n {
            state.add_timer();
        }
        state
    }

    fn arm(state: &mut OverlayState, id: TimerId, minutes: u32, seconds: u32) {
        state.set_time(id, minutes, seconds).unwrap();
    }

    #[test]
    fn add_fills_numbering_gaps() {
        let mut state = state_with(3);
        let names: Vec<_> = state.timers().iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, ["Timer 1", "Timer 2", "Timer 3"]);
        let second = state.timers()[1].id;
        state.remove_timer(second).unwrap();
        let id = state.add_timer();
        assert_eq!(state.timer(id).unwrap().name, "Timer 2");
        assert_eq!(state.selected_id(), id);
        assert_eq!(state.timers().last().unwrap().id, id);
    }

    #[test]
    fn renamed_timers_free_their_number() {
        let mut state = OverlayState::new();
        let first = state.selected_id();
        state.rename(first, "Tea").unwrap();
        let id = state.add_timer();
        assert_eq!(state.timer(id).unwrap().name, "Timer 1");
    }

    #[test]
    fn remove_last_timer_is_rejected() {
        let mut state = OverlayState::new();
        let only = state.selected_id();
        assert!(matches!(state.remove_timer(only), Err(Error::LastTimer)));
        assert_eq!(state.timer_count(), 1);
    }

    #[test]
    fn removing_selected_moves_selection_to_first() {
        let mut state = state_with(3);
        let ids: Vec<_> = state.timers().iter().map(|t| t.id).collect();
        state.select(ids[0]).unwrap();
        state.remove_timer(ids[0]).unwrap();
        assert_eq!(state.timer_count(), 2);
        assert_eq!(state.selected_id(), ids[1]);

        // Removing an unselected timer keeps the selection
        state.select(ids[2]).unwrap();
        state.remove_timer(ids[1]).unwrap();
        assert_eq!(state.selected_id(), ids[2]);
    }

    #[test]
    fn slot_toggle_selects_and_starts() {
        let mut state = state_with(2);
        let first = state.timers()[0].id;
        arm(&mut state, first, 1, 0);
        assert_ne!(state.selected_id(), first);
        let outcome = state.apply_action(TimerAction::Toggle(0));
        assert!(matches!(
            outcome,
            ActionOutcome::Toggled {
                toggle: Toggle::Started { .. },
                ..
            }
        ));
        assert_eq!(state.selected_id(), first);
    }

    #[test]
    fn depleted_toggle_is_refused_without_selecting() {
        let mut state = state_with(2);
        let before = state.selected_id();
        assert_eq!(state.apply_action(TimerAction::Toggle(0)), ActionOutcome::Refused);
        assert_eq!(state.selected_id(), before);
        assert_eq!(state.apply_action(TimerAction::ToggleSelected), ActionOutcome::Refused);
        assert!(state.running().is_empty());
    }

    #[test]
    fn slot_past_timer_count_is_ignored() {
        let mut state = OverlayState::new();
        assert_eq!(state.apply_action(TimerAction::Reset(4)), ActionOutcome::Ignored);
    }

    #[test]
    fn reset_selected_keeps_selection() {
        let mut state = state_with(2);
        let selected = state.selected_id();
        arm(&mut state, selected, 0, 10);
        state.toggle(selected).unwrap();
        let outcome = state.apply_action(TimerAction::ResetSelected);
        assert_eq!(outcome, ActionOutcome::Reset { id: selected });
        assert!(!state.timer(selected).unwrap().is_running);
        assert_eq!(state.selected_id(), selected);
    }

    #[test]
    fn tick_reports_sound_index_unless_muted() {
        let mut state = state_with(8);
        let id = state.timers()[7].id;
        arm(&mut state, id, 0, 1);
        let Toggle::Started { epoch } = state.toggle(id).unwrap() else {
            panic!("not started");
        };
        assert_eq!(state.tick(id, epoch), Some(TickOutcome::Counting(Clock::ZERO)));
        assert_eq!(
            state.tick(id, epoch),
            Some(TickOutcome::Finished {
                position: 7,
                finish_seq: 1,
                sound: Some(1)
            })
        );

        state.muted = true;
        let Toggle::Started { epoch } = state.toggle(id).unwrap() else {
            panic!("not started");
        };
        state.tick(id, epoch);
        assert!(matches!(
            state.tick(id, epoch),
            Some(TickOutcome::Finished { sound: None, .. })
        ));
    }

    #[test]
    fn lock_collapses_toolbar_and_blocks_manual_toggle() {
        let mut state = OverlayState::new();
        let locked = state.toggle_lock();
        assert!(locked.pinned && locked.toolbar_collapsed);
        assert!(!state.set_toolbar_collapsed(false));
        let unlocked = state.toggle_lock();
        assert!(!unlocked.pinned && !unlocked.toolbar_collapsed);
        assert!(state.set_toolbar_collapsed(true));
    }

    #[test]
    fn from_parts_repairs_selection_and_opacity() {
        let timers = vec![Timer::new(TimerId(40), "Timer 1")];
        let state =
            OverlayState::from_parts(timers, Some(TimerId(9)), KeybindSet::default(), 4.0, false);
        assert_eq!(state.selected_id(), TimerId(40));
        assert_eq!(state.opacity(), MAX_OPACITY);
        let id = state.clone().add_timer();
        assert_eq!(id, TimerId(41));

        let empty = OverlayState::from_parts(vec![], None, KeybindSet::default(), 0.1, true);
        assert_eq!(empty.timer_count(), 1);
        assert_eq!(empty.opacity(), MIN_OPACITY);
    }

    #[test]
    fn id_allocation_wraps_past_live_ids() {
        let timers = vec![
            Timer::new(TimerId(1), "Timer 1"),
            Timer::new(TimerId(u64::MAX - 1), "Timer 2"),
        ];
        let mut state =
            OverlayState::from_parts(timers, None, KeybindSet::default(), DEFAULT_OPACITY, false);
        assert_eq!(state.add_timer(), TimerId(u64::MAX));
        assert_eq!(state.add_timer(), TimerId(2));
        let mut ids: Vec<_> = state.timers().iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn parses_timer_numbers() {
        assert_eq!(parse_timer_number("Timer 12"), Some(12));
        assert_eq!(parse_timer_number("My Timer 3b"), Some(3));
        assert_eq!(parse_timer_number("Timer x"), None);
        assert_eq!(parse_timer_number("Tea"), None);
        assert_eq!(parse_timer_number("Timer x Timer 2"), Some(2));
        assert_eq!(parse_timer_number("Timer 4 and Timer 7"), Some(4));
    }
}
