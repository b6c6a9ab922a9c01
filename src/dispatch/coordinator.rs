//! Dispatch coordinator

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{
    global::{GlobalShortcuts, LockDebounce},
    HitRegion, KeyFocus, PointerButton, Settings, SettingsUpdate,
};
use crate::{
    error::{Error, Result},
    geometry::{self, toolbar_physical_width},
    keybind::{capture_event, BindingTarget, Capture, KeyEvent, KeybindSet, TimerAction},
    services::{GlobalAction, HotkeyHost, SnapshotStore, StatusNotifier, WindowHost},
    state::{
        restore, ActionOutcome, AppState, Direction, LockState, OverlayEvent, Restored, Snapshot,
        TickOutcome, TimeUnit, TimerId, Toggle,
    },
    tasks::countdown::{CountdownScheduler, TickControl},
};

/// How long a completed timer shows as finished
pub const FINISHED_DISPLAY: Duration = Duration::from_secs(3);

/// External collaborators the coordinator drives
#[derive(Clone)]
pub struct Services {
    pub window: Arc<dyn WindowHost>,
    pub hotkeys: Arc<dyn HotkeyHost>,
    pub store: Arc<dyn SnapshotStore>,
    pub notifier: StatusNotifier,
}

/// Routes every input to the overlay model and applies the side effects.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Coordinator {
    state: Arc<AppState>,
    window: Arc<dyn WindowHost>,
    store: Arc<dyn SnapshotStore>,
    notifier: StatusNotifier,
    shortcuts: Arc<GlobalShortcuts>,
    countdowns: CountdownScheduler,
    lock_debounce: Arc<LockDebounce>,
    shutdown: CancellationToken,
    symbol: &'static str,
}

impl Coordinator {
    pub fn new(state: Arc<AppState>, services: Services, symbol: &'static str) -> Self {
        Self {
            state,
            window: services.window,
            store: services.store,
            notifier: services.notifier,
            shortcuts: Arc::new(GlobalShortcuts::new(services.hotkeys)),
            countdowns: CountdownScheduler::new(),
            lock_debounce: Arc::new(LockDebounce::new()),
            shutdown: CancellationToken::new(),
            symbol,
        }
    }

    /// Build a coordinator from whatever the store holds.
    ///
    /// Unreadable snapshots fall back to defaults; migrated keybinds are
    /// saved straight away.
    pub async fn restore(services: Services, symbol: &'static str) -> Self {
        let saved = match services.store.load().await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Failed to load saved state, starting fresh: {}", e);
                None
            }
        };
        let Restored { state, migrated } = restore(saved.as_ref(), &KeybindSet::defaults(symbol));
        info!(
            "Restored {} timer(s), selected {}",
            state.timer_count(),
            state.selected_id()
        );
        let coordinator = Self::new(Arc::new(AppState::new(state)), services, symbol);
        if migrated {
            info!("Migrated legacy keybinds");
            coordinator.persist().await;
        }
        coordinator
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn notifier(&self) -> &StatusNotifier {
        &self.notifier
    }

    pub fn countdowns(&self) -> &CountdownScheduler {
        &self.countdowns
    }

    /// Cancelled when the coordinator shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Register hotkeys and bring the window in line with the model
    pub async fn start(&self) {
        self.register_shortcuts().await;
        let pinned = self.state.read(|o| o.pinned);
        self.apply_resizable(!pinned).await;
        self.resize().await;
    }

    /// Stop every countdown, release hotkeys and save a final snapshot
    pub async fn shutdown(&self) {
        info!("Shutting down overlay");
        self.shutdown.cancel();
        self.countdowns.stop_all().await;
        self.shortcuts.clear().await;
        self.persist().await;
    }

    // ---- Input paths ----

    /// In-window key-down. Returns whether the event was consumed.
    pub async fn handle_key_down(&self, event: &KeyEvent, focus: KeyFocus) -> bool {
        if focus == KeyFocus::TextInput {
            return false;
        }
        let action = self.state.read(|o| {
            if o.settings_open {
                None
            } else {
                o.keybinds.resolve(event, o.timer_count())
            }
        });
        let Some(action) = action else {
            return false;
        };
        debug!("Key {:?} resolved to {:?}", event.key, action);
        self.apply_timer_action(action).await;
        true
    }

    /// A global hotkey fired. Reads live state at the time of the press.
    pub async fn handle_global_action(&self, action: GlobalAction) {
        match action {
            GlobalAction::Timer(action) => {
                self.apply_timer_action(action).await;
            }
            GlobalAction::ToggleLock => {
                self.toggle_lock_hotkey().await;
            }
        }
    }

    async fn apply_timer_action(&self, action: TimerAction) -> ActionOutcome {
        let outcome = self.state.update("timer-action", |o| o.apply_action(action));
        match outcome {
            ActionOutcome::Ignored => debug!("No timer for {:?}", action),
            ActionOutcome::Refused => debug!("Not starting a timer at 00:00"),
            ActionOutcome::Toggled { id, toggle } => self.follow_toggle(id, toggle),
            ActionOutcome::Reset { id } => self.countdowns.stop(id),
        }
        if outcome.changed() {
            self.timers_changed().await;
        }
        outcome
    }

    /// Lock hotkey: pin, collapse the toolbar and enable click-through.
    ///
    /// Returns `None` when the press was debounced.
    pub async fn toggle_lock_hotkey(&self) -> Option<LockState> {
        if !self.lock_debounce.accept() {
            return None;
        }
        let lock = self.state.update("toggle-lock", |o| o.toggle_lock());
        info!("Lock hotkey: pinned={}", lock.pinned);

        self.resize().await;
        if let Err(e) = self.window.set_ignore_cursor_events(lock.pinned).await {
            warn!("Failed to set click-through: {}", e);
        }
        self.apply_resizable(!lock.pinned).await;
        self.notifier.info(if lock.pinned {
            "🔒 Locked (Click-through enabled)"
        } else {
            "🔓 Unlocked"
        });
        self.lock_changed(lock);
        Some(lock)
    }

    /// Pointer down on the overlay. Returns whether a drag started.
    pub async fn pointer_down(&self, region: HitRegion, button: PointerButton) -> bool {
        if button != PointerButton::Primary || !region.is_draggable() {
            return false;
        }
        if self.state.read(|o| o.pinned) {
            debug!("Pinned, not dragging");
            return false;
        }
        match self.window.start_drag().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to start window drag: {}", e);
                false
            }
        }
    }

    // ---- Timer operations ----

    pub async fn add_timer(&self) -> TimerId {
        let id = self.state.update("add-timer", |o| o.add_timer());
        info!("Added timer {}", id);
        self.resize().await;
        self.timers_changed().await;
        id
    }

    pub async fn remove_timer(&self, id: TimerId) -> Result<()> {
        self.state.update("remove-timer", |o| o.remove_timer(id))?;
        self.countdowns.stop(id);
        info!("Removed timer {}", id);
        self.resize().await;
        self.timers_changed().await;
        Ok(())
    }

    pub async fn select_timer(&self, id: TimerId) -> Result<()> {
        self.state.update("select-timer", |o| o.select(id))?;
        self.timers_changed().await;
        Ok(())
    }

    pub async fn toggle_timer(&self, id: TimerId) -> Result<Toggle> {
        let toggle = self.state.update("toggle-timer", |o| o.toggle(id))?;
        self.follow_toggle(id, toggle);
        if toggle != Toggle::Refused {
            self.timers_changed().await;
        }
        Ok(toggle)
    }

    pub async fn reset_timer(&self, id: TimerId) -> Result<()> {
        self.state.update("reset-timer", |o| o.reset(id))?;
        self.countdowns.stop(id);
        self.timers_changed().await;
        Ok(())
    }

    pub async fn rename_timer(&self, id: TimerId, name: &str) -> Result<()> {
        self.state.update("rename-timer", |o| o.rename(id, name))?;
        self.timers_changed().await;
        Ok(())
    }

    /// Spinner edit; `Ok(false)` when already at the bound
    pub async fn adjust_timer(&self, id: TimerId, unit: TimeUnit, direction: Direction) -> Result<bool> {
        let changed = self
            .state
            .update("adjust-timer", |o| o.adjust(id, unit, direction))?;
        if changed {
            self.timers_changed().await;
        }
        Ok(changed)
    }

    pub async fn set_timer_time(&self, id: TimerId, minutes: u32, seconds: u32) -> Result<()> {
        self.state
            .update("set-time", |o| o.set_time(id, minutes, seconds))?;
        self.timers_changed().await;
        Ok(())
    }

    fn follow_toggle(&self, id: TimerId, toggle: Toggle) {
        match toggle {
            Toggle::Started { epoch } => self.start_countdown(id, epoch),
            Toggle::Paused => self.countdowns.stop(id),
            Toggle::Refused => debug!("Timer {} is at 00:00", id),
        }
    }

    fn start_countdown(&self, id: TimerId, epoch: u64) {
        let coordinator = self.clone();
        self.countdowns.start(id, epoch, move |id, epoch| {
            let coordinator = coordinator.clone();
            async move { coordinator.on_tick(id, epoch).await }
        });
    }

    async fn on_tick(&self, id: TimerId, epoch: u64) -> TickControl {
        let Some(outcome) = self.state.update_quiet(|o| o.tick(id, epoch)) else {
            trace!(timer = %id, epoch, "stale_tick");
            return TickControl::Stop;
        };
        match outcome {
            TickOutcome::Counting(clock) => {
                trace!(timer = %id, remaining = %clock, "tick");
                self.timers_changed().await;
                TickControl::Continue
            }
            TickOutcome::Finished {
                position,
                finish_seq,
                sound,
            } => {
                info!("Timer {} finished", id);
                self.state.publish(OverlayEvent::TimerFinished {
                    id,
                    position,
                    sound,
                });
                self.timers_changed().await;
                self.schedule_finished_clear(id, finish_seq);
                TickControl::Stop
            }
        }
    }

    fn schedule_finished_clear(&self, id: TimerId, finish_seq: u64) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = coordinator.shutdown.cancelled() => {}
                _ = tokio::time::sleep(FINISHED_DISPLAY) => {
                    let cleared = coordinator
                        .state
                        .update_quiet(|o| o.clear_finished(id, finish_seq));
                    if cleared {
                        coordinator.timers_changed().await;
                    }
                }
            }
        });
    }

    // ---- Toolbar and window ----

    /// Manual collapse/expand; refused while pinned
    pub async fn set_toolbar_collapsed(&self, collapsed: bool) -> bool {
        let action = if collapsed {
            "collapse-toolbar"
        } else {
            "expand-toolbar"
        };
        let accepted = self
            .state
            .update(action, |o| o.set_toolbar_collapsed(collapsed));
        if !accepted {
            debug!("Toolbar is pinned");
            return false;
        }
        self.resize().await;
        self.lock_changed(self.state.read(|o| o.lock_state()));
        true
    }

    /// Record the toolbar's measured CSS width; returns the physical width.
    ///
    /// Negative or non-finite measurements are ignored and the current width
    /// is returned.
    pub async fn set_toolbar_width(&self, css_width: f64) -> u32 {
        if !css_width.is_finite() || css_width < 0.0 {
            warn!("Ignoring invalid toolbar width {}", css_width);
            return self.state.read(|o| o.toolbar_width);
        }
        let scale = self.scale_factor().await;
        let width = toolbar_physical_width(css_width, scale);
        let changed = self.state.update("toolbar-width", |o| {
            let changed = o.toolbar_width != width;
            o.toolbar_width = width;
            changed
        });
        if changed {
            debug!("Toolbar measured at {}px", width);
            self.resize().await;
        }
        width
    }

    /// Toolbar pin button: flips pinned only, no click-through
    pub async fn toggle_pin(&self) -> LockState {
        let lock = self.state.update("toggle-pin", |o| o.toggle_pin());
        self.apply_resizable(!lock.pinned).await;
        self.notifier
            .info(if lock.pinned { "🔒 Locked" } else { "🔓 Unlocked" });
        self.lock_changed(lock);
        lock
    }

    pub async fn minimize(&self) {
        if let Err(e) = self.window.minimize().await {
            warn!("Failed to minimize window: {}", e);
        }
    }

    pub async fn close(&self) {
        if let Err(e) = self.window.close().await {
            warn!("Failed to close window: {}", e);
        }
    }

    // ---- Keybinds and settings ----

    /// Replace the whole keybind set
    pub async fn set_keybinds(&self, mut keybinds: KeybindSet) -> Result<()> {
        if keybinds.migrate_legacy(&KeybindSet::defaults(self.symbol)) {
            debug!("Replaced legacy bindings in submitted keybinds");
        }
        if let Some(kb) = keybinds.duplicate() {
            return Err(Error::DuplicateKeybind(kb.label.clone()));
        }
        self.state.update("set-keybinds", |o| o.keybinds = keybinds);
        self.keybinds_changed().await;
        Ok(())
    }

    /// Feed a key event to the capture control for `target`.
    ///
    /// A bound candidate already used by another target is rejected and the
    /// set is left unchanged.
    pub async fn capture_keybind(&self, target: BindingTarget, event: &KeyEvent) -> Result<Capture> {
        let capture = capture_event(event, self.symbol);
        if let Capture::Bound(kb) = &capture {
            let assigned = self
                .state
                .update("capture-keybind", |o| o.keybinds.assign(target, kb.clone()));
            if let Err(e) = assigned {
                if matches!(e, Error::DuplicateKeybind(_)) {
                    self.notifier.error("This keybind is already in use");
                }
                return Err(e);
            }
            info!("Bound {:?} to {}", target, kb.label);
            self.keybinds_changed().await;
        }
        Ok(capture)
    }

    pub async fn clear_keybind(&self, target: BindingTarget) {
        self.state
            .update("clear-keybind", |o| o.keybinds.clear(target));
        self.keybinds_changed().await;
    }

    pub async fn restore_default_keybinds(&self) -> KeybindSet {
        let defaults = KeybindSet::defaults(self.symbol);
        self.state
            .update("default-keybinds", |o| o.keybinds = defaults.clone());
        self.keybinds_changed().await;
        defaults
    }

    pub async fn apply_settings(&self, update: SettingsUpdate) -> Settings {
        let settings = self.state.update("settings", |o| {
            if let Some(opacity) = update.opacity {
                o.set_opacity(opacity);
            }
            if let Some(muted) = update.muted {
                o.muted = muted;
            }
            if let Some(open) = update.open {
                o.settings_open = open;
            }
            Settings {
                opacity: o.opacity(),
                muted: o.muted,
                open: o.settings_open,
            }
        });
        if update.opacity.is_some() || update.muted.is_some() {
            self.persist().await;
        }
        settings
    }

    // ---- Side effects ----

    async fn register_shortcuts(&self) {
        let keybinds = self.state.read(|o| o.keybinds.clone());
        self.shortcuts.replace(&keybinds).await;
    }

    async fn keybinds_changed(&self) {
        self.register_shortcuts().await;
        self.persist().await;
    }

    async fn timers_changed(&self) {
        self.state.publish(OverlayEvent::TimersChanged);
        self.persist().await;
    }

    fn lock_changed(&self, lock: LockState) {
        self.state.publish(OverlayEvent::LockChanged {
            pinned: lock.pinned,
            toolbar_collapsed: lock.toolbar_collapsed,
        });
    }

    /// Save the current snapshot; failures are logged
    pub async fn persist(&self) {
        let snapshot = self.state.read(Snapshot::capture);
        if let Err(e) = self.store.save(&snapshot).await {
            warn!("Failed to save state: {}", e);
        }
    }

    async fn scale_factor(&self) -> f64 {
        match self.window.scale_factor().await {
            Ok(scale) if scale.is_finite() && scale > 0.0 => scale,
            Ok(scale) => {
                warn!("Ignoring invalid scale factor {}", scale);
                1.0
            }
            Err(e) => {
                warn!("Failed to read scale factor: {}", e);
                1.0
            }
        }
    }

    /// Fit the window width to the model at the current monitor's scale
    pub async fn resize(&self) {
        let scale = self.scale_factor().await;
        let current = match self.window.current_size().await {
            Ok(size) => size,
            Err(e) => {
                warn!("Failed to read window size: {}", e);
                return;
            }
        };
        let layout = self.state.read(|o| o.layout(scale));
        let target = geometry::target_size(&layout, current);
        debug!(
            "Resizing for {} timer(s) at scale {}: {}px",
            layout.timer_count, scale, target.width
        );
        if let Err(e) = self.window.resize(target).await {
            warn!("Failed to resize window: {}", e);
        }
    }

    async fn apply_resizable(&self, resizable: bool) {
        if let Err(e) = self.window.set_resizable(resizable).await {
            warn!("Failed to set window resizable: {}", e);
        }
    }
}
