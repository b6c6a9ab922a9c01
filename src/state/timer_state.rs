//! Timer entity and its countdown state machine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_MINUTES: u32 = 99;
pub const MAX_SECONDS: u32 = 59;
pub const MAX_NAME_CHARS: usize = 20;

/// Opaque, stable timer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minutes and seconds on a countdown face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub minutes: u32,
    pub seconds: u32,
}

impl Clock {
    pub const ZERO: Self = Self {
        minutes: 0,
        seconds: 0,
    };

    /// Build a clock, rejecting out-of-range fields
    pub fn new(minutes: u32, seconds: u32) -> Result<Self> {
        if minutes > MAX_MINUTES || seconds > MAX_SECONDS {
            return Err(Error::InvalidTime { minutes, seconds });
        }
        Ok(Self { minutes, seconds })
    }

    /// Build a clock, clamping out-of-range fields
    pub fn clamped(minutes: u32, seconds: u32) -> Self {
        Self {
            minutes: minutes.min(MAX_MINUTES),
            seconds: seconds.min(MAX_SECONDS),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.minutes == 0 && self.seconds == 0
    }

    /// Count down one second, borrowing a minute when seconds run out.
    /// Returns false when already at zero.
    fn decrement(&mut self) -> bool {
        if self.seconds > 0 {
            self.seconds -= 1;
        } else if self.minutes > 0 {
            self.minutes -= 1;
            self.seconds = MAX_SECONDS;
        } else {
            return false;
        }
        true
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// Which spinner an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    Seconds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increment,
    Decrement,
}

/// Observable phase of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    /// Just completed; reverts to idle once the display window passes
    Finished,
}

/// Result of a start/pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Now running; ticks must carry this epoch
    Started { epoch: u64 },
    Paused,
    /// Idle at 0:00, left untouched
    Refused,
}

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Counting(Clock),
    /// Countdown completed: remaining restored to initial, timer stopped
    Finished { finish_seq: u64 },
    /// Timer not running under this epoch; tick discarded
    Stale,
}

/// A single countdown timer
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub id: TimerId,
    pub name: String,
    pub remaining: Clock,
    /// Reset target
    pub initial: Clock,
    pub is_running: bool,
    pub has_finished: bool,
    run_epoch: u64,
    finish_seq: u64,
}

impl Timer {
    /// Create an idle timer at 0:00
    pub fn new(id: TimerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: truncate_name(&name.into()),
            remaining: Clock::ZERO,
            initial: Clock::ZERO,
            is_running: false,
            has_finished: false,
            run_epoch: 0,
            finish_seq: 0,
        }
    }

    /// Restore an idle timer from saved fields
    pub fn restored(id: TimerId, name: &str, remaining: Clock, initial: Clock) -> Self {
        Self {
            remaining,
            initial,
            ..Self::new(id, name)
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_running {
            TimerPhase::Running
        } else if self.has_finished {
            TimerPhase::Finished
        } else {
            TimerPhase::Idle
        }
    }

    pub fn run_epoch(&self) -> u64 {
        self.run_epoch
    }

    /// Idle at 0:00: cannot be started
    pub fn is_depleted(&self) -> bool {
        !self.is_running && self.remaining.is_zero()
    }

    /// Start if idle, pause if running
    pub fn toggle(&mut self) -> Toggle {
        if self.is_running {
            self.is_running = false;
            Toggle::Paused
        } else if self.remaining.is_zero() {
            Toggle::Refused
        } else {
            self.is_running = true;
            self.run_epoch += 1;
            Toggle::Started {
                epoch: self.run_epoch,
            }
        }
    }

    /// Restore remaining to the reset target and stop
    pub fn reset(&mut self) {
        self.remaining = self.initial;
        self.is_running = false;
    }

    /// Advance one second for the run identified by `epoch`
    pub fn tick(&mut self, epoch: u64) -> Tick {
        if !self.is_running || epoch != self.run_epoch {
            return Tick::Stale;
        }
        if self.remaining.decrement() {
            return Tick::Counting(self.remaining);
        }
        self.remaining = self.initial;
        self.is_running = false;
        self.has_finished = true;
        self.finish_seq += 1;
        Tick::Finished {
            finish_seq: self.finish_seq,
        }
    }

    /// Clear the finished flag if no newer completion happened since `finish_seq`
    pub fn clear_finished(&mut self, finish_seq: u64) -> bool {
        if self.has_finished && self.finish_seq == finish_seq {
            self.has_finished = false;
            return true;
        }
        false
    }

    /// Spinner edit: moves one unit and keeps the reset target in lock-step.
    /// Returns false when the unit is already at its bound.
    pub fn adjust(&mut self, unit: TimeUnit, direction: Direction) -> Result<bool> {
        if self.is_running {
            return Err(Error::TimerRunning(self.id));
        }
        let (value, max) = match unit {
            TimeUnit::Minutes => (self.remaining.minutes, MAX_MINUTES),
            TimeUnit::Seconds => (self.remaining.seconds, MAX_SECONDS),
        };
        let next = match direction {
            Direction::Increment if value < max => value + 1,
            Direction::Decrement if value > 0 => value - 1,
            _ => return Ok(false),
        };
        match unit {
            TimeUnit::Minutes => {
                self.remaining.minutes = next;
                self.initial.minutes = next;
            }
            TimeUnit::Seconds => {
                self.remaining.seconds = next;
                self.initial.seconds = next;
            }
        }
        Ok(true)
    }

    /// Set both remaining and the reset target
    pub fn set_time(&mut self, clock: Clock) -> Result<()> {
        if self.is_running {
            return Err(Error::TimerRunning(self.id));
        }
        self.remaining = clock;
        self.initial = clock;
        Ok(())
    }

    pub fn rename(&mut self, name: &str) {
        self.name = truncate_name(name);
    }
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}
