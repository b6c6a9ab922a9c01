//! Per-timer tick tasks

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::TimerId;

/// Countdown resolution
pub const TICK: Duration = Duration::from_secs(1);

/// Whether a tick task keeps going after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

struct CountdownEntry {
    epoch: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns exactly one tick task per running timer.
///
/// Each task carries the run epoch it was started for; the engine ignores
/// ticks from an older epoch, so a cancelled task that already fired is
/// harmless.
#[derive(Clone, Default)]
pub struct CountdownScheduler {
    entries: Arc<Mutex<HashMap<TimerId, CountdownEntry>>>,
}

impl CountdownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<TimerId, CountdownEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.entries().contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.entries().len()
    }

    /// Start ticking `id` for `epoch`, replacing any existing task.
    ///
    /// The first tick fires one [`TICK`] after the start.
    pub fn start<F, Fut>(&self, id: TimerId, epoch: u64, mut on_tick: F)
    where
        F: FnMut(TimerId, u64) -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send,
    {
        self.stop(id);

        let token = CancellationToken::new();
        let cancel = token.clone();
        let entries = Arc::clone(&self.entries);

        let handle = tokio::spawn(async move {
            trace!(timer = %id, epoch, "countdown_start");
            let mut interval = time::interval_at(Instant::now() + TICK, TICK);
            // Catch up after a stall so remaining time follows the wall clock
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        trace!(timer = %id, epoch, "countdown_cancelled");
                        return;
                    }
                    _ = interval.tick() => {
                        if on_tick(id, epoch).await == TickControl::Stop {
                            break;
                        }
                    }
                }
            }

            let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.get(&id).is_some_and(|e| e.epoch == epoch) {
                entries.remove(&id);
            }
        });

        self.entries().insert(
            id,
            CountdownEntry {
                epoch,
                token,
                handle,
            },
        );
    }

    /// Cancel the tick task for `id`, if any
    pub fn stop(&self, id: TimerId) {
        if let Some(entry) = self.entries().remove(&id) {
            debug!("Stopping countdown for timer {} (epoch {})", id, entry.epoch);
            entry.token.cancel();
        }
    }

    /// Cancel every tick task and wait for them to exit
    pub async fn stop_all(&self) {
        let drained: Vec<CountdownEntry> = self.entries().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.token.cancel();
        }
        for entry in drained {
            let _ = entry.handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    fn counting(ticks: &Arc<AtomicU32>, stop_after: u32) -> impl FnMut(TimerId, u64) -> std::future::Ready<TickControl> {
        let ticks = Arc::clone(ticks);
        move |_, _| {
            let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n >= stop_after {
                TickControl::Stop
            } else {
                TickControl::Continue
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_second() {
        let scheduler = CountdownScheduler::new();
        let ticks = counter();
        scheduler.start(TimerId(1), 1, counting(&ticks, u32::MAX));

        time::sleep(Duration::from_millis(999)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_active(TimerId(1)));

        scheduler.stop(TimerId(1));
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_existing_task() {
        let scheduler = CountdownScheduler::new();
        let old = counter();
        let new = counter();
        scheduler.start(TimerId(1), 1, counting(&old, u32::MAX));
        time::sleep(Duration::from_millis(1500)).await;
        scheduler.start(TimerId(1), 2, counting(&new, u32::MAX));
        time::sleep(Duration::from_millis(2100)).await;

        assert_eq!(old.load(Ordering::SeqCst), 1);
        assert_eq!(new.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.active_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_control_removes_entry() {
        let scheduler = CountdownScheduler::new();
        let ticks = counter();
        scheduler.start(TimerId(7), 1, counting(&ticks, 2));
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!scheduler.is_active(TimerId(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_cancels_everything() {
        let scheduler = CountdownScheduler::new();
        let ticks = counter();
        scheduler.start(TimerId(1), 1, counting(&ticks, u32::MAX));
        scheduler.start(TimerId(2), 1, counting(&ticks, u32::MAX));
        scheduler.stop_all().await;
        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.active_count(), 0);
    }
}
