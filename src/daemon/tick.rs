//! Tick scheduling for the timer authority.
//!
//! A `TickScheduler` hands out a `TickHandle` per countdown. The handle owns
//! the background task producing one `TickSignal` per second; dropping the
//! handle cancels the task, so replacing the handle replaces the schedule.
//! Signals carry the generation they were scheduled under, which lets the
//! authority ignore a signal that was already queued when its schedule was
//! cancelled.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One elapsed tick period for a given schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSignal {
    pub generation: u64,
}

// ============================================================================
// TickHandle
// ============================================================================

/// Opaque handle of an active tick schedule.
#[derive(Debug)]
pub struct TickHandle {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Handle with no background task (driven by hand in tests).
    pub fn detached(generation: u64) -> Self {
        Self {
            generation,
            task: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// TickScheduler
// ============================================================================

/// Starts tick schedules.
pub trait TickScheduler: Send + Sync {
    /// Starts a schedule whose first tick fires one period from now.
    fn schedule(&self, generation: u64) -> TickHandle;
}

/// Produces `TickSignal`s on a tokio interval.
///
/// Must be used from within a tokio runtime.
pub struct IntervalScheduler {
    tx: mpsc::UnboundedSender<TickSignal>,
    period: Duration,
}

impl IntervalScheduler {
    /// Creates a scheduler and the receiver its signals arrive on.
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<TickSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, period }, rx)
    }
}

impl TickScheduler for IntervalScheduler {
    fn schedule(&self, generation: u64) -> TickHandle {
        let tx = self.tx.clone();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if tx.send(TickSignal { generation }).is_err() {
                    break;
                }
            }
        });

        TickHandle {
            generation,
            task: Some(task),
        }
    }
}

/// Records schedules without producing any ticks.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    scheduled: Mutex<Vec<u64>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generations scheduled so far.
    #[must_use]
    pub fn scheduled(&self) -> Vec<u64> {
        self.scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&self, generation: u64) -> TickHandle {
        self.scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(generation);
        TickHandle::detached(generation)
    }
}

// ============================================================================
// Tests
// ============================================================================
