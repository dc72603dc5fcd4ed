//! Timer authority for the focus timer.
//!
//! This module owns the single source of truth for the countdown:
//! - State transitions (Idle → Running → Complete → Idle)
//! - One tick schedule at a time, replaced on every start
//! - Push events for listeners (tick / sessionComplete)
//! - Indicator updates and session-end alerts
//! - Snapshot persistence on every command, periodically while ticking
//!
//! Every method takes `&mut self`; the daemon wraps the authority in a mutex
//! so commands and ticks are applied strictly one at a time.

use std::sync::Arc;

use crate::indicator::{indicator_label, Indicator, IndicatorColor};
use crate::notify::Notifier;
use crate::storage::{load_typed, persist_typed, SnapshotStorage};
use crate::types::{CommandError, PersistedTimer, SessionConfig, SessionType, SyncEvent, TimerState};

use super::sync::SyncChannel;
use super::tick::{TickHandle, TickScheduler};

/// Storage key of the persisted timer snapshot.
pub const TIMER_KEY: &str = "timer";

/// Ticks between periodic snapshot writes while running.
pub const PERSIST_EVERY_TICKS: u32 = 30;

// ============================================================================
// Capabilities
// ============================================================================

/// External collaborators the authority drives.
#[derive(Clone)]
pub struct Capabilities {
    pub notifier: Arc<dyn Notifier>,
    pub indicator: Arc<dyn Indicator>,
    pub storage: Arc<dyn SnapshotStorage>,
    pub scheduler: Arc<dyn TickScheduler>,
}

// ============================================================================
// TickOutcome
// ============================================================================

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running (or stale schedule); nothing changed
    Ignored,
    /// One second elapsed, time remains
    Ticked { time_remaining_seconds: u32 },
    /// The session ran out
    Completed { session_type: SessionType },
}

// ============================================================================
// TimerAuthority
// ============================================================================

/// Owns the countdown state and is its only writer.
pub struct TimerAuthority {
    config: SessionConfig,
    state: TimerState,
    /// Present exactly while `state.running`
    tick_handle: Option<TickHandle>,
    next_generation: u64,
    ticks_since_persist: u32,
    sync: SyncChannel,
    caps: Capabilities,
}

impl TimerAuthority {
    /// Creates an idle authority with default state.
    pub fn new(config: SessionConfig, caps: Capabilities, sync: SyncChannel) -> Self {
        let state = TimerState::idle(&config);
        Self {
            config,
            state,
            tick_handle: None,
            next_generation: 0,
            ticks_since_persist: 0,
            sync,
            caps,
        }
    }

    /// Creates an idle authority from the persisted snapshot.
    ///
    /// A missing, unreadable or malformed snapshot falls back to defaults.
    pub fn restore(config: SessionConfig, caps: Capabilities, sync: SyncChannel) -> Self {
        let mut authority = Self::new(config, caps, sync);

        match load_typed::<PersistedTimer>(authority.caps.storage.as_ref(), TIMER_KEY) {
            Some(persisted) => {
                authority.state = persisted.restore(&authority.config);
                tracing::info!(
                    remaining = authority.state.time_remaining_seconds,
                    session = %authority.state.current_type,
                    "保存された状態を復元しました"
                );
            }
            None => tracing::debug!("保存された状態がないため既定値で起動します"),
        }

        authority
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Starts a countdown of `duration_seconds` for `session_type`.
    ///
    /// Replaces any in-flight countdown and its tick schedule. When
    /// `prior_completed` is `None` the authority keeps its own count.
    ///
    /// # Errors
    ///
    /// Rejects a zero duration or one longer than the configured session.
    pub fn start(
        &mut self,
        duration_seconds: u32,
        session_type: SessionType,
        prior_completed: Option<u32>,
    ) -> Result<TimerState, CommandError> {
        let max = self.config.duration_seconds(session_type);
        if duration_seconds == 0 || duration_seconds > max {
            return Err(CommandError::InvalidDuration {
                seconds: duration_seconds,
                max,
                session_type,
            });
        }

        // Cancel before installing the replacement
        self.tick_handle = None;

        self.state.running = true;
        self.state.time_remaining_seconds = duration_seconds;
        self.state.current_type = session_type;
        if let Some(count) = prior_completed {
            self.state.completed_work_sessions = count;
        }

        self.next_generation += 1;
        self.tick_handle = Some(self.caps.scheduler.schedule(self.next_generation));
        self.ticks_since_persist = 0;

        tracing::info!(
            session = %session_type,
            seconds = duration_seconds,
            "タイマーを開始しました"
        );
        self.update_indicator();
        self.persist();

        Ok(self.snapshot())
    }

    /// Stops ticking and keeps the remaining time. Idempotent.
    pub fn pause(&mut self) -> TimerState {
        if self.state.running {
            tracing::info!(remaining = self.state.time_remaining_seconds, "一時停止しました");
        }
        self.halt();
        self.clear_indicator();
        self.persist();
        self.snapshot()
    }

    /// Pauses and restores the full duration of the current type.
    pub fn reset(&mut self) -> TimerState {
        self.halt();
        self.state.time_remaining_seconds = self.config.duration_seconds(self.state.current_type);
        tracing::info!(session = %self.state.current_type, "リセットしました");
        self.clear_indicator();
        self.persist();
        self.snapshot()
    }

    /// Pauses and stages `session_type` at its full duration.
    pub fn select_type(&mut self, session_type: SessionType) -> TimerState {
        self.halt();
        self.state.current_type = session_type;
        self.state.time_remaining_seconds = self.config.duration_seconds(session_type);
        tracing::debug!(session = %session_type, "セッション種別を切り替えました");
        self.clear_indicator();
        self.persist();
        self.snapshot()
    }

    /// Ends the current session early.
    ///
    /// A work session completes (without an alert); a break is abandoned in
    /// favour of a work session.
    pub fn skip(&mut self) -> TimerState {
        match self.state.current_type {
            SessionType::Work => {
                tracing::info!("作業セッションをスキップしました");
                self.complete(false);
                self.snapshot()
            }
            SessionType::ShortBreak | SessionType::LongBreak => {
                tracing::info!("休憩をスキップしました");
                self.select_type(SessionType::Work)
            }
        }
    }

    /// Counts a recorded completion.
    ///
    /// The only path that increments `completed_work_sessions`; breaks leave
    /// it untouched.
    pub fn acknowledge_completion(&mut self, finished: SessionType) -> TimerState {
        if finished.is_work() {
            self.state.completed_work_sessions += 1;
            self.persist();
        }
        self.snapshot()
    }

    /// Zeroes the completed work session counter.
    pub fn reset_completed(&mut self) -> TimerState {
        self.state.completed_work_sessions = 0;
        self.persist();
        self.snapshot()
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> TimerState {
        self.state.clone()
    }

    // ------------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------------

    /// Applies a tick signal if it belongs to the active schedule.
    pub fn handle_tick_signal(&mut self, generation: u64) -> TickOutcome {
        match &self.tick_handle {
            Some(handle) if handle.generation() == generation => self.tick(),
            _ => {
                tracing::trace!(generation, "古いティックを無視しました");
                TickOutcome::Ignored
            }
        }
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.running {
            return TickOutcome::Ignored;
        }

        self.state.time_remaining_seconds = self.state.time_remaining_seconds.saturating_sub(1);

        if self.state.time_remaining_seconds == 0 {
            let session_type = self.state.current_type;
            self.complete(true);
            return TickOutcome::Completed { session_type };
        }

        let remaining = self.state.time_remaining_seconds;
        self.sync.publish(SyncEvent::Tick {
            time_remaining_seconds: remaining,
            running: true,
        });
        self.update_indicator();

        self.ticks_since_persist += 1;
        if self.ticks_since_persist >= PERSIST_EVERY_TICKS {
            self.persist();
        }

        TickOutcome::Ticked {
            time_remaining_seconds: remaining,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Stops ticking and flushes the snapshot before the process exits.
    pub fn shutdown(&mut self) {
        self.halt();
        self.clear_indicator();
        self.persist();
        tracing::info!("タイマーを停止して状態を保存しました");
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sync(&self) -> &SyncChannel {
        &self.sync
    }

    /// Returns true while a tick schedule is installed.
    pub fn has_tick_schedule(&self) -> bool {
        self.tick_handle.is_some()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Stops running and drops the tick schedule.
    fn halt(&mut self) {
        self.state.running = false;
        self.tick_handle = None;
    }

    fn complete(&mut self, alert: bool) {
        let session_type = self.state.current_type;
        self.halt();

        tracing::info!(session = %session_type, "セッションが完了しました");

        if alert {
            if let Err(e) = self.caps.notifier.notify(session_type) {
                tracing::warn!("通知の送信に失敗しました: {}", e);
            }
        }
        self.sync.publish(SyncEvent::SessionComplete { session_type });
        self.clear_indicator();
        self.persist();
    }

    fn update_indicator(&self) {
        let text = indicator_label(self.state.current_type, self.state.time_remaining_seconds);
        let color = IndicatorColor::for_session(self.state.current_type);
        if let Err(e) = self.caps.indicator.set_indicator(&text, color) {
            tracing::debug!("インジケーターを更新できません: {}", e);
        }
    }

    fn clear_indicator(&self) {
        if let Err(e) = self.caps.indicator.clear_indicator() {
            tracing::debug!("インジケーターを消去できません: {}", e);
        }
    }

    fn persist(&mut self) {
        self.ticks_since_persist = 0;
        let persisted = self.state.to_persisted();
        if let Err(e) = persist_typed(self.caps.storage.as_ref(), TIMER_KEY, &persisted) {
            tracing::warn!("状態の保存に失敗しました（再試行しません）: {}", e);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
