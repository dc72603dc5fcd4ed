//! History owner inside the daemon.
//!
//! `HistoryRecorder` listens on the sync channel like any other UI and turns
//! `sessionComplete` events into history records. It owns the history store
//! and reaches the timer only through authority commands.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::history::SessionHistoryStore;
use crate::types::{SessionConfig, SessionRecord, SessionType, SyncEvent, TimerState};

use super::sync::SyncListener;
use super::timer::TimerAuthority;

/// Authority shared between the IPC handler, tick loop and recorder.
pub type SharedAuthority = Arc<Mutex<TimerAuthority>>;

/// History store shared between the recorder and the IPC handler.
pub type SharedHistory = Arc<Mutex<SessionHistoryStore>>;

#[derive(Clone)]
pub struct HistoryRecorder {
    authority: SharedAuthority,
    history: SharedHistory,
    clock: Arc<dyn Clock>,
}

impl HistoryRecorder {
    pub fn new(authority: SharedAuthority, history: SharedHistory, clock: Arc<dyn Clock>) -> Self {
        Self {
            authority,
            history,
            clock,
        }
    }

    /// Consumes events until the channel closes.
    pub async fn run(self, mut listener: SyncListener) {
        while let Some(event) = listener.next().await {
            if let SyncEvent::SessionComplete { session_type } = event {
                self.record_completion(session_type).await;
            }
        }
        tracing::debug!("履歴レコーダーを終了します");
    }

    /// Appends the finished session, counts it, and stages the next one.
    ///
    /// Counting and staging happen under one authority lock. The next type is
    /// staged only while the authority still sits idle on the finished type;
    /// a command that got in after the completion is left untouched.
    pub async fn record_completion(&self, finished: SessionType) -> TimerState {
        let minutes = {
            let authority = self.authority.lock().await;
            authority.config().duration_minutes(finished)
        };
        let record = SessionRecord::ending_at(finished, minutes, self.clock.now_millis());

        {
            let mut history = self.history.lock().await;
            if let Err(e) = history.append(record) {
                tracing::warn!("{}", e);
            }
        }

        let mut authority = self.authority.lock().await;
        let counted = authority.acknowledge_completion(finished);
        if counted.running || counted.current_type != finished {
            tracing::info!(
                finished = %finished,
                current = %counted.current_type,
                "セッションを記録しました（タイマーは操作済みのため切り替えません）"
            );
            return counted;
        }

        let next = SessionConfig::next_type(finished, counted.completed_work_sessions);
        tracing::info!(finished = %finished, next = %next, "セッションを記録しました");
        authority.select_type(next)
    }

    /// Empties the history and zeroes the work counter.
    pub async fn clear(&self) -> TimerState {
        {
            let mut history = self.history.lock().await;
            if let Err(e) = history.clear() {
                tracing::warn!("{}", e);
            }
        }
        self.authority.lock().await.reset_completed()
    }
}
