//! Core data types for the focus timer.
//!
//! This module defines the data structures used for:
//! - Session types and their configured durations
//! - The authoritative timer state and its persisted form
//! - Session history records and statistics (see `record`)
//! - IPC request/response and push-event serialization (see `ipc`)

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub mod ipc;
pub mod record;

pub use ipc::{CommandError, IpcRequest, IpcResponse, ResponseData, StartParams, SyncEvent};
pub use record::{SessionRecord, StatsPeriod, StatsSummary, TodayProgress};

// ============================================================================
// SessionType
// ============================================================================

/// Kind of timed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    /// Focused work period
    #[default]
    Work,
    /// Short break between work periods
    ShortBreak,
    /// Long break after every fourth work period
    LongBreak,
}

impl SessionType {
    /// All session types in display order.
    pub const ALL: [SessionType; 3] = [
        SessionType::Work,
        SessionType::ShortBreak,
        SessionType::LongBreak,
    ];

    /// Returns the wire tag of the session type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "shortBreak",
            SessionType::LongBreak => "longBreak",
        }
    }

    /// Returns true for the focus-period type.
    pub fn is_work(&self) -> bool {
        matches!(self, SessionType::Work)
    }

    /// Returns true for either break type.
    pub fn is_break(&self) -> bool {
        !self.is_work()
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = String;

    /// Accepts both the wire tags and the kebab-case CLI spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(SessionType::Work),
            "shortBreak" | "short-break" | "short" => Ok(SessionType::ShortBreak),
            "longBreak" | "long-break" | "long" => Ok(SessionType::LongBreak),
            other => Err(format!(
                "不明なセッション種別です: {} (work, short-break, long-break)",
                other
            )),
        }
    }
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Work sessions completed before a long break is due.
pub const SESSIONS_PER_LONG_BREAK: u32 = 4;

/// Duration and display label for one session type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfigEntry {
    /// Session type this entry describes
    pub session_type: SessionType,
    /// Full duration in seconds (always positive)
    pub duration_seconds: u32,
    /// Human-readable label
    pub label: String,
}

/// Static table mapping each session type to its duration and label.
///
/// Loaded once at process start and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    work: SessionConfigEntry,
    short_break: SessionConfigEntry,
    long_break: SessionConfigEntry,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15)
    }
}

impl SessionConfig {
    /// Builds a table from per-type durations in minutes.
    pub fn from_minutes(work: u32, short_break: u32, long_break: u32) -> Self {
        Self {
            work: SessionConfigEntry {
                session_type: SessionType::Work,
                duration_seconds: work * 60,
                label: "集中タイム".to_string(),
            },
            short_break: SessionConfigEntry {
                session_type: SessionType::ShortBreak,
                duration_seconds: short_break * 60,
                label: "短い休憩".to_string(),
            },
            long_break: SessionConfigEntry {
                session_type: SessionType::LongBreak,
                duration_seconds: long_break * 60,
                label: "長い休憩".to_string(),
            },
        }
    }

    /// Returns the entry for a session type.
    pub fn entry(&self, session_type: SessionType) -> &SessionConfigEntry {
        match session_type {
            SessionType::Work => &self.work,
            SessionType::ShortBreak => &self.short_break,
            SessionType::LongBreak => &self.long_break,
        }
    }

    /// Full duration of a session type in seconds.
    pub fn duration_seconds(&self, session_type: SessionType) -> u32 {
        self.entry(session_type).duration_seconds
    }

    /// Full duration of a session type in whole minutes.
    pub fn duration_minutes(&self, session_type: SessionType) -> u32 {
        self.duration_seconds(session_type).div_ceil(60)
    }

    /// Display label of a session type.
    pub fn label(&self, session_type: SessionType) -> &str {
        &self.entry(session_type).label
    }

    /// Picks the session that follows `finished`.
    ///
    /// `completed_work_sessions` is the count including the session that just
    /// finished, so the fourth work session is followed by a long break.
    pub fn next_type(finished: SessionType, completed_work_sessions: u32) -> SessionType {
        match finished {
            SessionType::Work
                if completed_work_sessions > 0
                    && completed_work_sessions % SESSIONS_PER_LONG_BREAK == 0 =>
            {
                SessionType::LongBreak
            }
            SessionType::Work => SessionType::ShortBreak,
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
        }
    }

    /// Validates the configured durations.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        let work = self.work.duration_seconds / 60;
        let short_break = self.short_break.duration_seconds / 60;
        let long_break = self.long_break.duration_seconds / 60;

        if !(1..=120).contains(&work) {
            return Err("作業時間は1-120分の範囲で指定してください".to_string());
        }
        if !(1..=60).contains(&short_break) {
            return Err("休憩時間は1-60分の範囲で指定してください".to_string());
        }
        if !(1..=60).contains(&long_break) {
            return Err("長い休憩時間は1-60分の範囲で指定してください".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// Point-in-time copy of the authority's countdown state.
///
/// The scheduling handle is held by the authority itself and is never part of
/// a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Whether the countdown is ticking
    pub running: bool,
    /// Seconds left in the current session
    pub time_remaining_seconds: u32,
    /// Type of the current session
    pub current_type: SessionType,
    /// Work sessions completed since the last history clear
    pub completed_work_sessions: u32,
}

impl TimerState {
    /// Creates an idle state positioned at the start of a work session.
    pub fn idle(config: &SessionConfig) -> Self {
        Self {
            running: false,
            time_remaining_seconds: config.duration_seconds(SessionType::Work),
            current_type: SessionType::Work,
            completed_work_sessions: 0,
        }
    }

    /// Position inside the current four-session cycle.
    pub fn cycle_position(&self) -> u32 {
        self.completed_work_sessions % SESSIONS_PER_LONG_BREAK
    }

    /// Fields written to durable storage.
    pub fn to_persisted(&self) -> PersistedTimer {
        PersistedTimer {
            current_type: self.current_type,
            time_remaining_seconds: i64::from(self.time_remaining_seconds),
            completed_work_sessions: self.completed_work_sessions,
        }
    }
}

/// Durable subset of [`TimerState`].
///
/// Each field decodes on its own: a missing or malformed field takes its
/// default (`work`, `0`, `0`) while the others are kept. A zero residual is
/// replaced by the full duration on restore.
///
/// `time_remaining_seconds` is signed so that out-of-range values written by
/// older builds or by hand still parse and can be rejected on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTimer {
    #[serde(default, deserialize_with = "field_or_default")]
    pub current_type: SessionType,
    #[serde(default, deserialize_with = "field_or_default")]
    pub time_remaining_seconds: i64,
    #[serde(default, deserialize_with = "field_or_default")]
    pub completed_work_sessions: u32,
}

/// Decodes one snapshot field, substituting the default on a type mismatch.
fn field_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "保存されたフィールドが不正なため既定値を使用します");
        T::default()
    }))
}

impl PersistedTimer {
    /// Rebuilds an idle state, falling back to the full configured duration
    /// when the stored residual is not usable.
    pub fn restore(&self, config: &SessionConfig) -> TimerState {
        let full = config.duration_seconds(self.current_type);
        let remaining = match u32::try_from(self.time_remaining_seconds) {
            Ok(secs) if secs > 0 && secs <= full => secs,
            _ => {
                tracing::warn!(
                    stored = self.time_remaining_seconds,
                    "保存された残り時間が不正なため既定値を使用します"
                );
                full
            }
        };

        TimerState {
            running: false,
            time_remaining_seconds: remaining,
            current_type: self.current_type,
            completed_work_sessions: self.completed_work_sessions,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
