//! Session history records and statistics summaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SessionType;
use crate::clock::date_key_for;

// ============================================================================
// SessionRecord
// ============================================================================

/// One completed session as stored in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Type of the finished session
    pub session_type: SessionType,
    /// Configured length of the session in minutes
    pub duration_minutes: u32,
    /// Epoch milliseconds at which the session started
    pub start_timestamp: i64,
    /// Epoch milliseconds at which the session ended
    pub end_timestamp: i64,
    /// Local `YYYY-MM-DD` of `end_timestamp`
    pub calendar_date_key: String,
}

impl SessionRecord {
    /// Creates a record, deriving the calendar key from `end_timestamp`.
    ///
    /// Timestamps are stored as given, even if `start_timestamp` is not
    /// before `end_timestamp`.
    pub fn new(
        session_type: SessionType,
        duration_minutes: u32,
        start_timestamp: i64,
        end_timestamp: i64,
    ) -> Self {
        Self {
            session_type,
            duration_minutes,
            start_timestamp,
            end_timestamp,
            calendar_date_key: date_key_for(end_timestamp),
        }
    }

    /// Builds the record for a session that just ended at `end_timestamp`.
    pub fn ending_at(session_type: SessionType, duration_minutes: u32, end_timestamp: i64) -> Self {
        let start = end_timestamp - i64::from(duration_minutes) * 60_000;
        Self::new(session_type, duration_minutes, start, end_timestamp)
    }

    /// Returns true when the timestamps are ordered.
    pub fn is_well_ordered(&self) -> bool {
        self.start_timestamp < self.end_timestamp
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Window a statistics summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    /// Records whose calendar key is today
    #[default]
    Today,
    /// Records started within the last seven days
    Week,
    /// Every stored record
    All,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Today => "today",
            StatsPeriod::Week => "week",
            StatsPeriod::All => "all",
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(StatsPeriod::Today),
            "week" => Ok(StatsPeriod::Week),
            "all" => Ok(StatsPeriod::All),
            other => Err(format!("不明な期間です: {} (today, week, all)", other)),
        }
    }
}

/// Aggregated numbers for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub period: StatsPeriod,
    pub total_focus_minutes: u32,
    pub session_count: u32,
    /// Consecutive days with work sessions, over the whole history
    pub streak: u32,
}

/// Today's work sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayProgress {
    pub work_sessions: u32,
    pub focus_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ending_at_derives_start() {
        let record = SessionRecord::ending_at(SessionType::Work, 25, 1_700_000_000_000);
        assert_eq!(record.start_timestamp, 1_700_000_000_000 - 25 * 60_000);
        assert!(record.is_well_ordered());
        assert_eq!(record.calendar_date_key, date_key_for(1_700_000_000_000));
    }

    #[test]
    fn test_clock_anomaly_is_stored_as_given() {
        let record = SessionRecord::new(SessionType::Work, 25, 2_000, 1_000);
        assert!(!record.is_well_ordered());
        assert_eq!(record.start_timestamp, 2_000);
        assert_eq!(record.end_timestamp, 1_000);
    }

    #[test]
    fn test_record_wire_format() {
        let record = SessionRecord {
            session_type: SessionType::ShortBreak,
            duration_minutes: 5,
            start_timestamp: 1,
            end_timestamp: 2,
            calendar_date_key: "2026-03-01".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sessionType"], "shortBreak");
        assert_eq!(json["durationMinutes"], 5);
        assert_eq!(json["calendarDateKey"], "2026-03-01");
    }

    #[test]
    fn test_stats_period_parse() {
        assert_eq!("week".parse::<StatsPeriod>(), Ok(StatsPeriod::Week));
        assert!("month".parse::<StatsPeriod>().is_err());
        assert_eq!(StatsPeriod::default(), StatsPeriod::Today);
    }
}
