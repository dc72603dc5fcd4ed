//! Clock capability.
//!
//! Everything that reads wall-clock time goes through [`Clock`] so that
//! history and statistics can be tested against a fixed instant.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

/// Format of calendar date keys (`YYYY-MM-DD`).
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;

    /// Calendar date key of the current local day.
    fn today(&self) -> String {
        date_key_for(self.now_millis())
    }
}

/// Wall clock in the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Local::now().timestamp_millis()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now_millis: i64,
}

impl FixedClock {
    pub fn new(now_millis: i64) -> Self {
        Self { now_millis }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now_millis
    }
}

/// Local calendar date key of an epoch-millisecond timestamp.
///
/// Timestamps the local zone cannot represent fall back to UTC.
pub fn date_key_for(millis: i64) -> String {
    let local = Local.timestamp_millis_opt(millis).earliest();
    match local {
        Some(dt) => dt.format(DATE_KEY_FORMAT).to_string(),
        None => DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.format(DATE_KEY_FORMAT).to_string())
            .unwrap_or_else(|| "0000-00-00".to_string()),
    }
}

/// Parses a calendar date key.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Formats a date as a calendar key.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Local epoch milliseconds of noon on the given date.
///
/// Handy for building timestamps that land on a known calendar key.
pub fn local_noon_millis(date: NaiveDate) -> Option<i64> {
    let noon = date.and_hms_opt(12, 0, 0)?;
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}
