//! Statistics over session records.
//!
//! Every function here is pure; only Work records count toward focus time,
//! session counts and streaks.

use chrono::Duration;

use crate::clock::{format_date_key, parse_date_key, Clock};
use crate::types::{SessionRecord, StatsPeriod, StatsSummary, TodayProgress};

const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

fn work_records(records: &[SessionRecord]) -> impl Iterator<Item = &SessionRecord> {
    records.iter().filter(|r| r.session_type.is_work())
}

/// Sum of `duration_minutes` over Work records.
pub fn total_focus_minutes(records: &[SessionRecord]) -> u32 {
    work_records(records).fold(0u32, |total, r| total.saturating_add(r.duration_minutes))
}

/// Number of Work records.
pub fn session_count(records: &[SessionRecord]) -> u32 {
    u32::try_from(work_records(records).count()).unwrap_or(u32::MAX)
}

/// Consecutive days with at least one Work record, walking back from `today`.
///
/// A day without work stops the walk, except `today` itself: no session yet
/// today keeps yesterday's streak alive.
pub fn streak(records: &[SessionRecord], today: &str) -> u32 {
    let Some(today) = parse_date_key(today) else {
        tracing::warn!(today, "日付キーを解釈できません");
        return 0;
    };

    let mut streak = 0;
    let mut offset = 0;
    loop {
        let Some(day) = today.checked_sub_signed(Duration::days(offset)) else {
            break;
        };
        let key = format_date_key(day);
        let worked = work_records(records).any(|r| r.calendar_date_key == key);

        if worked {
            streak += 1;
        } else if offset > 0 {
            break;
        }
        offset += 1;
    }
    streak
}

/// Summary for `period`; the streak always spans every record.
pub fn summarize(records: &[SessionRecord], period: StatsPeriod, clock: &dyn Clock) -> StatsSummary {
    let today = clock.today();
    let in_period: Vec<SessionRecord> = match period {
        StatsPeriod::Today => records
            .iter()
            .filter(|r| r.calendar_date_key == today)
            .cloned()
            .collect(),
        StatsPeriod::Week => {
            let since = clock.now_millis() - WEEK_MILLIS;
            records
                .iter()
                .filter(|r| r.start_timestamp >= since)
                .cloned()
                .collect()
        }
        StatsPeriod::All => records.to_vec(),
    };

    StatsSummary {
        period,
        total_focus_minutes: total_focus_minutes(&in_period),
        session_count: session_count(&in_period),
        streak: streak(records, &today),
    }
}

/// Today's Work sessions and minutes.
pub fn today_progress(records: &[SessionRecord], today: &str) -> TodayProgress {
    let todays: Vec<SessionRecord> = records
        .iter()
        .filter(|r| r.calendar_date_key == today)
        .cloned()
        .collect();

    TodayProgress {
        work_sessions: session_count(&todays),
        focus_minutes: total_focus_minutes(&todays),
    }
}
