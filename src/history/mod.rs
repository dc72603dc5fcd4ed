//! Session history and statistics.
//!
//! - `store`: the durable, newest-first log of completed sessions
//! - `stats`: pure aggregation over a slice of records

pub mod stats;
pub mod store;

pub use stats::{session_count, streak, summarize, today_progress, total_focus_minutes};
pub use store::{HistoryError, SessionHistoryStore, HISTORY_KEY, MAX_RECORDS};
