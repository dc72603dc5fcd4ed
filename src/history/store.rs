//! Durable log of completed sessions.

use std::sync::Arc;

use thiserror::Error;

use crate::storage::{load_typed, persist_typed, SnapshotStorage, StorageError};
use crate::types::SessionRecord;

/// Storage key of the history log.
pub const HISTORY_KEY: &str = "sessions";

/// Records kept before the oldest are evicted.
pub const MAX_RECORDS: usize = 100;

/// Errors raised by the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The in-memory change was applied but could not be made durable.
    #[error("履歴を保存できませんでした: {0}")]
    Persist(#[from] StorageError),
}

/// Newest-first list of at most [`MAX_RECORDS`] completed sessions.
pub struct SessionHistoryStore {
    records: Vec<SessionRecord>,
    storage: Arc<dyn SnapshotStorage>,
}

impl SessionHistoryStore {
    /// Loads the stored history; missing or malformed data yields an empty log.
    pub fn load(storage: Arc<dyn SnapshotStorage>) -> Self {
        let mut records: Vec<SessionRecord> =
            load_typed(storage.as_ref(), HISTORY_KEY).unwrap_or_default();

        if records.len() > MAX_RECORDS {
            tracing::debug!(count = records.len(), "履歴の上限を超えた分を切り詰めます");
            records.truncate(MAX_RECORDS);
        }
        tracing::debug!(count = records.len(), "履歴を読み込みました");

        Self { records, storage }
    }

    /// Inserts `record` at the head, evicts past the cap, then persists.
    ///
    /// The record is kept in memory even when `Err` is returned; only
    /// durability failed.
    pub fn append(&mut self, record: SessionRecord) -> Result<(), HistoryError> {
        if !record.is_well_ordered() {
            tracing::debug!(
                start = record.start_timestamp,
                end = record.end_timestamp,
                "開始時刻が終了時刻以降の記録をそのまま保存します"
            );
        }

        self.records.insert(0, record);
        self.records.truncate(MAX_RECORDS);
        self.persist()
    }

    /// Removes every record and persists the empty log.
    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.records.clear();
        self.persist()
    }

    /// The `n` most recent records, newest first.
    pub fn recent(&self, n: usize) -> &[SessionRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Records whose calendar key equals `date_key`.
    pub fn filter_by_date_key(&self, date_key: &str) -> Vec<SessionRecord> {
        self.records
            .iter()
            .filter(|r| r.calendar_date_key == date_key)
            .cloned()
            .collect()
    }

    /// Records that started at or after `timestamp` (epoch milliseconds).
    pub fn filter_since(&self, timestamp: i64) -> Vec<SessionRecord> {
        self.records
            .iter()
            .filter(|r| r.start_timestamp >= timestamp)
            .cloned()
            .collect()
    }

    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> Result<(), HistoryError> {
        persist_typed(self.storage.as_ref(), HISTORY_KEY, &self.records)?;
        Ok(())
    }
}
