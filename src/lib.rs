//! Focus timer library
//!
//! A countdown timer whose authority lives in a long-running daemon while a
//! transient CLI displays and controls it. It includes:
//! - Timer authority with tick scheduling and push events
//! - IPC server/client for daemon-CLI communication
//! - Session history and statistics
//! - Capabilities for alerts, the status indicator and durable storage
//! - LaunchAgent management for auto-start at login (macOS)

pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod history;
pub mod indicator;
pub mod launchagent;
pub mod notify;
pub mod storage;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppPaths;
pub use daemon::{Capabilities, SyncChannel, TimerAuthority};
pub use history::SessionHistoryStore;
pub use indicator::{FileIndicator, Indicator, MockIndicator};
pub use notify::{AlertNotifier, MockNotifier, Notifier};
pub use storage::{JsonFileStorage, MemoryStorage, SnapshotStorage};
pub use types::{
    CommandError, IpcRequest, IpcResponse, ResponseData, SessionConfig, SessionRecord,
    SessionType, StartParams, StatsPeriod, StatsSummary, SyncEvent, TimerState,
};
