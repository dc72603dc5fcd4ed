//! Daemon module for the focus timer.
//!
//! This module contains the authority process:
//! - `timer`: the timer authority and its capabilities
//! - `tick`: one-second tick scheduling with cancellable handles
//! - `sync`: push channel to attached listeners
//! - `recorder`: the history owner listening for completions
//! - `ipc`: Unix socket server and request handling
//! - `server`: process wiring and the accept loop

pub mod ipc;
pub mod recorder;
pub mod server;
pub mod sync;
pub mod tick;
pub mod timer;

pub use ipc::{IpcServer, RequestHandler};
pub use recorder::{HistoryRecorder, SharedAuthority, SharedHistory};
pub use server::{run, serve, DaemonOptions};
pub use sync::{SyncChannel, SyncListener};
pub use tick::{IntervalScheduler, ManualScheduler, TickHandle, TickScheduler, TickSignal};
pub use timer::{Capabilities, TickOutcome, TimerAuthority};
