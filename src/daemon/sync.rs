//! Push channel between the authority and attached listeners.
//!
//! Delivery is best-effort by construction:
//! - publishing with no listener attached silently drops the event
//! - a listener attached after an event never sees it (no replay)
//! - a listener that falls too far behind skips the oldest events
//!
//! A listener that (re)attaches resynchronizes from a state snapshot, never
//! from past ticks.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::types::SyncEvent;

/// Events buffered per listener before the oldest are skipped.
const LISTENER_CAPACITY: usize = 64;

/// Fan-out of authority events to any number of listeners.
#[derive(Debug, Clone)]
pub struct SyncChannel {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for SyncChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncChannel {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(LISTENER_CAPACITY);
        Self { tx }
    }

    /// Sends an event to every attached listener.
    ///
    /// Returns how many listeners it was queued for; zero is not an error.
    pub fn publish(&self, event: SyncEvent) -> usize {
        match self.tx.send(event) {
            Ok(listeners) => listeners,
            Err(_) => {
                tracing::trace!("リスナーがいないためイベントを破棄しました");
                0
            }
        }
    }

    /// Attaches a new listener.
    pub fn subscribe(&self) -> SyncListener {
        SyncListener {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving end of a [`SyncChannel`]; dropping it detaches.
#[derive(Debug)]
pub struct SyncListener {
    rx: broadcast::Receiver<SyncEvent>,
}

impl SyncListener {
    /// Waits for the next event; `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<SyncEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "リスナーが遅延したためイベントを読み飛ばしました");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next queued event without waiting.
    pub fn try_next(&mut self) -> Option<SyncEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "リスナーが遅延したためイベントを読み飛ばしました");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
