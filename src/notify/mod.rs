//! Session-end alerts.
//!
//! This module provides the `notify` capability the timer authority invokes
//! when a session runs out:
//!
//! - `Notifier`: the capability trait
//! - `AlertNotifier`: hands alerts to a dedicated thread that logs the alert
//!   text and plays a sound, so `notify` never blocks the authority
//! - `MockNotifier`: records calls for tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  crossbeam   ┌──────────────────┐
//! │  TimerAuthority  │─────────────▶│   alert thread   │
//! │  (tokio task)    │ SessionType  │ RodioSoundPlayer │
//! └──────────────────┘              └──────────────────┘
//! ```

mod content;
mod error;
mod sound;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

pub use content::AlertContent;
pub use error::NotifyError;
pub use sound::{tone_frequency, RodioSoundPlayer, SoundSource};

use crate::types::SessionType;

/// Trait for delivering a session-end alert.
///
/// Implementations must return quickly; delivery is best-effort.
pub trait Notifier: Send + Sync {
    /// Alerts that a session of `finished` type ended.
    fn notify(&self, finished: SessionType) -> Result<(), NotifyError>;
}

// ============================================================================
// AlertNotifier
// ============================================================================

/// Notifier backed by a background alert thread.
pub struct AlertNotifier {
    tx: Sender<SessionType>,
}

impl AlertNotifier {
    /// Starts the alert thread.
    ///
    /// With `sound_enabled == false` alerts are only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(sound_enabled: bool) -> Result<Self, NotifyError> {
        let (tx, rx) = crossbeam_channel::unbounded();

        thread::Builder::new()
            .name("focus-timer-alert".to_string())
            .spawn(move || alert_loop(rx, sound_enabled))
            .map_err(NotifyError::Spawn)?;

        Ok(Self { tx })
    }
}

impl Notifier for AlertNotifier {
    fn notify(&self, finished: SessionType) -> Result<(), NotifyError> {
        self.tx.send(finished).map_err(|_| NotifyError::Disconnected)
    }
}

/// Runs until every sender is dropped.
fn alert_loop(rx: Receiver<SessionType>, sound_enabled: bool) {
    let player = if sound_enabled {
        match RodioSoundPlayer::new() {
            Ok(player) => Some(player),
            Err(e) => {
                tracing::warn!("サウンドなしで通知します: {}", e);
                None
            }
        }
    } else {
        None
    };

    for finished in rx.iter() {
        let content = AlertContent::for_session(finished);
        tracing::info!(session = %finished, "{} {}", content.title, content.body);

        if let Some(player) = &player {
            let source = SoundSource::for_session(finished);
            if let Err(e) = player.play(&source, tone_frequency(finished)) {
                tracing::warn!("通知音の再生に失敗しました: {}", e);
            }
        }
    }

    tracing::debug!("通知スレッドを終了します");
}

// ============================================================================
// MockNotifier
// ============================================================================

/// Mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockNotifier {
    calls: Mutex<Vec<SessionType>>,
    should_fail: AtomicBool,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SessionType> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn notify_count(&self) -> usize {
        self.calls().len()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, finished: SessionType) -> Result<(), NotifyError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Failed("Mock failure".to_string()));
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(finished);
        Ok(())
    }
}
