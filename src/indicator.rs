//! Always-visible status indicator.
//!
//! This module handles:
//! - Generating the indicator label (e.g., "🍅 25")
//! - Choosing the color class for work vs. break sessions
//! - Publishing the indicator to a status file that shell prompts, tmux
//!   status lines or menu bar scripts can poll
//!
//! Label generation is platform-independent and fully testable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::types::SessionType;

// ============================================================================
// Constants
// ============================================================================

/// Emoji for work session
const WORKING_EMOJI: &str = "🍅";

/// Emoji for break session
const BREAK_EMOJI: &str = "☕";

// ============================================================================
// IndicatorColor
// ============================================================================

/// Color class of the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorColor {
    /// Work session (green)
    Focus,
    /// Either break (blue)
    Rest,
}

impl IndicatorColor {
    /// Color class for a session type.
    pub fn for_session(session_type: SessionType) -> Self {
        if session_type.is_work() {
            IndicatorColor::Focus
        } else {
            IndicatorColor::Rest
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorColor::Focus => "focus",
            IndicatorColor::Rest => "rest",
        }
    }

    /// Hex color for renderers that want one.
    pub fn hex(&self) -> &'static str {
        match self {
            IndicatorColor::Focus => "#22c55e",
            IndicatorColor::Rest => "#3b82f6",
        }
    }
}

/// Remaining time rounded up to whole minutes.
pub fn remaining_minutes(remaining_seconds: u32) -> u32 {
    remaining_seconds.div_ceil(60)
}

/// Generates the indicator text.
///
/// Format:
/// - Work: "🍅 25"
/// - Short/long break: "☕ 5"
pub fn indicator_label(session_type: SessionType, remaining_seconds: u32) -> String {
    let emoji = if session_type.is_work() {
        WORKING_EMOJI
    } else {
        BREAK_EMOJI
    };
    format!("{} {}", emoji, remaining_minutes(remaining_seconds))
}

// ============================================================================
// Indicator
// ============================================================================

/// Errors from indicator backends.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("インジケーターの更新に失敗しました: {0}")]
    Write(#[source] io::Error),

    #[error("インジケーターが利用できません")]
    Unavailable,
}

/// External status glyph capability.
///
/// Failures are reported to the caller, which logs and moves on; the next
/// tick re-attempts naturally.
pub trait Indicator: Send + Sync {
    fn set_indicator(&self, text: &str, color: IndicatorColor) -> Result<(), IndicatorError>;

    fn clear_indicator(&self) -> Result<(), IndicatorError>;
}

/// Writes the indicator to a small text file.
///
/// The file holds the label on the first line and the color hex on the
/// second. Clearing removes the file.
#[derive(Debug, Clone)]
pub struct FileIndicator {
    path: PathBuf,
}

impl FileIndicator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Indicator for FileIndicator {
    fn set_indicator(&self, text: &str, color: IndicatorColor) -> Result<(), IndicatorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(IndicatorError::Write)?;
        }
        fs::write(&self.path, format!("{}\n{}\n", text, color.hex()))
            .map_err(IndicatorError::Write)
    }

    fn clear_indicator(&self) -> Result<(), IndicatorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IndicatorError::Write(e)),
        }
    }
}

/// One recorded indicator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorCall {
    Set { text: String, color: IndicatorColor },
    Clear,
}

/// Mock indicator for testing.
#[derive(Debug, Default)]
pub struct MockIndicator {
    calls: Mutex<Vec<IndicatorCall>>,
    should_fail: AtomicBool,
}

impl MockIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<IndicatorCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent call, if any.
    #[must_use]
    pub fn last_call(&self) -> Option<IndicatorCall> {
        self.calls().last().cloned()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, call: IndicatorCall) -> Result<(), IndicatorError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(IndicatorError::Unavailable);
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        Ok(())
    }
}

impl Indicator for MockIndicator {
    fn set_indicator(&self, text: &str, color: IndicatorColor) -> Result<(), IndicatorError> {
        self.record(IndicatorCall::Set {
            text: text.to_string(),
            color,
        })
    }

    fn clear_indicator(&self) -> Result<(), IndicatorError> {
        self.record(IndicatorCall::Clear)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Label Tests
    // ------------------------------------------------------------------------

    mod label_tests {
        use super::*;

        #[test]
        fn test_remaining_minutes_rounds_up() {
            assert_eq!(remaining_minutes(0), 0);
            assert_eq!(remaining_minutes(1), 1);
            assert_eq!(remaining_minutes(60), 1);
            assert_eq!(remaining_minutes(61), 2);
            assert_eq!(remaining_minutes(1500), 25);
            assert_eq!(remaining_minutes(1499), 25);
        }

        #[test]
        fn test_work_label() {
            assert_eq!(indicator_label(SessionType::Work, 1500), "🍅 25");
        }

        #[test]
        fn test_break_label() {
            assert_eq!(indicator_label(SessionType::ShortBreak, 299), "☕ 5");
            assert_eq!(indicator_label(SessionType::LongBreak, 30), "☕ 1");
        }

        #[test]
        fn test_color_for_session() {
            assert_eq!(
                IndicatorColor::for_session(SessionType::Work),
                IndicatorColor::Focus
            );
            assert_eq!(
                IndicatorColor::for_session(SessionType::LongBreak),
                IndicatorColor::Rest
            );
            assert_eq!(IndicatorColor::Focus.hex(), "#22c55e");
            assert_eq!(IndicatorColor::Rest.as_str(), "rest");
        }
    }

    // ------------------------------------------------------------------------
    // FileIndicator Tests
    // ------------------------------------------------------------------------

    mod file_indicator_tests {
        use super::*;

        #[test]
        fn test_set_writes_label_and_color() {
            let dir = tempfile::tempdir().unwrap();
            let indicator = FileIndicator::new(dir.path().join("indicator"));

            indicator
                .set_indicator("🍅 25", IndicatorColor::Focus)
                .unwrap();

            let content = fs::read_to_string(indicator.path()).unwrap();
            assert_eq!(content, "🍅 25\n#22c55e\n");
        }

        #[test]
        fn test_clear_removes_file() {
            let dir = tempfile::tempdir().unwrap();
            let indicator = FileIndicator::new(dir.path().join("indicator"));

            indicator.set_indicator("☕ 5", IndicatorColor::Rest).unwrap();
            indicator.clear_indicator().unwrap();

            assert!(!indicator.path().exists());
        }

        #[test]
        fn test_clear_without_file_is_ok() {
            let dir = tempfile::tempdir().unwrap();
            let indicator = FileIndicator::new(dir.path().join("indicator"));
            assert!(indicator.clear_indicator().is_ok());
        }
    }

    // ------------------------------------------------------------------------
    // MockIndicator Tests
    // ------------------------------------------------------------------------

    mod mock_indicator_tests {
        use super::*;

        #[test]
        fn test_records_calls_in_order() {
            let mock = MockIndicator::new();
            mock.set_indicator("🍅 3", IndicatorColor::Focus).unwrap();
            mock.clear_indicator().unwrap();

            assert_eq!(
                mock.calls(),
                vec![
                    IndicatorCall::Set {
                        text: "🍅 3".to_string(),
                        color: IndicatorColor::Focus
                    },
                    IndicatorCall::Clear,
                ]
            );
            assert_eq!(mock.last_call(), Some(IndicatorCall::Clear));
        }

        #[test]
        fn test_failure_is_reported_and_not_recorded() {
            let mock = MockIndicator::new();
            mock.set_should_fail(true);
            assert!(mock.clear_indicator().is_err());
            assert!(mock.calls().is_empty());
        }
    }
}
