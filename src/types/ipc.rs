//! IPC wire types shared by the daemon and the CLI.

use serde::{Deserialize, Serialize};

use super::{SessionRecord, SessionType, StatsPeriod, StatsSummary, TimerState, TodayProgress};

// ============================================================================
// Requests
// ============================================================================

/// Parameters for the start command.
///
/// Every field is optional; the daemon fills gaps from its own state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    /// Countdown length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Session type to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<SessionType>,
    /// Completed work sessions the caller believes in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_work_sessions: Option<u32>,
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum IpcRequest {
    /// Start (or resume) a countdown
    Start {
        #[serde(flatten)]
        params: StartParams,
    },
    /// Stop ticking, keep the remaining time
    Pause,
    /// Stop ticking and restore the full duration
    Reset,
    /// End the current session early
    Skip,
    /// Stage a different session type without starting it
    Switch {
        #[serde(rename = "sessionType")]
        session_type: SessionType,
    },
    /// Query the authority's current snapshot
    State,
    /// Attach as a push listener
    Subscribe,
    /// Most recent history records
    History {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    /// Aggregated statistics
    Stats {
        #[serde(default)]
        period: StatsPeriod,
    },
    /// Delete every history record and zero the work counter
    ClearHistory,
}

// ============================================================================
// Responses
// ============================================================================

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Authority snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TimerState>,
    /// History records, newest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionRecord>>,
    /// Statistics summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSummary>,
    /// Today's work progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today: Option<TodayProgress>,
}

impl ResponseData {
    /// Creates response data carrying only a snapshot.
    pub fn from_timer_state(state: TimerState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Machine-readable rejection tag (errors only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            error: None,
            data,
        }
    }

    /// Creates an error response without a tag.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            error: None,
            data: None,
        }
    }

    /// Creates a tagged rejection for a command the daemon refused.
    pub fn rejected(err: &CommandError) -> Self {
        Self {
            status: "error".to_string(),
            message: err.to_string(),
            error: Some(err.tag().to_string()),
            data: None,
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// CommandError
// ============================================================================

/// Reasons the daemon rejects a command.
///
/// Rejections are reported to the caller and never affect the running timer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The request could not be parsed as a known command
    #[error("不明なコマンドです: {0}")]
    UnknownCommand(String),

    /// The requested duration is zero or longer than the configured session
    #[error("無効な時間です: {seconds}秒 ({session_type}は1-{max}秒)")]
    InvalidDuration {
        seconds: u32,
        max: u32,
        session_type: SessionType,
    },
}

impl CommandError {
    /// Wire tag sent in the `error` field.
    pub fn tag(&self) -> &'static str {
        match self {
            CommandError::UnknownCommand(_) => "unknown_command",
            CommandError::InvalidDuration { .. } => "invalid_duration",
        }
    }
}

// ============================================================================
// SyncEvent
// ============================================================================

/// Push event streamed to attached listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SyncEvent {
    /// Snapshot sent once when a listener attaches
    State(TimerState),
    /// One second elapsed
    #[serde(rename_all = "camelCase")]
    Tick {
        time_remaining_seconds: u32,
        running: bool,
    },
    /// A session ran out (or was skipped)
    #[serde(rename_all = "camelCase")]
    SessionComplete { session_type: SessionType },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // IpcRequest Tests
    // ------------------------------------------------------------------------

    mod request_tests {
        use super::*;

        #[test]
        fn test_start_request_wire_format() {
            let request = IpcRequest::Start {
                params: StartParams {
                    duration_seconds: Some(1500),
                    session_type: Some(SessionType::Work),
                    completed_work_sessions: Some(2),
                },
            };
            let json = serde_json::to_value(&request).unwrap();
            assert_eq!(json["command"], "start");
            assert_eq!(json["durationSeconds"], 1500);
            assert_eq!(json["sessionType"], "work");
            assert_eq!(json["completedWorkSessions"], 2);
        }

        #[test]
        fn test_start_request_without_params() {
            let request: IpcRequest = serde_json::from_str(r#"{"command":"start"}"#).unwrap();
            assert_eq!(
                request,
                IpcRequest::Start {
                    params: StartParams::default()
                }
            );
        }

        #[test]
        fn test_unit_commands() {
            for (json, expected) in [
                (r#"{"command":"pause"}"#, IpcRequest::Pause),
                (r#"{"command":"reset"}"#, IpcRequest::Reset),
                (r#"{"command":"skip"}"#, IpcRequest::Skip),
                (r#"{"command":"state"}"#, IpcRequest::State),
                (r#"{"command":"subscribe"}"#, IpcRequest::Subscribe),
                (r#"{"command":"clearHistory"}"#, IpcRequest::ClearHistory),
            ] {
                let parsed: IpcRequest = serde_json::from_str(json).unwrap();
                assert_eq!(parsed, expected);
            }
        }

        #[test]
        fn test_stats_period_defaults_to_today() {
            let request: IpcRequest = serde_json::from_str(r#"{"command":"stats"}"#).unwrap();
            assert_eq!(
                request,
                IpcRequest::Stats {
                    period: StatsPeriod::Today
                }
            );
        }

        #[test]
        fn test_switch_request() {
            let request: IpcRequest =
                serde_json::from_str(r#"{"command":"switch","sessionType":"longBreak"}"#).unwrap();
            assert_eq!(
                request,
                IpcRequest::Switch {
                    session_type: SessionType::LongBreak
                }
            );
        }

        #[test]
        fn test_unknown_command_fails_to_parse() {
            let result: Result<IpcRequest, _> = serde_json::from_str(r#"{"command":"explode"}"#);
            assert!(result.is_err());
        }
    }

    // ------------------------------------------------------------------------
    // IpcResponse Tests
    // ------------------------------------------------------------------------

    mod response_tests {
        use super::*;
        use crate::types::SessionConfig;

        #[test]
        fn test_success_response() {
            let state = TimerState::idle(&SessionConfig::default());
            let response =
                IpcResponse::success("ok", Some(ResponseData::from_timer_state(state.clone())));
            assert!(response.is_success());
            assert_eq!(response.data.unwrap().state, Some(state));
        }

        #[test]
        fn test_rejected_response_carries_tag() {
            let response = IpcResponse::rejected(&CommandError::UnknownCommand("x".into()));
            assert!(!response.is_success());
            assert_eq!(response.error.as_deref(), Some("unknown_command"));

            let json = serde_json::to_value(&response).unwrap();
            assert_eq!(json["status"], "error");
            assert_eq!(json["error"], "unknown_command");
        }

        #[test]
        fn test_error_omits_tag_and_data() {
            let json = serde_json::to_value(IpcResponse::error("boom")).unwrap();
            assert!(json.get("error").is_none());
            assert!(json.get("data").is_none());
        }
    }

    // ------------------------------------------------------------------------
    // SyncEvent Tests
    // ------------------------------------------------------------------------

    mod sync_event_tests {
        use super::*;
        use crate::types::SessionConfig;

        #[test]
        fn test_tick_wire_format() {
            let event = SyncEvent::Tick {
                time_remaining_seconds: 42,
                running: true,
            };
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], "tick");
            assert_eq!(json["timeRemainingSeconds"], 42);
            assert_eq!(json["running"], true);
        }

        #[test]
        fn test_session_complete_wire_format() {
            let event = SyncEvent::SessionComplete {
                session_type: SessionType::Work,
            };
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, r#"{"event":"sessionComplete","sessionType":"work"}"#);
        }

        #[test]
        fn test_state_event_round_trip() {
            let event = SyncEvent::State(TimerState::idle(&SessionConfig::default()));
            let json = serde_json::to_string(&event).unwrap();
            let parsed: SyncEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, event);
        }
    }
}
