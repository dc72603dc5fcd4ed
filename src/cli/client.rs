//! IPC Client for communicating with the focus timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling
//! - Event streaming for `watch`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::cli::commands::StartArgs;
use crate::config::AppPaths;
use crate::types::{IpcRequest, IpcResponse, SessionType, StartParams, StatsPeriod, SyncEvent};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (256KB)
const MAX_RESPONSE_SIZE: u64 = 262_144;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

const NOT_RUNNING: &str = "Daemonに接続できません。'focus-timer daemon' を起動してください";

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    pub fn new() -> Result<Self> {
        let paths = AppPaths::resolve()?;
        Ok(Self::with_socket_path(paths.socket_path()))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Sends a start command to the daemon.
    pub async fn start(&self, args: &StartArgs) -> Result<IpcResponse> {
        let params = StartParams {
            duration_seconds: args.minutes.map(|m| m * 60),
            session_type: args.session_type.map(SessionType::from),
            completed_work_sessions: None,
        };
        self.send_request_with_retry(&IpcRequest::Start { params })
            .await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause).await
    }

    /// Sends a reset command to the daemon.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset).await
    }

    /// Sends a skip command to the daemon.
    pub async fn skip(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Skip).await
    }

    /// Stages another session type.
    pub async fn switch(&self, session_type: SessionType) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Switch { session_type })
            .await
    }

    /// Queries the authority's snapshot.
    pub async fn state(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::State).await
    }

    /// Fetches the most recent history records.
    pub async fn history(&self, limit: usize) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::History { limit: Some(limit) })
            .await
    }

    /// Fetches statistics for a period.
    pub async fn stats(&self, period: StatsPeriod) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Stats { period })
            .await
    }

    /// Deletes every history record.
    pub async fn clear_history(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::ClearHistory)
            .await
    }

    /// Attaches as a listener; the first event is a state snapshot.
    pub async fn subscribe(&self) -> Result<EventStream> {
        let mut stream = self.connect().await?;
        self.write_request(&mut stream, &IpcRequest::Subscribe)
            .await?;

        Ok(EventStream {
            lines: BufReader::new(stream).lines(),
        })
    }

    /// Sends a request to the daemon with retry logic.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is::<Rejected>() => return Err(e),
                Err(e) => {
                    tracing::warn!("リクエスト失敗 (試行 {}/{}): {}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!(NOT_RUNNING)))
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = self.connect().await?;
        self.write_request(&mut stream, request).await?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream)
                .take(MAX_RESPONSE_SIZE)
                .read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")?;

        // The daemon refused the command; retrying would not help
        if !response.is_success() {
            return Err(Rejected {
                message: response.message,
                tag: response.error,
            }
            .into());
        }

        Ok(response)
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context(NOT_RUNNING)
    }

    /// Writes one request line and closes the write side.
    async fn write_request(&self, stream: &mut UnixStream, request: &IpcRequest) -> Result<()> {
        let mut request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;
        request_json.push(b'\n');

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;
        Ok(())
    }
}

/// Error response returned by the daemon.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Rejected {
    pub message: String,
    /// Machine-readable tag such as `invalid_duration`
    pub tag: Option<String>,
}

// ============================================================================
// EventStream
// ============================================================================

/// Live events from a `subscribe` connection.
pub struct EventStream {
    lines: Lines<BufReader<UnixStream>>,
}

impl EventStream {
    /// Waits for the next event; `None` once the daemon closes the stream.
    pub async fn next(&mut self) -> Result<Option<SyncEvent>> {
        let Some(line) = self
            .lines
            .next_line()
            .await
            .context("イベントの受信に失敗しました")?
        else {
            return Ok(None);
        };

        let event = serde_json::from_str(&line).context("イベントのパースに失敗しました")?;
        Ok(Some(event))
    }
}

// ============================================================================
// Tests
// ============================================================================
