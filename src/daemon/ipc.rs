//! IPC server for the focus timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer and history commands
//! - Push streaming for `subscribe` connections

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};

use crate::clock::Clock;
use crate::history::{summarize, today_progress};
use crate::types::{
    CommandError, IpcRequest, IpcResponse, ResponseData, StartParams, SyncEvent, TimerState,
};

use super::recorder::{HistoryRecorder, SharedAuthority, SharedHistory};
use super::sync::SyncListener;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

/// Records returned by `history` when no limit is given
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Write error
    #[error("Failed to write response: {0}")]
    WriteError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// The client closed the connection without sending anything
    #[error("Connection closed by client")]
    Closed,

    /// The request is not a known command
    #[error(transparent)]
    Rejected(#[from] CommandError),
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Reads one request (terminated by a newline or end of stream).
    ///
    /// Unparseable input yields `IpcError::Rejected` so that the caller can
    /// answer with an `unknown_command` response.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest, IpcError> {
        let mut line = String::new();
        let mut reader = BufReader::new(&mut *stream).take(MAX_REQUEST_SIZE as u64 + 1);

        let n = match timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            reader.read_line(&mut line),
        )
        .await
        {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string())),
            Err(_) => return Err(IpcError::Timeout),
        };

        if n == 0 {
            return Err(IpcError::Closed);
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge);
        }

        parse_request(line.trim()).map_err(IpcError::from)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Parses a raw request, naming the offending command on failure.
pub fn parse_request(raw: &str) -> Result<IpcRequest, CommandError> {
    serde_json::from_str(raw).map_err(|e| {
        let command = serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(|v| v.get("command").and_then(|c| c.as_str()).map(str::to_string));
        match command {
            Some(command) => CommandError::UnknownCommand(command),
            None => CommandError::UnknownCommand(format!("不正なリクエスト ({})", e)),
        }
    })
}

// ============================================================================
// Connection handling
// ============================================================================

/// Serves one client connection to completion.
///
/// Plain commands get exactly one response. `subscribe` keeps the connection
/// open and streams events until the client goes away.
pub async fn serve_connection(handler: &RequestHandler, mut stream: UnixStream) -> Result<()> {
    let request = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => request,
        Err(IpcError::Rejected(e)) => {
            tracing::warn!("リクエストを拒否しました: {}", e);
            return IpcServer::send_response(&mut stream, &IpcResponse::rejected(&e)).await;
        }
        Err(IpcError::Closed) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    tracing::debug!(?request, "リクエストを受信しました");

    if matches!(request, IpcRequest::Subscribe) {
        let (snapshot, listener) = handler.attach().await;
        return stream_events(&mut stream, snapshot, listener).await;
    }

    let response = handler.handle(request).await;
    IpcServer::send_response(&mut stream, &response).await
}

/// Writes the attach snapshot, then every event, one JSON object per line.
async fn stream_events(
    stream: &mut UnixStream,
    snapshot: TimerState,
    mut listener: SyncListener,
) -> Result<()> {
    write_event(stream, &SyncEvent::State(snapshot)).await?;

    while let Some(event) = listener.next().await {
        if let Err(e) = write_event(stream, &event).await {
            tracing::debug!("購読者が切断しました: {}", e);
            return Ok(());
        }
    }
    Ok(())
}

async fn write_event(stream: &mut UnixStream, event: &SyncEvent) -> Result<(), IpcError> {
    let mut line =
        serde_json::to_vec(event).map_err(|e| IpcError::WriteError(e.to_string()))?;
    line.push(b'\n');
    stream
        .write_all(&line)
        .await
        .map_err(|e| IpcError::WriteError(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| IpcError::WriteError(e.to_string()))
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the authority and history.
pub struct RequestHandler {
    authority: SharedAuthority,
    history: SharedHistory,
    recorder: HistoryRecorder,
    clock: Arc<dyn Clock>,
}

impl RequestHandler {
    pub fn new(
        authority: SharedAuthority,
        history: SharedHistory,
        recorder: HistoryRecorder,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authority,
            history,
            recorder,
            clock,
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start { params } => self.handle_start(params).await,
            IpcRequest::Pause => {
                let state = self.authority.lock().await.pause();
                with_state("タイマーを一時停止しました", state)
            }
            IpcRequest::Reset => {
                let state = self.authority.lock().await.reset();
                with_state("タイマーをリセットしました", state)
            }
            IpcRequest::Skip => {
                let state = self.authority.lock().await.skip();
                with_state("セッションをスキップしました", state)
            }
            IpcRequest::Switch { session_type } => {
                let mut authority = self.authority.lock().await;
                let state = authority.select_type(session_type);
                let label = authority.config().label(session_type).to_string();
                with_state(format!("{}に切り替えました", label), state)
            }
            IpcRequest::State | IpcRequest::Subscribe => {
                let state = self.authority.lock().await.snapshot();
                with_state("", state)
            }
            IpcRequest::History { limit } => self.handle_history(limit).await,
            IpcRequest::Stats { period } => {
                let history = self.history.lock().await;
                let stats = summarize(history.records(), period, self.clock.as_ref());
                let today = today_progress(history.records(), &self.clock.today());
                IpcResponse::success(
                    "",
                    Some(ResponseData {
                        stats: Some(stats),
                        today: Some(today),
                        ..ResponseData::default()
                    }),
                )
            }
            IpcRequest::ClearHistory => {
                let state = self.recorder.clear().await;
                with_state("履歴を削除しました", state)
            }
        }
    }

    /// Attaches a listener together with the snapshot it starts from.
    ///
    /// Both are taken under the authority lock, so no event falls between
    /// the snapshot and the first streamed event.
    pub async fn attach(&self) -> (TimerState, SyncListener) {
        let authority = self.authority.lock().await;
        (authority.snapshot(), authority.sync().subscribe())
    }

    /// Handles the start command.
    ///
    /// Missing fields come from the authority: the current type, and its
    /// remaining time when that type is resumed.
    async fn handle_start(&self, params: StartParams) -> IpcResponse {
        let mut authority = self.authority.lock().await;
        let snapshot = authority.snapshot();

        let session_type = params.session_type.unwrap_or(snapshot.current_type);
        let full = authority.config().duration_seconds(session_type);
        let resumable = session_type == snapshot.current_type
            && snapshot.time_remaining_seconds > 0
            && snapshot.time_remaining_seconds < full;
        let duration = params.duration_seconds.unwrap_or(if resumable {
            snapshot.time_remaining_seconds
        } else {
            full
        });

        match authority.start(duration, session_type, params.completed_work_sessions) {
            Ok(state) => {
                let message = if resumable && params.duration_seconds.is_none() {
                    "タイマーを再開しました"
                } else {
                    "タイマーを開始しました"
                };
                with_state(message, state)
            }
            Err(e) => {
                tracing::warn!("開始要求を拒否しました: {}", e);
                IpcResponse::rejected(&e)
            }
        }
    }

    async fn handle_history(&self, limit: Option<usize>) -> IpcResponse {
        let history = self.history.lock().await;
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let sessions = history.recent(limit).to_vec();
        let today = today_progress(history.records(), &self.clock.today());

        IpcResponse::success(
            "",
            Some(ResponseData {
                sessions: Some(sessions),
                today: Some(today),
                ..ResponseData::default()
            }),
        )
    }
}

fn with_state(message: impl Into<String>, state: TimerState) -> IpcResponse {
    IpcResponse::success(message, Some(ResponseData::from_timer_state(state)))
}

// ============================================================================
// Tests
// ============================================================================
