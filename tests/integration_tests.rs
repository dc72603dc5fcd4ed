//! Integration tests for daemon-CLI IPC communication.
//!
//! A daemon is assembled in-process with mock capabilities and served on a
//! temporary socket; the real `IpcClient` talks to it:
//! - TC-I-001: Timer start via IPC
//! - TC-I-002: Pause keeps the remaining time
//! - TC-I-003: Status query via IPC
//! - TC-I-004: Connection error handling
//! - TC-I-005: Invalid duration is rejected
//! - TC-I-006: Unknown command is rejected
//! - TC-I-007: Subscribe receives snapshot then ticks
//! - TC-I-008: Completion is recorded in history
//! - TC-I-009: Clearing history resets the counter

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

use focus_timer::cli::{IpcClient, Rejected, StartArgs};
use focus_timer::clock::{local_noon_millis, Clock, FixedClock};
use focus_timer::daemon::{
    serve, Capabilities, HistoryRecorder, IpcServer, ManualScheduler, RequestHandler,
    SharedAuthority, SyncChannel, TimerAuthority,
};
use focus_timer::history::SessionHistoryStore;
use focus_timer::indicator::MockIndicator;
use focus_timer::notify::MockNotifier;
use focus_timer::storage::MemoryStorage;
use focus_timer::types::{IpcResponse, SessionConfig, SessionType, SyncEvent};

// ============================================================================
// Test Helpers
// ============================================================================

/// An in-process daemon on a temporary socket.
struct TestDaemon {
    client: IpcClient,
    authority: SharedAuthority,
    notifier: Arc<MockNotifier>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    _dir: tempfile::TempDir,
}

impl TestDaemon {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("integration_test.sock");

        let notifier = Arc::new(MockNotifier::new());
        let storage = Arc::new(MemoryStorage::new());
        let sync = SyncChannel::new();
        let caps = Capabilities {
            notifier: notifier.clone(),
            indicator: Arc::new(MockIndicator::new()),
            storage: storage.clone(),
            scheduler: Arc::new(ManualScheduler::new()),
        };
        let authority: SharedAuthority = Arc::new(Mutex::new(TimerAuthority::new(
            SessionConfig::default(),
            caps,
            sync.clone(),
        )));
        let history = Arc::new(Mutex::new(SessionHistoryStore::load(storage)));
        let noon = chrono::NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(local_noon_millis)
            .unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(noon));

        let recorder = HistoryRecorder::new(authority.clone(), history.clone(), clock.clone());
        tokio::spawn(recorder.clone().run(sync.subscribe()));

        let handler = Arc::new(RequestHandler::new(
            authority.clone(),
            history,
            recorder,
            clock,
        ));
        let server = IpcServer::new(&socket_path).unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(server, handler, async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            client: IpcClient::with_socket_path(socket_path),
            authority,
            notifier,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            _dir: dir,
        }
    }

    fn socket_path(&self) -> PathBuf {
        self.client.socket_path().to_path_buf()
    }

    /// Drives the authority to zero without waiting on real time.
    async fn finish_current_session(&self) {
        let mut authority = self.authority.lock().await;
        let remaining = authority.snapshot().time_remaining_seconds;
        for _ in 0..remaining {
            authority.tick();
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            timeout(Duration::from_secs(2), task)
                .await
                .expect("server should stop")
                .unwrap();
        }
    }
}

/// Polls `state` until `predicate` holds.
async fn wait_for_state<F>(client: &IpcClient, predicate: F) -> IpcResponse
where
    F: Fn(&IpcResponse) -> bool,
{
    timeout(Duration::from_secs(2), async {
        loop {
            let response = client.state().await.unwrap();
            if predicate(&response) {
                return response;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("state should converge")
}

fn completed(response: &IpcResponse) -> u32 {
    response
        .data
        .as_ref()
        .and_then(|d| d.state.as_ref())
        .map(|s| s.completed_work_sessions)
        .unwrap_or_default()
}

// ============================================================================
// TC-I-001: Timer Start via IPC
// ============================================================================

/// TC-I-001: タイマー開始（IPC経由）
///
/// 前提条件: Daemon起動中
/// テスト手順:
/// 1. CLIから `start` コマンド送信
/// 期待結果: 作業セッションが25分で開始される
#[tokio::test]
async fn tc_i_001_timer_start_via_ipc() {
    let daemon = TestDaemon::start().await;

    let response = daemon.client.start(&StartArgs::default()).await.unwrap();

    assert!(response.is_success());
    let state = response.data.unwrap().state.unwrap();
    assert!(state.running);
    assert_eq!(state.current_type, SessionType::Work);
    assert_eq!(state.time_remaining_seconds, 1500);

    daemon.stop().await;
}

// ============================================================================
// TC-I-002: Pause via IPC
// ============================================================================

/// TC-I-002: 一時停止（IPC経由）
///
/// 期待結果: 停止し、残り時間は保持される。再度 `start` すると続きから再開する
#[tokio::test]
async fn tc_i_002_pause_keeps_remaining_time() {
    let daemon = TestDaemon::start().await;
    daemon.client.start(&StartArgs::default()).await.unwrap();
    {
        let mut authority = daemon.authority.lock().await;
        for _ in 0..5 {
            authority.tick();
        }
    }

    let paused = daemon.client.pause().await.unwrap();
    let state = paused.data.unwrap().state.unwrap();
    assert!(!state.running);
    assert_eq!(state.time_remaining_seconds, 1495);

    let resumed = daemon.client.start(&StartArgs::default()).await.unwrap();
    assert_eq!(resumed.message, "タイマーを再開しました");
    let state = resumed.data.unwrap().state.unwrap();
    assert!(state.running);
    assert_eq!(state.time_remaining_seconds, 1495);

    daemon.stop().await;
}

// ============================================================================
// TC-I-003: Status Query via IPC
// ============================================================================

/// TC-I-003: ステータス取得（IPC経由）
#[tokio::test]
async fn tc_i_003_status_query_via_ipc() {
    let daemon = TestDaemon::start().await;

    let response = daemon.client.state().await.unwrap();
    let state = response.data.unwrap().state.unwrap();
    assert!(!state.running);
    assert_eq!(state.current_type, SessionType::Work);
    assert_eq!(state.completed_work_sessions, 0);

    daemon.stop().await;
}

// ============================================================================
// TC-I-004: Connection Error Handling
// ============================================================================

/// TC-I-004: 接続エラー
///
/// 前提条件: Daemon未起動
/// 期待結果: リトライ後にエラーが返る
#[tokio::test]
async fn tc_i_004_connection_error_without_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let client = IpcClient::with_socket_path(dir.path().join("missing.sock"));

    let result = client.state().await;

    assert!(result.is_err());
    assert!(result.unwrap_err().downcast_ref::<Rejected>().is_none());
}

// ============================================================================
// TC-I-005: Invalid Duration
// ============================================================================

/// TC-I-005: 範囲外の時間指定は拒否される
///
/// 期待結果: `invalid_duration` で拒否され、タイマーは変化しない
#[tokio::test]
async fn tc_i_005_invalid_duration_rejected() {
    let daemon = TestDaemon::start().await;
    let args = StartArgs {
        session_type: None,
        minutes: Some(60),
    };

    let err = daemon.client.start(&args).await.unwrap_err();

    let rejected = err.downcast_ref::<Rejected>().expect("should be rejected");
    assert_eq!(rejected.tag.as_deref(), Some("invalid_duration"));

    let state = daemon.client.state().await.unwrap().data.unwrap().state.unwrap();
    assert!(!state.running);
    assert_eq!(state.time_remaining_seconds, 1500);

    daemon.stop().await;
}

// ============================================================================
// TC-I-006: Unknown Command
// ============================================================================

/// TC-I-006: 不明なコマンドは拒否される
#[tokio::test]
async fn tc_i_006_unknown_command_rejected() {
    let daemon = TestDaemon::start().await;

    let mut stream = UnixStream::connect(daemon.socket_path()).await.unwrap();
    stream.write_all(b"{\"command\":\"launch\"}\n").await.unwrap();
    stream.shutdown().await.unwrap();
    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer).await.unwrap();

    let response: IpcResponse = serde_json::from_slice(&buffer).unwrap();
    assert!(!response.is_success());
    assert_eq!(response.error.as_deref(), Some("unknown_command"));
    assert!(response.message.contains("launch"));

    daemon.stop().await;
}

// ============================================================================
// TC-I-007: Subscribe
// ============================================================================

/// TC-I-007: 購読するとスナップショットの後にティックが届く
#[tokio::test]
async fn tc_i_007_subscribe_receives_snapshot_then_ticks() {
    let daemon = TestDaemon::start().await;
    let mut events = daemon.client.subscribe().await.unwrap();

    let first = timeout(Duration::from_secs(1), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(first, SyncEvent::State(ref s) if !s.running));

    daemon.client.start(&StartArgs::default()).await.unwrap();
    daemon.authority.lock().await.tick();

    let next = timeout(Duration::from_secs(1), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(
        next,
        SyncEvent::Tick {
            time_remaining_seconds: 1499,
            running: true,
        }
    );

    daemon.stop().await;
}

// ============================================================================
// TC-I-008: Completion Recorded
// ============================================================================

/// TC-I-008: 作業セッション終了で履歴が追加される
///
/// 期待結果: 履歴1件・完了数1・次は短い休憩・通知1回
#[tokio::test]
async fn tc_i_008_completion_recorded_in_history() {
    let daemon = TestDaemon::start().await;
    daemon.client.start(&StartArgs::default()).await.unwrap();

    daemon.finish_current_session().await;
    let response = wait_for_state(&daemon.client, |r| completed(r) == 1).await;

    let state = response.data.unwrap().state.unwrap();
    assert!(!state.running);
    assert_eq!(state.current_type, SessionType::ShortBreak);
    assert_eq!(state.time_remaining_seconds, 300);
    assert_eq!(daemon.notifier.notify_count(), 1);

    let history = daemon.client.history(10).await.unwrap();
    let data = history.data.unwrap();
    let sessions = data.sessions.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_type, SessionType::Work);
    assert_eq!(sessions[0].duration_minutes, 25);
    assert_eq!(data.today.unwrap().work_sessions, 1);

    daemon.stop().await;
}

// ============================================================================
// TC-I-009: Clear History
// ============================================================================

/// TC-I-009: 履歴削除で完了数もリセットされる
#[tokio::test]
async fn tc_i_009_clear_history_resets_counter() {
    let daemon = TestDaemon::start().await;
    daemon.client.start(&StartArgs::default()).await.unwrap();
    daemon.finish_current_session().await;
    wait_for_state(&daemon.client, |r| completed(r) == 1).await;

    let cleared = daemon.client.clear_history().await.unwrap();
    assert!(cleared.is_success());

    assert_eq!(completed(&daemon.client.state().await.unwrap()), 0);
    let history = daemon.client.history(10).await.unwrap();
    assert!(history.data.unwrap().sessions.unwrap().is_empty());

    daemon.stop().await;
}
