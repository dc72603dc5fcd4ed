//! Daemon process wiring.
//!
//! Builds the authority with its real capabilities, starts the tick loop and
//! the history recorder, then serves IPC connections until SIGINT/SIGTERM.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};

use crate::clock::{Clock, SystemClock};
use crate::config::AppPaths;
use crate::history::SessionHistoryStore;
use crate::indicator::FileIndicator;
use crate::notify::AlertNotifier;
use crate::storage::JsonFileStorage;
use crate::types::SessionConfig;

use super::ipc::{serve_connection, IpcServer, RequestHandler};
use super::recorder::{HistoryRecorder, SharedAuthority};
use super::sync::SyncChannel;
use super::tick::{IntervalScheduler, TickSignal, TICK_PERIOD};
use super::timer::{Capabilities, TickOutcome, TimerAuthority};

/// Settings for one daemon run.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub paths: AppPaths,
    pub config: SessionConfig,
    /// Play a sound with each alert
    pub sound: bool,
}

/// Runs the daemon until a shutdown signal arrives.
pub async fn run(options: DaemonOptions) -> Result<()> {
    options
        .config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("設定が不正です")?;

    let paths = &options.paths;
    std::fs::create_dir_all(paths.root())
        .with_context(|| format!("データディレクトリを作成できません: {:?}", paths.root()))?;

    let storage = Arc::new(JsonFileStorage::new(paths.root()));
    let notifier = AlertNotifier::spawn(options.sound).context("通知スレッドを起動できません")?;
    let (scheduler, tick_rx) = IntervalScheduler::new(TICK_PERIOD);
    let sync = SyncChannel::new();

    let caps = Capabilities {
        notifier: Arc::new(notifier),
        indicator: Arc::new(FileIndicator::new(paths.indicator_path())),
        storage: storage.clone(),
        scheduler: Arc::new(scheduler),
    };
    let authority: SharedAuthority = Arc::new(Mutex::new(TimerAuthority::restore(
        options.config.clone(),
        caps,
        sync.clone(),
    )));
    let history = Arc::new(Mutex::new(SessionHistoryStore::load(storage)));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let recorder = HistoryRecorder::new(authority.clone(), history.clone(), clock.clone());
    tokio::spawn(recorder.clone().run(sync.subscribe()));
    tokio::spawn(run_tick_loop(authority.clone(), tick_rx));

    let handler = Arc::new(RequestHandler::new(
        authority.clone(),
        history,
        recorder,
        clock,
    ));
    let server = IpcServer::new(&paths.socket_path())?;
    tracing::info!(socket = ?server.socket_path(), "Daemonを起動しました");

    serve(server, handler, shutdown_signal()).await;

    authority.lock().await.shutdown();
    Ok(())
}

/// Accepts connections until `shutdown` resolves.
///
/// Each connection is served on its own task.
pub async fn serve(
    server: IpcServer,
    handler: Arc<RequestHandler>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(&handler, stream).await {
                            tracing::debug!("接続の処理に失敗しました: {:#}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("接続を受け付けられません: {:#}", e),
            },
            () = &mut shutdown => {
                tracing::info!("Daemonを停止します");
                break;
            }
        }
    }
}

/// Applies tick signals to the authority, one at a time.
pub async fn run_tick_loop(authority: SharedAuthority, mut ticks: mpsc::UnboundedReceiver<TickSignal>) {
    while let Some(signal) = ticks.recv().await {
        let outcome = authority.lock().await.handle_tick_signal(signal.generation);
        if let TickOutcome::Completed { session_type } = outcome {
            tracing::debug!(session = %session_type, "ティックでセッションが終了しました");
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("SIGINTを待機できません: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERMを待機できません: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
