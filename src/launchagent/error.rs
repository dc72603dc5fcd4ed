//! Error types for LaunchAgent management.

use std::io;
use thiserror::Error;

/// LaunchAgent management error type.
#[derive(Debug, Error)]
pub enum LaunchAgentError {
    /// The running executable could not be located.
    #[error("実行ファイルのパスを取得できません: {0}")]
    BinaryPath(#[source] io::Error),

    /// Home directory not found.
    #[error("ホームディレクトリが見つかりません")]
    HomeDirectoryNotFound,

    /// A filesystem step of install or uninstall failed.
    #[error("{action}に失敗しました: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    /// Failed to serialize plist.
    #[error("plistの生成に失敗しました: {0}")]
    PlistSerialize(#[source] plist::Error),

    /// Failed to execute launchctl.
    #[error("launchctlを実行できません: {0}")]
    LaunchctlExecution(#[source] io::Error),

    /// launchctl refused to load the agent.
    #[error("LaunchAgentを読み込めません: {0}")]
    ServiceLoad(String),

    /// launchctl refused to unload the agent.
    #[error("LaunchAgentを停止できません: {0}")]
    ServiceUnload(String),
}

impl LaunchAgentError {
    pub(crate) fn io(action: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Io { action, source }
    }
}

/// Result type for LaunchAgent operations.
pub type Result<T> = std::result::Result<T, LaunchAgentError>;
