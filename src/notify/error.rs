//! Alert delivery error types.

use thiserror::Error;

/// Errors that can occur while delivering a session alert.
///
/// None of these are fatal to the timer: the authority logs them and moves on.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Audio device is not available (e.g., headless host).
    #[error("オーディオデバイスが利用できません: {0}")]
    DeviceNotAvailable(String),

    /// Sound file was not found at the specified path.
    #[error("サウンドファイルが見つかりません: {0}")]
    FileNotFound(String),

    /// Failed to decode the audio file.
    #[error("サウンドファイルのデコードに失敗しました: {0}")]
    DecodeError(String),

    /// Failed to create an output sink.
    #[error("オーディオストリームの作成に失敗しました: {0}")]
    StreamError(String),

    /// The alert thread could not be started.
    #[error("通知スレッドを起動できません: {0}")]
    Spawn(#[source] std::io::Error),

    /// The alert thread is gone.
    #[error("通知スレッドが停止しています")]
    Disconnected,

    /// Injected failure (tests only).
    #[error("通知に失敗しました: {0}")]
    Failed(String),
}

impl NotifyError {
    /// Returns true if this error is related to the audio device.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if a generated tone should be tried instead of the file.
    #[must_use]
    pub fn should_fallback_to_tone(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::DecodeError(_))
    }
}
