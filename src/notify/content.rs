//! Alert text per finished session type.

use crate::types::SessionType;

/// Title and body shown when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContent {
    pub title: &'static str,
    pub body: &'static str,
}

impl AlertContent {
    /// Content for the session type that just finished.
    pub fn for_session(finished: SessionType) -> Self {
        match finished {
            SessionType::Work => Self {
                title: "🍅 集中セッション完了！",
                body: "お疲れさまでした。休憩を取りましょう。",
            },
            SessionType::ShortBreak => Self {
                title: "☕ 休憩終了",
                body: "集中タイムに戻る準備はできましたか？",
            },
            SessionType::LongBreak => Self {
                title: "☕ 長い休憩終了",
                body: "素晴らしい調子です。この勢いで続けましょう。",
            },
        }
    }
}
