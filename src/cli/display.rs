//! Display utilities for the focus timer CLI.
//!
//! This module provides formatted output for:
//! - Command results
//! - Status display
//! - Live watch lines
//! - History and statistics tables

use crate::launchagent::ServiceStatus;
use crate::types::{
    IpcResponse, SessionRecord, SessionType, StatsPeriod, StatsSummary, SyncEvent, TimerState,
    TodayProgress, SESSIONS_PER_LONG_BREAK,
};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a timer command (start, pause, reset, skip, switch).
    pub fn show_command_result(response: &IpcResponse) {
        let marker = match response.message.as_str() {
            m if m.contains("一時停止") => "||",
            m if m.contains("リセット") => "[]",
            m if m.contains("スキップ") => ">>",
            _ => "*",
        };
        println!("{} {}", marker, response.message);

        if let Some(state) = Self::state(response) {
            let (minutes, seconds) = Self::format_time(state.time_remaining_seconds);
            println!("  {}: 残り {}:{:02}", Self::session_name(state.current_type), minutes, seconds);
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        println!("集中タイマー ステータス");
        println!("─────────────────────────────");

        let Some(state) = Self::state(response) else {
            println!("タイマーは起動していません");
            return;
        };

        println!("状態: {}", Self::status_label(state));
        println!("セッション: {}", Self::session_name(state.current_type));
        let (minutes, seconds) = Self::format_time(state.time_remaining_seconds);
        println!("残り時間: {}:{:02}", minutes, seconds);
        println!(
            "サイクル: {}/{} (完了 {})",
            state.cycle_position(),
            SESSIONS_PER_LONG_BREAK,
            state.completed_work_sessions
        );
    }

    /// Formats one live event for `watch`, or `None` for events not shown.
    pub fn format_event(event: &SyncEvent) -> Option<String> {
        match event {
            SyncEvent::State(state) => {
                let (minutes, seconds) = Self::format_time(state.time_remaining_seconds);
                Some(format!(
                    "{} {} {}:{:02}",
                    Self::status_label(state),
                    Self::session_name(state.current_type),
                    minutes,
                    seconds
                ))
            }
            SyncEvent::Tick {
                time_remaining_seconds,
                ..
            } => {
                let (minutes, seconds) = Self::format_time(*time_remaining_seconds);
                Some(format!("残り {}:{:02}", minutes, seconds))
            }
            SyncEvent::SessionComplete { session_type } => Some(format!(
                "✓ {}が終了しました",
                Self::session_name(*session_type)
            )),
        }
    }

    /// Shows recent sessions, newest first.
    pub fn show_history(response: &IpcResponse) {
        let data = response.data.as_ref();
        let sessions = data.and_then(|d| d.sessions.as_deref()).unwrap_or_default();

        if sessions.is_empty() {
            println!("履歴はまだありません");
        } else {
            println!("最近のセッション");
            println!("─────────────────────────────");
            for record in sessions {
                println!("{}", Self::format_record(record));
            }
        }

        if let Some(today) = data.and_then(|d| d.today.as_ref()) {
            println!();
            println!("{}", Self::format_today(today));
        }
    }

    /// Shows a statistics summary.
    pub fn show_stats(response: &IpcResponse) {
        let data = response.data.as_ref();
        let Some(stats) = data.and_then(|d| d.stats.as_ref()) else {
            println!("統計を取得できませんでした");
            return;
        };

        for line in Self::format_stats(stats) {
            println!("{}", line);
        }
        if let Some(today) = data.and_then(|d| d.today.as_ref()) {
            println!("{}", Self::format_today(today));
        }
    }

    /// Shows a success message for history deletion.
    pub fn show_clear_success() {
        println!("* 履歴を削除しました");
    }

    /// Shows the LaunchAgent state.
    pub fn show_service_status(installed: bool, status: &ServiceStatus) {
        println!("LaunchAgent ステータス");
        println!("─────────────────────────────");
        println!(
            "インストール: {}",
            if installed { "済み" } else { "未インストール" }
        );
        match status.pid {
            Some(pid) => println!("Daemon: 実行中 (PID {})", pid),
            None if status.loaded => println!("Daemon: 停止中"),
            None => println!("Daemon: 未登録"),
        }
        if let Some(code) = status.last_exit_status {
            println!("前回の終了コード: {}", code);
        }
    }

    /// Shows a success message for LaunchAgent installation.
    pub fn show_install_success() {
        println!("* LaunchAgentをインストールしました");
        println!("  次回ログイン時から自動的に起動します");
    }

    /// Shows a success message for LaunchAgent uninstallation.
    pub fn show_uninstall_success() {
        println!("* LaunchAgentをアンインストールしました");
        println!("  次回ログイン時から自動起動しなくなります");
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    // ------------------------------------------------------------------------
    // Formatting helpers
    // ------------------------------------------------------------------------

    fn state(response: &IpcResponse) -> Option<&TimerState> {
        response.data.as_ref().and_then(|d| d.state.as_ref())
    }

    fn status_label(state: &TimerState) -> &'static str {
        if state.running {
            "実行中"
        } else {
            "停止中"
        }
    }

    /// Display name of a session type.
    pub fn session_name(session_type: SessionType) -> &'static str {
        match session_type {
            SessionType::Work => "作業",
            SessionType::ShortBreak => "短い休憩",
            SessionType::LongBreak => "長い休憩",
        }
    }

    fn period_name(period: StatsPeriod) -> &'static str {
        match period {
            StatsPeriod::Today => "今日",
            StatsPeriod::Week => "過去7日間",
            StatsPeriod::All => "全期間",
        }
    }

    /// One history line: date key, type and minutes.
    pub fn format_record(record: &SessionRecord) -> String {
        format!(
            "{}  {:<8} {}分",
            record.calendar_date_key,
            Self::session_name(record.session_type),
            record.duration_minutes
        )
    }

    /// Lines of a statistics summary.
    pub fn format_stats(stats: &StatsSummary) -> Vec<String> {
        vec![
            format!("統計 ({})", Self::period_name(stats.period)),
            "─────────────────────────────".to_string(),
            format!("集中時間: {}", Self::format_minutes(stats.total_focus_minutes)),
            format!("作業セッション: {}回", stats.session_count),
            format!("連続日数: {}日", stats.streak),
        ]
    }

    fn format_today(today: &TodayProgress) -> String {
        format!(
            "今日: 作業 {}回 / {}",
            today.work_sessions,
            Self::format_minutes(today.focus_minutes)
        )
    }

    /// Formats minutes as `1時間5分` or `45分`.
    pub fn format_minutes(total_minutes: u32) -> String {
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;
        if hours > 0 {
            format!("{}時間{}分", hours, minutes)
        } else {
            format!("{}分", minutes)
        }
    }

    /// Formats remaining seconds as (minutes, seconds).
    fn format_time(total_seconds: u32) -> (u32, u32) {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        (minutes, seconds)
    }
}

// ============================================================================
// Tests
// ============================================================================
