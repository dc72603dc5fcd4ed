//! Command definitions for the focus timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{SessionConfig, SessionType, StatsPeriod};

// ============================================================================
// CLI Structure
// ============================================================================

/// Focus timer CLI - a countdown timer that keeps running in the background
#[derive(Parser, Debug)]
#[command(
    name = "focus-timer",
    version,
    about = "バックグラウンドで動き続ける集中タイマーCLI",
    long_about = "常駐するDaemonがタイマーを管理し、CLIはいつでも接続して操作・表示します。\n\
                  完了したセッションは履歴として保存され、統計を確認できます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start (or resume) a session
    Start(StartArgs),

    /// Pause the current session
    Pause,

    /// Stop and restore the full duration of the current session
    Reset,

    /// End the current session early
    Skip,

    /// Switch to another session type without starting it
    Switch {
        /// Session type to switch to
        #[arg(value_enum)]
        session_type: SessionArg,
    },

    /// Show current timer status
    Status,

    /// Follow the timer live until interrupted
    Watch,

    /// Show recently completed sessions
    History {
        /// Number of sessions to show (1-100)
        #[arg(
            short,
            long,
            default_value = "10",
            value_parser = clap::value_parser!(u32).range(1..=100)
        )]
        limit: u32,
    },

    /// Show focus statistics
    Stats {
        /// Period to summarize (today, week, all)
        #[arg(short, long, default_value = "today")]
        period: StatsPeriod,
    },

    /// Delete all session history
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Run as daemon (background service)
    #[command(hide = true)]
    Daemon(DaemonArgs),

    /// Install LaunchAgent for auto-start on login
    Install(DaemonArgs),

    /// Uninstall LaunchAgent
    Uninstall,

    /// Show LaunchAgent status
    ServiceStatus,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

/// Session type as written on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionArg {
    Work,
    ShortBreak,
    LongBreak,
}

impl From<SessionArg> for SessionType {
    fn from(arg: SessionArg) -> Self {
        match arg {
            SessionArg::Work => SessionType::Work,
            SessionArg::ShortBreak => SessionType::ShortBreak,
            SessionArg::LongBreak => SessionType::LongBreak,
        }
    }
}

/// Arguments for the start command
#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Session type (defaults to the daemon's current type)
    #[arg(short = 't', long = "type", value_enum)]
    pub session_type: Option<SessionArg>,

    /// Countdown length in minutes (defaults to the remaining or full duration)
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=120)
    )]
    pub minutes: Option<u32>,
}

/// Arguments for the daemon and install commands
#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
    /// Work duration in minutes (1-120)
    #[arg(
        short,
        long,
        default_value = "25",
        value_parser = clap::value_parser!(u32).range(1..=120)
    )]
    pub work: u32,

    /// Short break duration in minutes (1-60)
    #[arg(
        short,
        long,
        default_value = "5",
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub short_break: u32,

    /// Long break duration in minutes (1-60)
    #[arg(
        short,
        long,
        default_value = "15",
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub long_break: u32,

    /// Disable alert sounds
    #[arg(long)]
    pub no_sound: bool,
}

impl Default for DaemonArgs {
    fn default() -> Self {
        Self {
            work: 25,
            short_break: 5,
            long_break: 15,
            no_sound: false,
        }
    }
}

impl DaemonArgs {
    /// Session table built from the given durations.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::from_minutes(self.work, self.short_break, self.long_break)
    }

    /// Arguments that reproduce these settings on a `daemon` invocation.
    pub fn to_daemon_args(&self) -> Vec<String> {
        let mut args = vec![
            "daemon".to_string(),
            "--work".to_string(),
            self.work.to_string(),
            "--short-break".to_string(),
            self.short_break.to_string(),
            "--long-break".to_string(),
            self.long_break.to_string(),
        ];
        if self.no_sound {
            args.push("--no-sound".to_string());
        }
        args
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::try_parse_from(["focus-timer"]).unwrap();
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::try_parse_from(["focus-timer", "-v", "status"]).unwrap();
            assert!(cli.verbose);
            assert!(matches!(cli.command, Some(Commands::Status)));
        }

        #[test]
        fn test_parse_simple_commands() {
            for (arg, expected) in [
                ("pause", "Pause"),
                ("reset", "Reset"),
                ("skip", "Skip"),
                ("status", "Status"),
                ("watch", "Watch"),
                ("uninstall", "Uninstall"),
                ("service-status", "ServiceStatus"),
            ] {
                let cli = Cli::try_parse_from(["focus-timer", arg]).unwrap();
                assert_eq!(format!("{:?}", cli.command.unwrap()), expected);
            }
        }

        #[test]
        fn test_parse_switch() {
            let cli = Cli::try_parse_from(["focus-timer", "switch", "long-break"]).unwrap();
            match cli.command {
                Some(Commands::Switch { session_type }) => {
                    assert_eq!(SessionType::from(session_type), SessionType::LongBreak);
                }
                _ => panic!("Expected Switch command"),
            }
        }

        #[test]
        fn test_parse_unknown_command() {
            assert!(Cli::try_parse_from(["focus-timer", "explode"]).is_err());
        }

        #[test]
        fn test_parse_completions_invalid_shell() {
            assert!(Cli::try_parse_from(["focus-timer", "completions", "cmd"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // StartArgs Tests
    // ------------------------------------------------------------------------

    mod start_args_tests {
        use super::*;

        fn parse_start(args: &[&str]) -> StartArgs {
            let mut argv = vec!["focus-timer", "start"];
            argv.extend_from_slice(args);
            match Cli::try_parse_from(argv).unwrap().command {
                Some(Commands::Start(args)) => args,
                _ => panic!("Expected Start command"),
            }
        }

        #[test]
        fn test_parse_start_defaults() {
            let args = parse_start(&[]);
            assert_eq!(args.session_type, None);
            assert_eq!(args.minutes, None);
        }

        #[test]
        fn test_parse_start_type_and_minutes() {
            let args = parse_start(&["--type", "short-break", "-m", "3"]);
            assert_eq!(args.session_type, Some(SessionArg::ShortBreak));
            assert_eq!(args.minutes, Some(3));
        }

        #[test]
        fn test_parse_start_minutes_out_of_range() {
            assert!(Cli::try_parse_from(["focus-timer", "start", "-m", "0"]).is_err());
            assert!(Cli::try_parse_from(["focus-timer", "start", "-m", "121"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // History / Stats / Clear Tests
    // ------------------------------------------------------------------------

    mod history_args_tests {
        use super::*;

        #[test]
        fn test_parse_history_default_limit() {
            let cli = Cli::try_parse_from(["focus-timer", "history"]).unwrap();
            assert!(matches!(cli.command, Some(Commands::History { limit: 10 })));
        }

        #[test]
        fn test_parse_history_limit_bounds() {
            assert!(Cli::try_parse_from(["focus-timer", "history", "-l", "100"]).is_ok());
            assert!(Cli::try_parse_from(["focus-timer", "history", "-l", "101"]).is_err());
        }

        #[test]
        fn test_parse_stats_period() {
            let cli = Cli::try_parse_from(["focus-timer", "stats", "--period", "week"]).unwrap();
            assert!(matches!(
                cli.command,
                Some(Commands::Stats {
                    period: StatsPeriod::Week
                })
            ));
        }

        #[test]
        fn test_parse_stats_default_today() {
            let cli = Cli::try_parse_from(["focus-timer", "stats"]).unwrap();
            assert!(matches!(
                cli.command,
                Some(Commands::Stats {
                    period: StatsPeriod::Today
                })
            ));
        }

        #[test]
        fn test_parse_stats_invalid_period() {
            assert!(Cli::try_parse_from(["focus-timer", "stats", "-p", "month"]).is_err());
        }

        #[test]
        fn test_parse_clear_confirmation() {
            let cli = Cli::try_parse_from(["focus-timer", "clear"]).unwrap();
            assert!(matches!(cli.command, Some(Commands::Clear { yes: false })));

            let cli = Cli::try_parse_from(["focus-timer", "clear", "--yes"]).unwrap();
            assert!(matches!(cli.command, Some(Commands::Clear { yes: true })));
        }
    }

    // ------------------------------------------------------------------------
    // DaemonArgs Tests
    // ------------------------------------------------------------------------

    mod daemon_args_tests {
        use super::*;

        fn parse_daemon(args: &[&str]) -> DaemonArgs {
            let mut argv = vec!["focus-timer", "daemon"];
            argv.extend_from_slice(args);
            match Cli::try_parse_from(argv).unwrap().command {
                Some(Commands::Daemon(args)) => args,
                _ => panic!("Expected Daemon command"),
            }
        }

        #[test]
        fn test_parse_daemon_defaults() {
            let args = parse_daemon(&[]);
            assert_eq!(args.session_config(), SessionConfig::default());
            assert!(!args.no_sound);
        }

        #[test]
        fn test_parse_daemon_durations() {
            let args = parse_daemon(&["-w", "50", "-s", "10", "-l", "30", "--no-sound"]);
            let config = args.session_config();
            assert_eq!(config.duration_seconds(SessionType::Work), 3000);
            assert_eq!(config.duration_seconds(SessionType::ShortBreak), 600);
            assert_eq!(config.duration_seconds(SessionType::LongBreak), 1800);
            assert!(args.no_sound);
        }

        #[test]
        fn test_parse_daemon_out_of_range() {
            assert!(Cli::try_parse_from(["focus-timer", "daemon", "-w", "121"]).is_err());
            assert!(Cli::try_parse_from(["focus-timer", "daemon", "-s", "0"]).is_err());
            assert!(Cli::try_parse_from(["focus-timer", "daemon", "-l", "61"]).is_err());
        }

        #[test]
        fn test_to_daemon_args_round_trip() {
            let original = DaemonArgs {
                work: 40,
                short_break: 8,
                long_break: 20,
                no_sound: true,
            };
            let mut argv = vec!["focus-timer".to_string()];
            argv.extend(original.to_daemon_args());

            match Cli::try_parse_from(argv).unwrap().command {
                Some(Commands::Daemon(parsed)) => {
                    assert_eq!(parsed.session_config(), original.session_config());
                    assert!(parsed.no_sound);
                }
                _ => panic!("Expected Daemon command"),
            }
        }

        #[test]
        fn test_install_accepts_durations() {
            let cli = Cli::try_parse_from(["focus-timer", "install", "-w", "30"]).unwrap();
            match cli.command {
                Some(Commands::Install(args)) => assert_eq!(args.work, 30),
                _ => panic!("Expected Install command"),
            }
        }
    }
}
