//! Focus timer CLI
//!
//! A countdown timer that keeps running while no window is open:
//! - `focus-timer daemon` owns the timer and the session history
//! - every other command connects to it, acts, and exits

use anyhow::Result;
use clap::{CommandFactory, Parser};

use focus_timer::cli::{Cli, Commands, Display, IpcClient};
use focus_timer::config::AppPaths;
use focus_timer::daemon::{self, DaemonOptions};
use focus_timer::launchagent;
use focus_timer::types::SessionType;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, matches!(cli.command, Some(Commands::Daemon(_))));

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise the daemon logs at `info`, the CLI at `warn`,
/// and `-v` raises either to `debug`.
fn init_tracing(verbose: bool, daemon: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match (verbose, daemon) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Start(args)) => {
            let response = IpcClient::new()?.start(&args).await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Pause) => {
            let response = IpcClient::new()?.pause().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Reset) => {
            let response = IpcClient::new()?.reset().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Skip) => {
            let response = IpcClient::new()?.skip().await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Switch { session_type }) => {
            let response = IpcClient::new()?
                .switch(SessionType::from(session_type))
                .await?;
            Display::show_command_result(&response);
        }
        Some(Commands::Status) => {
            let response = IpcClient::new()?.state().await?;
            Display::show_status(&response);
        }
        Some(Commands::Watch) => watch().await?,
        Some(Commands::History { limit }) => {
            let response = IpcClient::new()?.history(limit as usize).await?;
            Display::show_history(&response);
        }
        Some(Commands::Stats { period }) => {
            let response = IpcClient::new()?.stats(period).await?;
            Display::show_stats(&response);
        }
        Some(Commands::Clear { yes }) => {
            if !yes {
                anyhow::bail!("履歴をすべて削除します。実行するには --yes を指定してください");
            }
            IpcClient::new()?.clear_history().await?;
            Display::show_clear_success();
        }
        Some(Commands::Daemon(args)) => {
            let options = DaemonOptions {
                paths: AppPaths::resolve()?,
                config: args.session_config(),
                sound: !args.no_sound,
            };
            daemon::run(options).await?;
        }
        Some(Commands::Install(args)) => {
            let paths = AppPaths::resolve()?;
            launchagent::install(args.to_daemon_args(), &paths)?;
            Display::show_install_success();
        }
        Some(Commands::Uninstall) => {
            if launchagent::uninstall()? {
                Display::show_uninstall_success();
            } else {
                println!("LaunchAgentはインストールされていません");
            }
        }
        Some(Commands::ServiceStatus) => {
            let status = launchagent::status()?;
            Display::show_service_status(launchagent::is_installed(), &status);
        }
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

/// Prints live events until the daemon closes the stream or Ctrl-C.
async fn watch() -> Result<()> {
    let mut events = IpcClient::new()?.subscribe().await?;

    loop {
        tokio::select! {
            event = events.next() => match event? {
                Some(event) => {
                    if let Some(line) = Display::format_event(&event) {
                        println!("{}", line);
                    }
                }
                None => {
                    println!("Daemonとの接続が終了しました");
                    return Ok(());
                }
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
