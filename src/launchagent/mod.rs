//! LaunchAgent management for macOS.
//!
//! Installs the focus timer daemon as a LaunchAgent so that launchd starts it
//! at login and restarts it whenever it exits.

pub mod agent;
pub mod error;
pub mod service;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub use agent::DaemonAgent;
pub use error::{LaunchAgentError, Result};
pub use service::{status, ServiceStatus};

use crate::config::{AppPaths, HOME_ENV};

/// Path of the installed plist under `~/Library/LaunchAgents`.
pub fn plist_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(LaunchAgentError::HomeDirectoryNotFound)?;
    Ok(home
        .join("Library/LaunchAgents")
        .join(format!("{}.plist", DaemonAgent::LABEL)))
}

/// Returns true if the plist file exists.
pub fn is_installed() -> bool {
    plist_path().map(|p| p.exists()).unwrap_or(false)
}

/// Builds the agent for the current executable.
///
/// A `FOCUS_TIMER_HOME` override in effect at install time is passed on to
/// the daemon.
pub fn build_agent(daemon_args: Vec<String>, paths: &AppPaths) -> Result<DaemonAgent> {
    let binary = std::env::current_exe().map_err(LaunchAgentError::BinaryPath)?;
    let log_dir = paths.log_dir();
    let mut agent = DaemonAgent::new(
        binary.to_string_lossy(),
        daemon_args,
        &log_dir.to_string_lossy(),
    );
    if std::env::var_os(HOME_ENV).is_some() {
        agent = agent.with_env(HOME_ENV, paths.root().to_string_lossy());
    }
    Ok(agent)
}

/// Writes `agent` to `plist_path` with mode 0644.
pub fn write_plist(agent: &DaemonAgent, plist_path: &Path) -> Result<()> {
    let xml = agent.to_xml()?;

    if let Some(parent) = plist_path.parent() {
        fs::create_dir_all(parent).map_err(LaunchAgentError::io("ディレクトリの作成"))?;
    }
    fs::write(plist_path, xml).map_err(LaunchAgentError::io("plistの書き込み"))?;
    fs::set_permissions(plist_path, fs::Permissions::from_mode(0o644))
        .map_err(LaunchAgentError::io("権限の設定"))?;
    Ok(())
}

/// Installs (or reinstalls) the LaunchAgent and loads it.
pub fn install(daemon_args: Vec<String>, paths: &AppPaths) -> Result<PathBuf> {
    fs::create_dir_all(paths.log_dir()).map_err(LaunchAgentError::io("ログディレクトリの作成"))?;

    let agent = build_agent(daemon_args, paths)?;
    let plist_path = plist_path()?;
    write_plist(&agent, &plist_path)?;

    // Reinstall replaces a loaded agent
    let _ = service::unload(&plist_path);
    service::load(&plist_path)?;

    tracing::info!("LaunchAgent installed at {:?}", plist_path);
    Ok(plist_path)
}

/// Unloads and removes the LaunchAgent.
///
/// Returns false if it was not installed.
pub fn uninstall() -> Result<bool> {
    let plist_path = plist_path()?;
    if !plist_path.exists() {
        tracing::info!("LaunchAgent plist does not exist, nothing to uninstall");
        return Ok(false);
    }

    let _ = service::unload(&plist_path);
    fs::remove_file(&plist_path).map_err(LaunchAgentError::io("plistの削除"))?;

    tracing::info!("LaunchAgent uninstalled");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plist_path_format() {
        if let Ok(path) = plist_path() {
            let path = path.to_string_lossy().into_owned();
            assert!(path.contains("Library/LaunchAgents"));
            assert!(path.ends_with("com.example.focus-timer.plist"));
        }
    }

    #[test]
    fn test_build_agent_uses_current_exe() {
        let paths = AppPaths::with_root("/tmp/ft");
        let agent = build_agent(vec!["daemon".to_string()], &paths).unwrap();

        let exe = std::env::current_exe().unwrap();
        assert_eq!(agent.program_arguments[0], exe.to_string_lossy());
        assert_eq!(agent.program_arguments[1], "daemon");
        assert_eq!(agent.standard_error_path, "/tmp/ft/logs/stderr.log");
    }

    #[test]
    fn test_write_plist_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents").join("test.plist");
        let agent = DaemonAgent::new("/bin/focus-timer", vec!["daemon".to_string()], "/tmp/logs");

        write_plist(&agent, &path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        let parsed: DaemonAgent = plist::from_file(&path).unwrap();
        assert_eq!(parsed, agent);
    }
}
