//! `launchctl` wrapper and service status.

use std::path::Path;
use std::process::Command;

use super::agent::DaemonAgent;
use super::error::{LaunchAgentError, Result};

/// Loads the agent with `launchctl load`.
pub fn load(plist_path: &Path) -> Result<()> {
    let output = Command::new("launchctl")
        .arg("load")
        .arg(plist_path)
        .output()
        .map_err(LaunchAgentError::LaunchctlExecution)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LaunchAgentError::ServiceLoad(stderr.trim().to_string()));
    }

    tracing::debug!("launchctl load succeeded for {:?}", plist_path);
    Ok(())
}

/// Unloads the agent with `launchctl unload`.
///
/// Fails when the agent was not loaded; callers ensuring a clean state
/// ignore the error.
pub fn unload(plist_path: &Path) -> Result<()> {
    let output = Command::new("launchctl")
        .arg("unload")
        .arg(plist_path)
        .output()
        .map_err(LaunchAgentError::LaunchctlExecution)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!("launchctl unload failed (may be already unloaded): {}", stderr);
        return Err(LaunchAgentError::ServiceUnload(stderr.trim().to_string()));
    }

    tracing::debug!("launchctl unload succeeded for {:?}", plist_path);
    Ok(())
}

/// State of the agent as reported by launchd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Known to launchd
    pub loaded: bool,
    /// Process ID while the daemon runs
    pub pid: Option<u32>,
    /// Exit status of the previous run
    pub last_exit_status: Option<i32>,
}

impl ServiceStatus {
    pub fn is_running(&self) -> bool {
        self.pid.is_some()
    }
}

/// Queries `launchctl list <label>`.
pub fn status() -> Result<ServiceStatus> {
    let output = Command::new("launchctl")
        .arg("list")
        .arg(DaemonAgent::LABEL)
        .output()
        .map_err(LaunchAgentError::LaunchctlExecution)?;

    if !output.status.success() {
        return Ok(ServiceStatus::default());
    }

    Ok(parse_list_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses the dictionary printed by `launchctl list <label>`:
///
/// ```text
/// {
///     "Label" = "com.example.focus-timer";
///     "LastExitStatus" = 0;
///     "PID" = 12345;
/// };
/// ```
fn parse_list_output(output: &str) -> ServiceStatus {
    ServiceStatus {
        loaded: true,
        pid: field(output, "PID").and_then(|s| s.parse().ok()),
        last_exit_status: field(output, "LastExitStatus").and_then(|s| s.parse().ok()),
    }
}

fn field<'a>(output: &'a str, name: &str) -> Option<&'a str> {
    let key = format!("\"{}\"", name);
    output.lines().find_map(|line| {
        let (lhs, rhs) = line.split_once('=')?;
        (lhs.trim() == key).then(|| rhs.trim().trim_end_matches(';').trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_running() {
        let output = r#"{
    "Label" = "com.example.focus-timer";
    "LastExitStatus" = 0;
    "PID" = 12345;
    "Program" = "/usr/local/bin/focus-timer";
};"#;
        let status = parse_list_output(output);
        assert!(status.loaded);
        assert!(status.is_running());
        assert_eq!(status.pid, Some(12345));
        assert_eq!(status.last_exit_status, Some(0));
    }

    #[test]
    fn test_parse_exited() {
        let output = r#"{
    "Label" = "com.example.focus-timer";
    "LastExitStatus" = 256;
};"#;
        let status = parse_list_output(output);
        assert!(status.loaded);
        assert!(!status.is_running());
        assert_eq!(status.last_exit_status, Some(256));
    }

    #[test]
    fn test_field_does_not_match_prefix() {
        let output = r#"    "PIDFile" = "/tmp/x";"#;
        assert_eq!(field(output, "PID"), None);
    }

    #[test]
    fn test_default_is_not_loaded() {
        let status = ServiceStatus::default();
        assert!(!status.loaded);
        assert!(!status.is_running());
    }
}
