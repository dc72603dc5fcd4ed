//! Filesystem locations used by the daemon and the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Overrides the data directory (used by tests and side-by-side installs).
pub const HOME_ENV: &str = "FOCUS_TIMER_HOME";

/// Data directory name under the user's home.
const APP_DIR: &str = ".focus-timer";

const SOCKET_FILE: &str = "focus-timer.sock";
const INDICATOR_FILE: &str = "indicator";
const LOG_DIR: &str = "logs";

/// Resolved application paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Resolves `$FOCUS_TIMER_HOME`, falling back to `~/.focus-timer`.
    pub fn resolve() -> Result<Self> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(root));
        }
        let home = dirs::home_dir().context("ホームディレクトリが見つかりません")?;
        Ok(Self::with_root(home.join(APP_DIR)))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding snapshots and history.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn socket_path(&self) -> PathBuf {
        self.root.join(SOCKET_FILE)
    }

    pub fn indicator_path(&self) -> PathBuf {
        self.root.join(INDICATOR_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }
}
