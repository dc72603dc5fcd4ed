//! LaunchAgent plist for the focus timer daemon.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{LaunchAgentError, Result};

/// Plist keys of a LaunchAgent that keeps the daemon alive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DaemonAgent {
    /// Service label (reverse domain format)
    pub label: String,

    /// Binary followed by the `daemon` subcommand and its flags
    pub program_arguments: Vec<String>,

    pub run_at_load: bool,

    /// Restart the daemon whenever it exits
    pub keep_alive: bool,

    pub standard_out_path: String,

    pub standard_error_path: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub environment_variables: BTreeMap<String, String>,
}

impl DaemonAgent {
    pub const LABEL: &'static str = "com.example.focus-timer";

    /// Creates an agent running `binary_path` with `daemon_args`.
    pub fn new(binary_path: impl Into<String>, daemon_args: Vec<String>, log_dir: &str) -> Self {
        let mut program_arguments = vec![binary_path.into()];
        program_arguments.extend(daemon_args);

        Self {
            label: Self::LABEL.to_string(),
            program_arguments,
            run_at_load: true,
            keep_alive: true,
            standard_out_path: format!("{}/stdout.log", log_dir),
            standard_error_path: format!("{}/stderr.log", log_dir),
            environment_variables: BTreeMap::new(),
        }
    }

    /// Adds an environment variable for the daemon process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    /// Renders the plist XML.
    pub fn to_xml(&self) -> Result<String> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self).map_err(LaunchAgentError::PlistSerialize)?;
        // plist only emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
