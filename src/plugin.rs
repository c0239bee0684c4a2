//! Transform plugins.
//!
//! A plugin receives a table snapshot and returns a replacement. The engine owns
//! only the interchange; running user code happens out of process through
//! [`CommandPlugin`].

use crate::error::{Result, TableError};
use crate::table::TableSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Which rows a plugin sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PluginScope {
    #[default]
    #[serde(rename = "Full dataset")]
    FullTable,
    #[serde(rename = "Current filtered view")]
    CurrentView,
}

/// Plugin result plus anything it logged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    pub table: TableSnapshot,
    pub log: String,
}

#[async_trait]
pub trait TransformPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Transform `input`. Failures are reported as [`TableError::PluginError`].
    async fn transform(&self, input: TableSnapshot) -> Result<PluginOutput>;
}

/// Settings remembered between plugin runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default)]
    pub last_script: Option<PathBuf>,
    #[serde(default)]
    pub last_scope: PluginScope,
    #[serde(default)]
    pub dry_run: bool,
}

impl PluginSettings {
    /// Read from the free-form plugin settings object; unknown shapes give defaults
    pub fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        serde_json::from_value(serde_json::Value::Object(map.clone())).unwrap_or_default()
    }

    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Runs an external program as a plugin.
///
/// The snapshot is written to the program's stdin as JSON
/// (`{"headers": [...], "rows": [[...]]}`) and the program must print the
/// transformed snapshot in the same shape on stdout. Anything on stderr is kept
/// as the plugin log. A non-zero exit status is a failure.
#[derive(Debug, Clone)]
pub struct CommandPlugin {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandPlugin {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl TransformPlugin for CommandPlugin {
    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("plugin")
    }

    async fn transform(&self, input: TableSnapshot) -> Result<PluginOutput> {
        let payload = serde_json::to_vec(&input)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TableError::plugin(format!("cannot start {}: {}", self.program.display(), e))
            })?;

        // stdin is fed while stdout is drained; a sequential write can deadlock.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let written = stdin.write_all(&payload).await;
                drop(stdin);
                written
            })
        });

        let run = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| TableError::plugin(format!("timed out after {limit:?}")))?,
            None => run.await,
        }
        .map_err(|e| TableError::plugin(format!("plugin did not finish: {e}")))?;

        let log = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(TableError::plugin(format!(
                "{} exited with {}: {}",
                self.name(),
                output.status,
                log.trim()
            )));
        }

        if let Some(writer) = writer {
            match writer.await {
                // Plugins that ignore their input close stdin early.
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(TableError::plugin(format!(
                        "cannot send table to plugin: {e}"
                    )));
                }
                Err(e) => return Err(TableError::plugin(format!("stdin writer failed: {e}"))),
                _ => {}
            }
        }

        let table: TableSnapshot = serde_json::from_slice(&output.stdout)
            .map_err(|e| TableError::plugin(format!("plugin output is not a table: {e}")))?;
        log::debug!(
            "plugin {} returned {} rows",
            self.name(),
            table.rows.len()
        );
        Ok(PluginOutput { table, log })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_labels() {
        assert_eq!(
            serde_json::to_string(&PluginScope::CurrentView).unwrap(),
            "\"Current filtered view\""
        );
    }

    #[test]
    fn test_plugin_settings_map_round_trip() {
        let settings = PluginSettings {
            last_script: Some(PathBuf::from("/tmp/x.sh")),
            last_scope: PluginScope::CurrentView,
            dry_run: true,
        };
        assert_eq!(PluginSettings::from_map(&settings.to_map()), settings);
        assert_eq!(
            PluginSettings::from_map(&serde_json::Map::new()),
            PluginSettings::default()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_plugin_echo() {
        let plugin = CommandPlugin::new("cat");
        let input = TableSnapshot {
            headers: vec!["a".into()],
            rows: vec![vec!["1".into()]],
        };
        let output = plugin.transform(input.clone()).await.unwrap();
        assert_eq!(output.table, input);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_plugin_failure_is_reported() {
        let plugin = CommandPlugin::new("sh").arg("-c").arg("echo boom >&2; exit 3");
        let err = plugin
            .transform(TableSnapshot::default())
            .await
            .unwrap_err();
        match err {
            TableError::PluginError { message } => assert!(message.contains("boom")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
