//! Model discovery, running-model status and the stop-all sweep.
//!
//! All three go through the `ollama` CLI:
//!
//! | Operation                     | Command               |
//! |-------------------------------|-----------------------|
//! | [`ModelManager::installed`]   | `ollama list`         |
//! | [`ModelManager::status`]      | `ollama ps`           |
//! | [`ModelManager::stop_all`]    | `ollama ps` then `ollama stop <name>` per model |
//!
//! Both listings print a header line followed by whitespace-separated
//! columns whose first column is the model name.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::process::{Invocation, LaunchError, ProcessRunner};

/// Shown in the status monitor when nothing is loaded.
pub const NO_ACTIVE_MODELS: &str = "No active models";

/// Shown in the status monitor when `ollama ps` cannot be run.
pub const STATUS_ERROR: &str = "Status Error";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("`{command}` exited with status {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Outcome of a stop-all sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    pub stopped: Vec<String>,
    pub failed: Vec<String>,
    /// Set when the sweep never got to stopping anything: `ollama ps`
    /// could not be run, or the sweep ran out of time.
    pub error: Option<String>,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.error.is_none()
    }
}

/// Table body of `ollama list` / `ollama ps` without the header line.
fn table_rows(stdout: &str) -> Vec<&str> {
    stdout
        .trim()
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// First column of every table row.
pub fn parse_model_names(stdout: &str) -> Vec<String> {
    table_rows(stdout)
        .into_iter()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Status text for the monitor: the table rows verbatim, or
/// [`NO_ACTIVE_MODELS`].
pub fn format_status(stdout: &str) -> String {
    let rows = table_rows(stdout);
    if rows.is_empty() {
        NO_ACTIVE_MODELS.to_string()
    } else {
        rows.join("\n")
    }
}

/// Pick the thinker: `preferred` when installed, else the first model, else
/// an empty string.
pub fn choose_default_thinker(installed: &[String], preferred: &str) -> String {
    if installed.iter().any(|m| m == preferred) {
        preferred.to_string()
    } else {
        installed.first().cloned().unwrap_or_default()
    }
}

/// Lists, reports and stops models through the `ollama` CLI.
pub struct ModelManager {
    runner: Arc<dyn ProcessRunner>,
    program: String,
}

impl ModelManager {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    async fn table(&self, subcommand: &str) -> Result<String, ModelError> {
        let output = self
            .runner
            .run(&Invocation::new(self.program.clone(), [subcommand]))
            .await?;
        if !output.success() {
            return Err(ModelError::CommandFailed {
                command: format!("{} {subcommand}", self.program),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Installed model identifiers.
    pub async fn installed(&self) -> Result<Vec<String>, ModelError> {
        Ok(parse_model_names(&self.table("list").await?))
    }

    /// Names of the models currently loaded by the service.
    pub async fn running(&self) -> Result<Vec<String>, ModelError> {
        Ok(parse_model_names(&self.table("ps").await?))
    }

    /// Human-readable running-model status.  Never fails.
    pub async fn status(&self) -> String {
        match self.table("ps").await {
            Ok(stdout) => format_status(&stdout),
            Err(e) => {
                log::warn!("models: status refresh failed: {e}");
                STATUS_ERROR.to_string()
            }
        }
    }

    /// Best-effort stop of every running model.
    ///
    /// Failures are logged and recorded in the report; nothing is raised.
    /// With no running models, no stop command is issued.
    pub async fn stop_all(&self) -> StopReport {
        let mut report = StopReport::default();

        let running = match self.running().await {
            Ok(names) => names,
            Err(e) => {
                log::warn!("models: could not list running models: {e}");
                report.error = Some(format!("could not list running models: {e}"));
                return report;
            }
        };

        for name in running {
            let invocation = Invocation::new(self.program.clone(), ["stop".to_string(), name.clone()]);
            match self.runner.run(&invocation).await {
                Ok(output) if output.success() => {
                    log::info!("models: stopped {name}");
                    report.stopped.push(name);
                }
                Ok(output) => {
                    log::warn!(
                        "models: stop {name} exited with {}: {}",
                        output.exit_code,
                        output.stderr.trim()
                    );
                    report.failed.push(name);
                }
                Err(e) => {
                    log::warn!("models: stop {name} failed: {e}");
                    report.failed.push(name);
                }
            }
        }

        report
    }

    /// [`stop_all`](Self::stop_all) bounded by `limit`.  On timeout the
    /// sweep is abandoned and the report carries only the error.
    pub async fn stop_all_within(&self, limit: Duration) -> StopReport {
        match tokio::time::timeout(limit, self.stop_all()).await {
            Ok(report) => report,
            Err(_) => {
                log::warn!("models: stop-all did not finish within {limit:?}");
                StopReport {
                    error: Some(format!("stop-all did not finish within {limit:?}")),
                    ..StopReport::default()
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
