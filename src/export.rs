//! Session log export through the external `cow-manager --save-log` helper.
//!
//! The full history is written to the helper's stdin as a JSON array.  On
//! success the helper prints the saved filename on stdout and exits 0; on
//! failure it exits non-zero with a diagnostic on stderr.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::history::SessionHistory;
use crate::process::{Invocation, LaunchError, ProcessRunner};

/// Flag selecting the helper's save mode.
pub const SAVE_LOG_FLAG: &str = "--save-log";

#[derive(Debug, Error)]
pub enum ExportError {
    /// The history is empty; the helper was not invoked.
    #[error("no history to save")]
    NothingToExport,

    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("log helper failed: {stderr}")]
    Failed { stderr: String },
}

/// Hands the session history to the log helper.
pub struct LogExporter {
    runner: Arc<dyn ProcessRunner>,
    helper: PathBuf,
}

impl LogExporter {
    pub fn new(runner: Arc<dyn ProcessRunner>, helper: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            helper: helper.into(),
        }
    }

    /// Export `history`; returns the filename the helper reported.
    pub async fn export(&self, history: &SessionHistory) -> Result<String, ExportError> {
        if history.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        let payload = history.to_json()?;
        let invocation = Invocation::new(self.helper.to_string_lossy(), [SAVE_LOG_FLAG])
            .with_stdin(payload);

        log::info!(
            "export: calling {} with {} entries",
            self.helper.display(),
            history.len()
        );
        let output = self.runner.run(&invocation).await?;
        log::debug!("export: helper stdout={:?} stderr={:?}", output.stdout, output.stderr);

        if output.success() {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(ExportError::Failed {
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use crate::process::ProcessOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeHelper {
        output: ProcessOutput,
        seen: Mutex<Vec<Invocation>>,
    }

    impl FakeHelper {
        fn new(stdout: &str, stderr: &str, exit_code: i32) -> Arc<Self> {
            Arc::new(Self {
                output: ProcessOutput {
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                    exit_code,
                },
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProcessRunner for FakeHelper {
        async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, LaunchError> {
            self.seen.lock().unwrap().push(invocation.clone());
            Ok(self.output.clone())
        }
    }

    fn two_entries() -> SessionHistory {
        let mut history = SessionHistory::new();
        history.append(HistoryEntry::user("hello"));
        history.append(HistoryEntry::assistant("hi there"));
        history
    }

    #[tokio::test]
    async fn empty_history_never_invokes_helper() {
        let helper = FakeHelper::new("", "", 0);
        let exporter = LogExporter::new(helper.clone(), "cow-manager");

        let err = exporter.export(&SessionHistory::new()).await.unwrap_err();

        assert!(matches!(err, ExportError::NothingToExport));
        assert!(helper.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_full_history_as_json_and_returns_filename() {
        let helper = FakeHelper::new("logs/chat_20260101-120000.txt", "", 0);
        let exporter = LogExporter::new(helper.clone(), "/opt/cow/cow-manager");

        let saved = exporter.export(&two_entries()).await.unwrap();
        assert_eq!(saved, "logs/chat_20260101-120000.txt");

        let seen = helper.seen.lock().unwrap();
        assert_eq!(seen[0].command, vec!["/opt/cow/cow-manager", "--save-log"]);
        assert_eq!(
            seen[0].stdin.as_deref(),
            Some(r#"[{"role":"User","text":"hello"},{"role":"Assistant","text":"hi there"}]"#)
        );
    }

    #[tokio::test]
    async fn helper_failure_carries_stderr() {
        let helper = FakeHelper::new("", "Error: failed to create log dir\n", 1);
        let exporter = LogExporter::new(helper, "cow-manager");

        match exporter.export(&two_entries()).await.unwrap_err() {
            ExportError::Failed { stderr } => assert_eq!(stderr, "Error: failed to create log dir"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
