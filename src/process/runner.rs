//! [`ProcessRunner`] trait and the tokio-backed implementation.
//!
//! A non-zero exit is *not* an error at this layer: it is reported in
//! [`ProcessOutput::exit_code`] and the caller decides what it means.  Only a
//! failure to launch the executable at all surfaces as [`LaunchError`].

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

// ---------------------------------------------------------------------------
// Invocation / ProcessOutput
// ---------------------------------------------------------------------------

/// A one-shot command line plus optional standard-input payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
}

impl Invocation {
    /// Build an invocation from a program name and arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = vec![program.into()];
        command.extend(args.into_iter().map(Into::into));
        Self {
            command,
            stdin: None,
        }
    }

    /// Attach a payload for the child's standard input.
    pub fn with_stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    /// The executable name (first element of the command line).
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("")
    }

    /// Everything after the program name.
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or(&[])
    }
}

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status; `-1` when the child was terminated by a signal.
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ---------------------------------------------------------------------------
// LaunchError
// ---------------------------------------------------------------------------

/// The executable could not be started (not found, not executable, empty
/// command line) or its I/O could not be driven to completion.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to launch `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("I/O error while running `{program}`: {message}")]
    Io { program: String, message: String },
}

// ---------------------------------------------------------------------------
// ProcessRunner trait
// ---------------------------------------------------------------------------

/// Spawns an external command, feeds its stdin and collects its output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, LaunchError>;
}

// ---------------------------------------------------------------------------
// TokioProcessRunner
// ---------------------------------------------------------------------------

/// Runs commands with `tokio::process` so the async runtime is never blocked
/// while a child is working.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, LaunchError> {
        let program = invocation.program();
        if program.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        log::debug!("process: spawning {:?}", invocation.command);

        let mut child = Command::new(program)
            .args(invocation.args())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        if let Some(payload) = &invocation.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                // A child that exits without reading its input closes the
                // pipe early; that is its business, not a launch failure.
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    log::debug!("process: stdin write to `{program}` failed: {e}");
                }
                drop(stdin);
            }
        }

        let output = child.wait_with_output().await.map_err(|e| LaunchError::Io {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        log::debug!("process: `{program}` exited with {}", result.exit_code);
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
