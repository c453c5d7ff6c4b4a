//! External process execution.
//!
//! Every command-line tool the cockpit talks to (`ollama`, `trans`,
//! `cowsay`, the `cow-manager` log helper) goes through the
//! [`ProcessRunner`] seam so the orchestrator can be tested with a scripted
//! double instead of real executables.
//!
//! ```text
//! Invocation { command: ["cowsay", "-W", "60", "moo"], stdin: None }
//!        │
//!        ▼
//! ProcessRunner::run  ──spawn──▶ child ──wait──▶ ProcessOutput { stdout, stderr, exit_code }
//!        │
//!        └─ Err(LaunchError)   only when the executable cannot be started
//! ```

pub mod runner;

pub use runner::{Invocation, LaunchError, ProcessOutput, ProcessRunner, TokioProcessRunner};
