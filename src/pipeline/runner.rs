//! Pipeline orchestrator — drives translate → think → translate → render.
//!
//! [`PipelineOrchestrator`] owns the session history and responds to
//! [`PipelineCommand`]s received over a `tokio::sync::mpsc` channel,
//! reporting progress back to the UI as [`PipelineEvent`]s.
//!
//! # Pipeline flow
//!
//! ```text
//! PipelineCommand::Submit { text, config }
//!   └─▶ append User entry (original text)
//!         ├─ translate_input  → Translator(:en)             [TranslatingIn]
//!         ├─ InferenceClient::generate(thinker, prompt)      [Thinking]
//!         ├─ translate_output → Translator(:ja)             [TranslatingOut]
//!         └─ append Assistant entry → TextArtRenderer        [Rendering]
//!               ├─ Ok  → Reply, refresh status → Idle
//!               └─ Err → RunFailed               → Idle
//! ```
//!
//! Commands are handled one at a time, so a second submission, a status
//! refresh or an export always waits for the current run to finish.
//! `Shutdown` is the exception: it cancels an in-flight run so the models are
//! stopped before the window closes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{resolve_helper, AppConfig, PipelineConfig};
use crate::export::{ExportError, LogExporter};
use crate::history::{HistoryEntry, SessionHistory};
use crate::llm::{GenerateRequest, InferenceClient, InferenceError};
use crate::models::{ModelManager, StopReport};
use crate::process::ProcessRunner;
use crate::render::{RenderError, TextArtRenderer};
use crate::translate::{TargetLanguage, TranslateError, Translator, TranslatorTool};

use super::state::PipelineState;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// A stage failure that aborts the current run.
///
/// The `Display` text is what the user sees in the transcript.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Translation failed: {0}")]
    Translate(#[from] TranslateError),

    #[error("Thinking failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),
}

// ---------------------------------------------------------------------------
// Commands / events
// ---------------------------------------------------------------------------

/// Requests sent from the UI to the orchestrator.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    /// Run the pipeline on a user message with the UI's current options.
    Submit {
        text: String,
        config: PipelineConfig,
    },
    /// Re-read the running-model status.
    RefreshStatus,
    /// Stop every running model.
    StopAllModels,
    /// Hand the session history to the log helper.
    ExportLog,
    /// Stop every running model (bounded), then exit the command loop.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient, snackbar-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Progress and results delivered from the orchestrator to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StateChanged(PipelineState),
    /// The user's message was accepted and recorded.
    UserMessage(String),
    /// A run finished: `text` is the stored answer, `rendered` the art.
    Reply { text: String, rendered: String },
    /// A run was aborted; `message` goes into the transcript.
    RunFailed { message: String },
    /// Running-model status text.
    Status(String),
    ModelsStopped(StopReport),
    Notice(Notice),
    /// Shutdown cleanup is done; the window may close.
    ShutdownComplete,
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input; nothing changed.
    Ignored,
    Completed { rendered: String },
    Failed { message: String },
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Everything the orchestrator calls out to.
pub struct Services {
    pub translator: Translator,
    pub inference: Arc<dyn InferenceClient>,
    pub renderer: TextArtRenderer,
    pub models: ModelManager,
    pub exporter: LogExporter,
}

impl Services {
    /// Wire every component to one process runner and one inference client.
    pub fn from_config(
        config: &AppConfig,
        runner: Arc<dyn ProcessRunner>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            translator: Translator::new(
                Arc::clone(&runner),
                Arc::clone(&inference),
                TranslatorTool::from_config(&config.tools),
            ),
            inference,
            renderer: TextArtRenderer::from_config(Arc::clone(&runner), &config.tools),
            models: ModelManager::new(Arc::clone(&runner), config.tools.ollama.clone()),
            exporter: LogExporter::new(runner, resolve_helper(&config.tools.log_helper)),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the message pipeline and owns the session history.
///
/// Create with [`PipelineOrchestrator::new`], then call [`run`](Self::run)
/// inside a tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use cow_cockpit::config::AppConfig;
/// use cow_cockpit::llm::OllamaClient;
/// use cow_cockpit::pipeline::{PipelineOrchestrator, Services};
/// use cow_cockpit::process::TokioProcessRunner;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let services = Services::from_config(
///     &config,
///     Arc::new(TokioProcessRunner::new()),
///     Arc::new(OllamaClient::from_config(&config.inference)),
/// );
///
/// let (command_tx, command_rx) = tokio::sync::mpsc::channel(16);
/// let (event_tx, _event_rx) = tokio::sync::mpsc::channel(64);
/// let orchestrator = PipelineOrchestrator::new(services, event_tx, Duration::from_secs(10));
/// # drop(command_tx);
/// orchestrator.run(command_rx).await;
/// # }
/// ```
pub struct PipelineOrchestrator {
    services: Services,
    history: SessionHistory,
    state: PipelineState,
    events: mpsc::Sender<PipelineEvent>,
    shutdown_timeout: Duration,
}

impl PipelineOrchestrator {
    pub fn new(
        services: Services,
        events: mpsc::Sender<PipelineEvent>,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            services,
            history: SessionHistory::new(),
            state: PipelineState::Idle,
            events,
            shutdown_timeout,
        }
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `command_rx` is closed or a `Shutdown` command is handled.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<PipelineCommand>) {
        let mut deferred = VecDeque::new();

        loop {
            let command = match deferred.pop_front() {
                Some(command) => command,
                None => match command_rx.recv().await {
                    Some(command) => command,
                    None => break,
                },
            };

            match command {
                PipelineCommand::Submit { text, config } => {
                    let finished = self
                        .submit_until_shutdown(&text, &config, &mut command_rx, &mut deferred)
                        .await;
                    if !finished {
                        log::warn!("pipeline: run cancelled by shutdown");
                        self.set_state(PipelineState::Idle).await;
                        self.shutdown().await;
                        return;
                    }
                }
                PipelineCommand::RefreshStatus => self.refresh_status().await,
                PipelineCommand::StopAllModels => {
                    self.stop_all_models().await;
                }
                PipelineCommand::ExportLog => {
                    let _ = self.export_log().await;
                }
                PipelineCommand::Shutdown => {
                    self.shutdown().await;
                    return;
                }
            }
        }

        log::info!("pipeline: command channel closed, orchestrator shutting down");
    }

    /// Drive one submission while still watching the command channel.
    ///
    /// Returns `false` when a `Shutdown` arrived first; the run is dropped
    /// mid-stage (child processes are killed on drop).  Any other command is
    /// queued in `deferred` and handled after the run.
    async fn submit_until_shutdown(
        &mut self,
        text: &str,
        config: &PipelineConfig,
        command_rx: &mut mpsc::Receiver<PipelineCommand>,
        deferred: &mut VecDeque<PipelineCommand>,
    ) -> bool {
        let run = self.submit(text, config);
        tokio::pin!(run);

        loop {
            tokio::select! {
                biased;
                _ = &mut run => return true,
                command = command_rx.recv() => match command {
                    Some(PipelineCommand::Shutdown) => return false,
                    Some(other) => deferred.push_back(other),
                    None => {
                        (&mut run).await;
                        return true;
                    }
                },
            }
        }
    }

    // -----------------------------------------------------------------------
    // Message pipeline
    // -----------------------------------------------------------------------

    /// Run the pipeline once for `input`.
    ///
    /// Empty input is a no-op.  Any stage failure is reported as
    /// [`PipelineEvent::RunFailed`]; the orchestrator always ends in `Idle`.
    pub async fn submit(&mut self, input: &str, config: &PipelineConfig) -> SubmitOutcome {
        if input.trim().is_empty() || self.state.is_busy() {
            return SubmitOutcome::Ignored;
        }

        // Stored before translation: the history keeps the original text.
        self.history.append(HistoryEntry::user(input));
        self.emit(PipelineEvent::UserMessage(input.to_string())).await;

        let outcome = match self.run_stages(input, config).await {
            Ok((text, rendered)) => {
                self.emit(PipelineEvent::Reply {
                    text,
                    rendered: rendered.clone(),
                })
                .await;
                self.refresh_status().await;
                SubmitOutcome::Completed { rendered }
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("pipeline error: {message}");
                self.emit(PipelineEvent::RunFailed {
                    message: message.clone(),
                })
                .await;
                SubmitOutcome::Failed { message }
            }
        };

        self.set_state(PipelineState::Idle).await;
        outcome
    }

    async fn run_stages(
        &mut self,
        input: &str,
        config: &PipelineConfig,
    ) -> Result<(String, String), PipelineError> {
        // ── 1. Input translation ────────────────────────────────────────
        let prompt = if config.translate_input {
            self.set_state(PipelineState::TranslatingIn).await;
            self.services
                .translator
                .translate(
                    input,
                    TargetLanguage::En,
                    &config.translator,
                    config.force_cpu_translator,
                )
                .await?
        } else {
            input.to_string()
        };

        // ── 2. Thinking ─────────────────────────────────────────────────
        self.set_state(PipelineState::Thinking).await;
        let request = GenerateRequest::new(config.thinker_model.clone(), prompt)
            .force_cpu(config.force_cpu_thinker);
        let answer = self.services.inference.generate(&request).await?;
        log::debug!("pipeline: thinker answered {} bytes", answer.len());

        // ── 3. Output translation ───────────────────────────────────────
        let answer = if config.translate_output {
            self.set_state(PipelineState::TranslatingOut).await;
            self.services
                .translator
                .translate(
                    &answer,
                    TargetLanguage::Ja,
                    &config.translator,
                    config.force_cpu_translator,
                )
                .await?
        } else {
            answer
        };

        // ── 4. Rendering ────────────────────────────────────────────────
        self.set_state(PipelineState::Rendering).await;
        self.history.append(HistoryEntry::assistant(answer.clone()));
        let rendered = self.services.renderer.render(&answer).await?;

        Ok((answer, rendered))
    }

    // -----------------------------------------------------------------------
    // Model lifecycle / status
    // -----------------------------------------------------------------------

    pub async fn refresh_status(&self) {
        let status = self.services.models.status().await;
        self.emit(PipelineEvent::Status(status)).await;
    }

    /// Stop every running model, then refresh the status.  Never fails.
    pub async fn stop_all_models(&self) -> StopReport {
        let report = self.services.models.stop_all().await;
        self.emit(PipelineEvent::ModelsStopped(report.clone())).await;
        self.refresh_status().await;
        report
    }

    /// Bounded stop-all, then signal that the window may close.
    pub async fn shutdown(&self) {
        log::info!("pipeline: cleaning up models on exit");
        let report = self
            .services
            .models
            .stop_all_within(self.shutdown_timeout)
            .await;
        log::info!(
            "pipeline: shutdown stopped {} model(s), {} failure(s)",
            report.stopped.len(),
            report.failed.len()
        );
        if let Some(error) = &report.error {
            log::warn!("pipeline: shutdown cleanup incomplete: {error}");
        }
        self.emit(PipelineEvent::ShutdownComplete).await;
    }

    // -----------------------------------------------------------------------
    // Log export
    // -----------------------------------------------------------------------

    /// Export the history and report the result as a notice.
    pub async fn export_log(&self) -> Result<String, ExportError> {
        let result = self.services.exporter.export(&self.history).await;
        let notice = match &result {
            Ok(saved) => Notice::info(format!("Log saved: {saved}")),
            Err(ExportError::NothingToExport) => Notice::error("No history to save"),
            Err(ExportError::Failed { stderr }) => Notice::error(format!("Save error: {stderr}")),
            Err(e) => Notice::error(format!("Log helper call failed: {e}")),
        };
        if let Err(e) = &result {
            log::warn!("export: {e}");
        }
        self.emit(PipelineEvent::Notice(notice)).await;
        result
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn set_state(&mut self, state: PipelineState) {
        self.state = state;
        self.emit(PipelineEvent::StateChanged(state)).await;
    }

    async fn emit(&self, event: PipelineEvent) {
        // The UI may already be gone during shutdown.
        let _ = self.events.send(event).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
