//! Pipeline orchestrator module for Cow Cockpit.
//!
//! This module wires the translate → think → translate → render pipeline and
//! the model lifecycle commands behind a single command loop.
//!
//! # Architecture
//!
//! ```text
//! CockpitApp (egui)
//!        │  PipelineCommand (mpsc)
//!        ▼
//! PipelineOrchestrator::run()  ← async tokio task, owns SessionHistory
//!        │
//!        ├─ Submit        → Translator / InferenceClient / TextArtRenderer
//!        ├─ RefreshStatus → ModelManager::status
//!        ├─ StopAllModels → ModelManager::stop_all
//!        ├─ ExportLog     → LogExporter::export(&history)
//!        └─ Shutdown      → ModelManager::stop_all_within(timeout), then exit
//!        │
//!        ▼  PipelineEvent (mpsc)
//! CockpitApp::poll_events() ← every frame
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use cow_cockpit::config::AppConfig;
//! use cow_cockpit::llm::OllamaClient;
//! use cow_cockpit::pipeline::{PipelineCommand, PipelineOrchestrator, Services};
//! use cow_cockpit::process::TokioProcessRunner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let services = Services::from_config(
//!         &config,
//!         Arc::new(TokioProcessRunner::new()),
//!         Arc::new(OllamaClient::from_config(&config.inference)),
//!     );
//!
//!     let (command_tx, command_rx) = mpsc::channel(16);
//!     let (event_tx, mut event_rx) = mpsc::channel(64);
//!     let orchestrator = PipelineOrchestrator::new(services, event_tx, Duration::from_secs(10));
//!     tokio::spawn(orchestrator.run(command_rx));
//!
//!     command_tx
//!         .send(PipelineCommand::Submit {
//!             text: "hello".into(),
//!             config: config.pipeline.clone(),
//!         })
//!         .await
//!         .unwrap();
//!
//!     while let Some(event) = event_rx.recv().await {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{
    Notice, NoticeLevel, PipelineCommand, PipelineError, PipelineEvent, PipelineOrchestrator,
    Services, SubmitOutcome,
};
pub use state::PipelineState;
