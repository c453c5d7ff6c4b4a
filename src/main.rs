//! Application entry point — Cow Cockpit.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the process runner, Ollama client and pipeline services.
//! 5. List installed models (seeds the pickers).
//! 6. Create pipeline channels (`command`, `event`) and spawn the
//!    orchestrator; queue the first status refresh.
//! 7. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.  The window only closes after the orchestrator has stopped
//!    running models.
//! 8. If the window closed anyway, send `Shutdown` once more and wait for
//!    the orchestrator (bounded) before tearing down the runtime.

use std::sync::Arc;
use std::time::Duration;

use cow_cockpit::{
    app::CockpitApp,
    config::AppConfig,
    llm::{InferenceClient, OllamaClient},
    models::ModelManager,
    pipeline::{PipelineCommand, PipelineEvent, PipelineOrchestrator, Services},
    process::{ProcessRunner, TokioProcessRunner},
};
use tokio::sync::mpsc;

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let vp = egui::ViewportBuilder::default()
        .with_title("Cow Manager & Chat")
        .with_inner_size([config.ui.window_width, config.ui.window_height])
        .with_min_inner_size([720.0, 480.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Cow Cockpit starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (UI stays on the main thread)
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // 4. Services
    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner::new());
    let inference: Arc<dyn InferenceClient> =
        Arc::new(OllamaClient::from_config(&config.inference));
    let services = Services::from_config(&config, Arc::clone(&runner), inference);

    // 5. Installed models
    let installed = rt.block_on(async {
        ModelManager::new(Arc::clone(&runner), config.tools.ollama.clone())
            .installed()
            .await
    });
    let installed = installed.unwrap_or_else(|e| {
        log::warn!("Could not list installed models ({e}); pickers will be empty");
        Vec::new()
    });
    log::info!("{} installed model(s)", installed.len());

    // 6. Orchestrator
    let (command_tx, command_rx) = mpsc::channel::<PipelineCommand>(16);
    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(64);

    let orchestrator = PipelineOrchestrator::new(
        services,
        event_tx,
        Duration::from_secs(config.lifecycle.shutdown_timeout_secs),
    );
    let orchestrator_task = rt.spawn(orchestrator.run(command_rx));
    let exit_tx = command_tx.clone();

    if let Err(e) = command_tx.try_send(PipelineCommand::RefreshStatus) {
        log::warn!("initial status refresh not queued: {e}");
    }

    // 7. UI (blocks until the window is closed)
    let app = CockpitApp::new(command_tx, event_rx, &config, installed);
    let options = native_options(&config);

    let result = eframe::run_native(
        "Cow Cockpit",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(app))
        }),
    );

    // 8. The window may have closed without the orchestrator finishing its
    //    cleanup (close grace period elapsed); give it one more bounded chance.
    if !orchestrator_task.is_finished() {
        log::info!("window closed before model cleanup finished; waiting");
        let wait = Duration::from_secs(config.lifecycle.shutdown_timeout_secs + 2);
        let finished = rt.block_on(async {
            tokio::time::timeout(wait, async {
                let _ = exit_tx.send(PipelineCommand::Shutdown).await;
                let _ = orchestrator_task.await;
            })
            .await
        });
        if finished.is_err() {
            log::warn!("model cleanup did not finish within {wait:?}");
        }
    }

    rt.shutdown_timeout(Duration::from_secs(1));
    log::info!("Cow Cockpit stopped");
    result
}
