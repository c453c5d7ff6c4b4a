//! `cow-manager` — Ollama resource helper used by Cow Cockpit.
//!
//! Modes:
//!
//! * `--save-log` — read the session history (JSON array) from stdin, write
//!   it under the log directory and print the file path.
//! * `--stop`     — stop every running model to free VRAM.
//! * default      — restart `ollama serve`, CPU-only unless `--gpu`.

use std::io::Read;
use std::path::PathBuf;
use std::process::{ExitCode, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cow_cockpit::config::AppConfig;
use cow_cockpit::logbook;
use cow_cockpit::models::ModelManager;
use cow_cockpit::process::TokioProcessRunner;

#[derive(Debug, Parser)]
#[command(name = "cow-manager", about = "Ollama resource helper for Cow Cockpit")]
struct Cli {
    /// Start the server with GPU acceleration.
    #[arg(long)]
    gpu: bool,

    /// Stop all running models and free VRAM.
    #[arg(long, conflicts_with = "save_log")]
    stop: bool,

    /// Read a JSON chat history from stdin and save it as a log file.
    #[arg(long)]
    save_log: bool,

    /// Directory for saved logs (defaults to the configured one).
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let result = if cli.save_log {
        save_log(&cli, &config).map(|path| print!("{}", path.display()))
    } else if cli.stop {
        stop(&config).await
    } else {
        serve(&config, cli.gpu).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn save_log(cli: &Cli, config: &AppConfig) -> Result<PathBuf> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let entries = logbook::parse_entries(&input)?;
    let dir = cli.log_dir.clone().unwrap_or_else(|| config.logs.dir.clone());
    let path = logbook::write_session_log(&dir, &entries, &chrono::Local::now())?;
    log::info!("saved {} entries to {}", entries.len(), path.display());
    Ok(path)
}

async fn stop(config: &AppConfig) -> Result<()> {
    println!("Cow-Manager: cleaning up VRAM...");
    let manager = ModelManager::new(Arc::new(TokioProcessRunner::new()), config.tools.ollama.clone());
    let report = manager.stop_all().await;

    if let Some(error) = report.error {
        anyhow::bail!(error);
    }
    if report.stopped.is_empty() && report.failed.is_empty() {
        println!("No models were running.");
    } else if report.is_clean() {
        println!("Stopped: {}", report.stopped.join(", "));
    } else {
        println!(
            "Stopped: {}; failed: {}",
            report.stopped.join(", "),
            report.failed.join(", ")
        );
    }
    Ok(())
}

async fn serve(config: &AppConfig, gpu: bool) -> Result<()> {
    println!("Cow-Manager: restarting Ollama...");

    // An already running server would keep its own device settings.
    let _ = tokio::process::Command::new("pkill")
        .arg(&config.tools.ollama)
        .status()
        .await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut command = tokio::process::Command::new(&config.tools.ollama);
    command
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    if gpu {
        println!("Mode: GPU");
    } else {
        println!("Mode: CPU");
        command.env("CUDA_VISIBLE_DEVICES", "");
    }

    let child = command
        .spawn()
        .with_context(|| format!("failed to start `{} serve`", config.tools.ollama))?;

    match child.id() {
        Some(pid) => println!("Ollama started (PID: {pid})"),
        None => println!("Ollama started"),
    }
    Ok(())
}
