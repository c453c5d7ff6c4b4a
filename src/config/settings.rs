//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::translate::TranslatorBackend;

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Per-run pipeline options.
///
/// The persisted value only seeds the UI controls; the UI hands its current
/// copy to the orchestrator with every submitted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Translate the user's message to English before thinking.
    pub translate_input: bool,
    /// Translate the answer to Japanese before rendering.
    pub translate_output: bool,
    /// Model that answers the (possibly translated) prompt.
    pub thinker_model: String,
    pub force_cpu_translator: bool,
    pub force_cpu_thinker: bool,
    /// Mechanism used for both translation steps.  Kept last: a model
    /// backend serialises as a TOML table.
    pub translator: TranslatorBackend,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            translate_input: true,
            translate_output: true,
            thinker_model: String::new(),
            force_cpu_translator: false,
            force_cpu_thinker: true,
            translator: TranslatorBackend::ExternalTool,
        }
    }
}

// ---------------------------------------------------------------------------
// InferenceConfig
// ---------------------------------------------------------------------------

/// Connection settings for the local inference service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the Ollama server; `/api/generate` is appended.
    pub base_url: String,
    /// Maximum seconds to wait for one generate call.  Local models on CPU
    /// are slow, so this is minutes rather than seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

/// External command-line tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Ollama CLI (`list`, `ps`, `stop`, `serve`).
    pub ollama: String,
    /// Translation CLI.
    pub translator: String,
    pub translator_args: Vec<String>,
    /// Text-art renderer.
    pub renderer: String,
    /// Column width handed to the renderer (`-W`).
    pub render_width: u32,
    /// Log export helper.  A bare name is looked up next to the running
    /// executable before falling back to `PATH`.
    pub log_helper: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ollama: "ollama".into(),
            translator: "trans".into(),
            translator_args: vec!["-b".into()],
            renderer: "cowsay".into(),
            render_width: 60,
            log_helper: "cow-manager".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ModelsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Thinker picked at startup when it is installed.
    pub preferred_thinker: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            preferred_thinker: "mistral-nemo".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound on the stop-all sweep run before the window closes.
    pub shutdown_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// LogsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Directory the helper writes `chat_*.txt` files into (relative to its
    /// working directory unless absolute).
    pub dir: PathBuf,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_width: 1100.0,
            window_height: 800.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use cow_cockpit::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub inference: InferenceConfig,
    pub tools: ToolsConfig,
    pub models: ModelsConfig,
    pub lifecycle: LifecycleConfig,
    pub logs: LogsConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.inference.base_url, "http://localhost:11434");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert!(cfg.pipeline.translate_input);
        assert!(cfg.pipeline.translate_output);
        assert_eq!(cfg.pipeline.translator, TranslatorBackend::ExternalTool);
        assert!(!cfg.pipeline.force_cpu_translator);
        assert!(cfg.pipeline.force_cpu_thinker);
        assert_eq!(cfg.inference.timeout_secs, 300);
        assert_eq!(cfg.tools.ollama, "ollama");
        assert_eq!(cfg.tools.translator_args, vec!["-b".to_string()]);
        assert_eq!(cfg.tools.render_width, 60);
        assert_eq!(cfg.models.preferred_thinker, "mistral-nemo");
        assert_eq!(cfg.lifecycle.shutdown_timeout_secs, 10);
        assert_eq!(cfg.logs.dir, PathBuf::from("logs"));
    }

    /// A model-backed translator must survive the TOML round trip.
    #[test]
    fn round_trip_model_translator() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let mut cfg = AppConfig::default();
        cfg.pipeline.translator = TranslatorBackend::Model("qwen2.5:7b".into());
        cfg.pipeline.thinker_model = "llama3".into();
        cfg.pipeline.translate_output = false;
        cfg.inference.timeout_secs = 60;
        cfg.tools.render_width = 40;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.pipeline, cfg.pipeline);
        assert_eq!(loaded.inference.timeout_secs, 60);
        assert_eq!(loaded.tools.render_width, 40);
    }

    /// Sections missing from an older settings file fall back to defaults.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[inference]\ntimeout_secs = 30\n").unwrap();

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.inference.timeout_secs, 30);
        assert_eq!(loaded.inference.base_url, "http://localhost:11434");
        assert_eq!(loaded.tools.renderer, "cowsay");
    }
}
