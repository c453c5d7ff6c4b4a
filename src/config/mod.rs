//! Configuration module for Cow Cockpit.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::{resolve_helper, AppPaths};
pub use settings::{
    AppConfig, InferenceConfig, LifecycleConfig, LogsConfig, ModelsConfig, PipelineConfig,
    ToolsConfig, UiConfig,
};
