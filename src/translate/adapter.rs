//! [`Translator`] — dispatches a translation to the configured backend.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ToolsConfig;
use crate::llm::{GenerateRequest, InferenceClient, InferenceError};
use crate::process::{Invocation, LaunchError, ProcessRunner};

/// System prompt used when a model acts as the translator.
pub const TRANSLATOR_SYSTEM_PROMPT: &str =
    "You are a professional translator. Output ONLY the translated text.";

// ---------------------------------------------------------------------------
// TargetLanguage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLanguage {
    En,
    Ja,
}

impl TargetLanguage {
    /// Two-letter code.
    pub fn code(self) -> &'static str {
        match self {
            TargetLanguage::En => "en",
            TargetLanguage::Ja => "ja",
        }
    }

    /// English name, used inside model prompts.
    pub fn name(self) -> &'static str {
        match self {
            TargetLanguage::En => "English",
            TargetLanguage::Ja => "Japanese",
        }
    }

    /// Target flag understood by `trans` (`:en`, `:ja`).
    pub fn tool_flag(self) -> String {
        format!(":{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// TranslatorBackend
// ---------------------------------------------------------------------------

/// Which mechanism translates text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslatorBackend {
    /// The `trans` command-line tool.
    ExternalTool,
    /// An installed model, prompted to output only the translation.
    Model(String),
}

impl Default for TranslatorBackend {
    fn default() -> Self {
        Self::ExternalTool
    }
}

impl fmt::Display for TranslatorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslatorBackend::ExternalTool => f.write_str("Google Translate (trans)"),
            TranslatorBackend::Model(id) => f.write_str(id),
        }
    }
}

// ---------------------------------------------------------------------------
// TranslateError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation model failed: {0}")]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The external tool exited non-zero.
    #[error("translator `{program}` exited with status {exit_code}: {stderr}")]
    ToolFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },
}

// ---------------------------------------------------------------------------
// TranslatorTool
// ---------------------------------------------------------------------------

/// Command line of the external translation tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorTool {
    pub program: String,
    /// Arguments placed before the language flag (`-b` = brief output).
    pub args: Vec<String>,
}

impl TranslatorTool {
    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self {
            program: tools.translator.clone(),
            args: tools.translator_args.clone(),
        }
    }

    fn invocation(&self, text: &str, target: TargetLanguage) -> Invocation {
        let mut args = self.args.clone();
        args.push(target.tool_flag());
        args.push(text.to_string());
        Invocation::new(self.program.clone(), args)
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Translates text through either backend with one signature, so the
/// orchestrator never needs to know which one is configured.
pub struct Translator {
    runner: Arc<dyn ProcessRunner>,
    inference: Arc<dyn InferenceClient>,
    tool: TranslatorTool,
}

impl Translator {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        inference: Arc<dyn InferenceClient>,
        tool: TranslatorTool,
    ) -> Self {
        Self {
            runner,
            inference,
            tool,
        }
    }

    pub async fn translate(
        &self,
        text: &str,
        target: TargetLanguage,
        backend: &TranslatorBackend,
        force_cpu: bool,
    ) -> Result<String, TranslateError> {
        log::debug!("translate: -> {} via {backend}", target.code());

        match backend {
            TranslatorBackend::ExternalTool => self.via_tool(text, target).await,
            TranslatorBackend::Model(model) => {
                let request = GenerateRequest::new(model.clone(), model_prompt(text, target))
                    .with_system(TRANSLATOR_SYSTEM_PROMPT)
                    .force_cpu(force_cpu);
                Ok(self.inference.generate(&request).await?)
            }
        }
    }

    async fn via_tool(&self, text: &str, target: TargetLanguage) -> Result<String, TranslateError> {
        let output = self.runner.run(&self.tool.invocation(text, target)).await?;
        if !output.success() {
            return Err(TranslateError::ToolFailed {
                program: self.tool.program.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

fn model_prompt(text: &str, target: TargetLanguage) -> String {
    format!("Translate the following text to {}:\n{text}", target.name())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
