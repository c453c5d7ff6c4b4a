//! Text-art rendering of the final answer (`cowsay -W <width> <text>`).

use std::sync::Arc;

use thiserror::Error;

use crate::config::ToolsConfig;
use crate::process::{Invocation, LaunchError, ProcessRunner};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("renderer `{program}` exited with status {exit_code}: {stderr}")]
    ToolFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Wraps the external text-art renderer.
pub struct TextArtRenderer {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    width: u32,
}

impl TextArtRenderer {
    pub fn new(runner: Arc<dyn ProcessRunner>, program: impl Into<String>, width: u32) -> Self {
        Self {
            runner,
            program: program.into(),
            width,
        }
    }

    pub fn from_config(runner: Arc<dyn ProcessRunner>, tools: &ToolsConfig) -> Self {
        Self::new(runner, tools.renderer.clone(), tools.render_width)
    }

    /// Render `text`; the renderer's stdout is returned untouched because
    /// its whitespace is part of the art.
    pub async fn render(&self, text: &str) -> Result<String, RenderError> {
        let invocation = Invocation::new(
            self.program.clone(),
            ["-W".to_string(), self.width.to_string(), text.to_string()],
        );
        let output = self.runner.run(&invocation).await?;
        if !output.success() {
            return Err(RenderError::ToolFailed {
                program: self.program.clone(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
